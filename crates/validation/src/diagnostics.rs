//! Structured diagnostics for recoverable data-shape issues.
//!
//! The engine never prints. Each issue is pushed into a [`Diagnostics`]
//! collector owned by the caller and mirrored as a `tracing` warning, so a
//! run stays silent unless the caller installs a subscriber.

use std::fmt;

use serde::Serialize;

use crate::config::ToleranceKind;
use crate::model::FeatureId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Calculated or reference table for a level was empty.
    EmptyInput { level: String },
    /// No calculated surfaces carry this classname.
    NoSurfaces { classname: String },
    /// A mapped attribute has no column in the calculated table.
    MissingColumn { level: String, attribute: String },
    /// A mapped attribute has no reference rows.
    NoReferenceData { level: String, attribute: String },
    /// Attribute is not validated for this surface subtype.
    NotApplicable { level: String, attribute: String },
    /// More than one reference value for the same feature and attribute; the first is kept.
    DuplicateReference {
        level: String,
        attribute: String,
        feature_id: FeatureId,
    },
    /// More than one calculated row for the same feature; the first is kept.
    DuplicateFeature { level: String, feature_id: FeatureId },
    /// Azimuth comparisons dropped because a side carried the undefined sentinel.
    UndefinedAzimuth { level: String, excluded: usize },
    /// No thresholds configured for this tolerance kind.
    NoTolerances { tolerance_kind: ToleranceKind },
    /// A level produced no validation records at all.
    NoResults { level: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput { level } => write!(f, "{level}: empty input table"),
            Self::NoSurfaces { classname } => {
                write!(f, "no surfaces found with classname '{classname}'")
            }
            Self::MissingColumn { level, attribute } => {
                write!(f, "{level}: column '{attribute}' not found in calculated data")
            }
            Self::NoReferenceData { level, attribute } => {
                write!(f, "{level}: no thematic data for attribute '{attribute}'")
            }
            Self::NotApplicable { level, attribute } => {
                write!(
                    f,
                    "{level}: attribute '{attribute}' is not validated for this surface type"
                )
            }
            Self::DuplicateReference { level, attribute, feature_id } => write!(
                f,
                "{level}: duplicate thematic value for feature {feature_id}, \
                 attribute '{attribute}'"
            ),
            Self::DuplicateFeature { level, feature_id } => {
                write!(f, "{level}: duplicate calculated row for feature {feature_id}")
            }
            Self::UndefinedAzimuth { level, excluded } => {
                write!(
                    f,
                    "{level}: excluded {excluded} azimuth comparison(s) with undefined orientation"
                )
            }
            Self::NoTolerances { tolerance_kind } => {
                write!(f, "no {tolerance_kind} tolerances defined in config")
            }
            Self::NoResults { level } => write!(f, "{level}: no validation results generated"),
        }
    }
}

/// Caller-owned sink for [`Diagnostic`]s.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(diagnostic = %diagnostic, "validation diagnostic");
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
