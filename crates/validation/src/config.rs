use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{EntityLevel, SurfaceKind};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub dataset: DatasetInfo,
    pub attributes: AttributesConfig,
    #[serde(default)]
    pub validation: ValidationSettings,
    #[serde(default)]
    pub inputs: Option<InputsConfig>,
}

/// Informational block describing the dataset under test.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatasetInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub lod: Option<u8>,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributesConfig {
    /// Building-level attributes.
    #[serde(default)]
    pub parent: BTreeMap<String, AttributeSpec>,
    /// Surface-level attributes, one table per surface subtype.
    #[serde(default)]
    pub child: ChildAttributes,
}

impl AttributesConfig {
    pub fn for_level(&self, level: EntityLevel) -> &BTreeMap<String, AttributeSpec> {
        match level {
            EntityLevel::Building => &self.parent,
            EntityLevel::Surface(kind) => self.child.for_kind(kind),
        }
    }

    /// Unit of the mapped entry that produces `computed_name` at `level`.
    pub fn unit_of(&self, level: EntityLevel, computed_name: &str) -> Option<&str> {
        self.for_level(level)
            .values()
            .filter(|spec| spec.is_mapped())
            .find(|spec| spec.computed_names().contains(&computed_name))
            .and_then(|spec| spec.unit.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChildAttributes {
    #[serde(default)]
    pub roof: BTreeMap<String, AttributeSpec>,
    #[serde(default)]
    pub wall: BTreeMap<String, AttributeSpec>,
    #[serde(default)]
    pub floor: BTreeMap<String, AttributeSpec>,
}

impl ChildAttributes {
    pub fn for_kind(&self, kind: SurfaceKind) -> &BTreeMap<String, AttributeSpec> {
        match kind {
            SurfaceKind::Roof => &self.roof,
            SurfaceKind::Wall => &self.wall,
            SurfaceKind::Floor => &self.floor,
        }
    }
}

/// One configured attribute.
///
/// An empty `source_label` means there is no reference data to validate
/// against; the entry is kept for documentation but never mapped. A mapped
/// entry names either a single computed column or several computed columns
/// that all share the same reference label (e.g. `min_height` and
/// `max_height` both checked against a generic `value` property).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributeSpec {
    #[serde(default)]
    pub source_label: String,
    #[serde(default)]
    pub computed_column: Option<String>,
    #[serde(default)]
    pub computed_columns: Option<Vec<String>>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl AttributeSpec {
    pub fn is_mapped(&self) -> bool {
        !self.source_label.trim().is_empty()
    }

    /// Computed column names this entry expands into.
    pub fn computed_names(&self) -> Vec<&str> {
        match (&self.computed_column, &self.computed_columns) {
            (_, Some(cols)) => cols.iter().map(String::as_str).collect(),
            (Some(col), None) => vec![col.as_str()],
            (None, None) => Vec::new(),
        }
    }

    fn check(&self, scope: &str, name: &str) -> Result<(), ValidationError> {
        if !self.is_mapped() {
            return Ok(());
        }
        match (&self.computed_column, &self.computed_columns) {
            (Some(_), Some(_)) => Err(ValidationError::ConfigValidation(format!(
                "{scope}.{name}: set either computed_column or computed_columns, not both"
            ))),
            (None, None) => Err(ValidationError::ConfigValidation(format!(
                "{scope}.{name}: source_label '{}' has no computed_column",
                self.source_label
            ))),
            (Some(col), None) if col.trim().is_empty() => Err(ValidationError::ConfigValidation(
                format!("{scope}.{name}: computed_column is empty"),
            )),
            (None, Some(cols)) if cols.is_empty() || cols.iter().any(|c| c.trim().is_empty()) => {
                Err(ValidationError::ConfigValidation(format!(
                    "{scope}.{name}: computed_columns must be a non-empty list of names"
                )))
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationSettings {
    #[serde(default)]
    pub tolerance: ToleranceSettings,
    #[serde(default)]
    pub tolerance_kind: ToleranceKind,
    #[serde(default = "default_export_threshold")]
    pub export_threshold_percent: f64,
    #[serde(default)]
    pub outlier_method: OutlierMethod,
    #[serde(default = "default_outlier_threshold")]
    pub outlier_threshold: f64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            tolerance: ToleranceSettings::default(),
            tolerance_kind: ToleranceKind::default(),
            export_threshold_percent: default_export_threshold(),
            outlier_method: OutlierMethod::default(),
            outlier_threshold: default_outlier_threshold(),
        }
    }
}

fn default_export_threshold() -> f64 {
    10.0
}

fn default_outlier_threshold() -> f64 {
    3.0
}

/// Tolerance thresholds keyed by tolerance key (see `metrics::tolerance_key`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToleranceSettings {
    #[serde(default)]
    pub abs: BTreeMap<String, f64>,
    #[serde(default)]
    pub percent: BTreeMap<String, f64>,
}

impl ToleranceSettings {
    pub fn thresholds(&self, kind: ToleranceKind) -> &BTreeMap<String, f64> {
        match kind {
            ToleranceKind::Absolute => &self.abs,
            ToleranceKind::Percent => &self.percent,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum ToleranceKind {
    /// `|difference| <= threshold`
    #[default]
    #[serde(rename = "abs")]
    Absolute,
    /// `|percent_error| <= threshold`
    #[serde(rename = "percent")]
    Percent,
}

impl std::fmt::Display for ToleranceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute => write!(f, "abs"),
            Self::Percent => write!(f, "percent"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// Outside `[Q1 - t*IQR, Q3 + t*IQR]`.
    #[default]
    Iqr,
    /// `|z| > t`.
    Zscore,
}

impl FromStr for OutlierMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iqr" => Ok(Self::Iqr),
            "zscore" => Ok(Self::Zscore),
            other => Err(ValidationError::InvalidArgument(format!(
                "unknown outlier method '{other}' (use 'iqr' or 'zscore')"
            ))),
        }
    }
}

impl std::fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Iqr => write!(f, "iqr"),
            Self::Zscore => write!(f, "zscore"),
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs (CLI)
// ---------------------------------------------------------------------------

/// CSV inputs, resolved relative to the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct InputsConfig {
    #[serde(default)]
    pub building_calculated: Option<String>,
    #[serde(default)]
    pub surface_calculated: Option<String>,
    #[serde(default)]
    pub building_thematic: Option<String>,
    #[serde(default)]
    pub surface_thematic: Option<String>,
    #[serde(default = "default_building_id_column")]
    pub building_id_column: String,
    #[serde(default = "default_surface_id_column")]
    pub surface_id_column: String,
    #[serde(default = "default_classname_column")]
    pub classname_column: String,
}

fn default_building_id_column() -> String {
    "building_feature_id".into()
}

fn default_surface_id_column() -> String {
    "surface_feature_id".into()
}

fn default_classname_column() -> String {
    "classname".into()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ValidationConfig {
    pub fn from_toml(input: &str) -> Result<Self, ValidationError> {
        let config: ValidationConfig =
            toml::from_str(input).map_err(|e| ValidationError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, spec) in &self.attributes.parent {
            spec.check("attributes.parent", name)?;
        }
        for kind in SurfaceKind::ALL {
            let scope = format!("attributes.child.{}", kind.config_key());
            for (name, spec) in self.attributes.child.for_kind(kind) {
                spec.check(&scope, name)?;
            }
        }

        let tolerance = &self.validation.tolerance;
        for (section, thresholds) in [("abs", &tolerance.abs), ("percent", &tolerance.percent)] {
            for (key, value) in thresholds {
                if !value.is_finite() || *value < 0.0 {
                    return Err(ValidationError::ConfigValidation(format!(
                        "validation.tolerance.{section}.{key} must be a non-negative number, \
                         got {value}"
                    )));
                }
            }
        }

        let export = self.validation.export_threshold_percent;
        if !export.is_finite() || export < 0.0 {
            return Err(ValidationError::ConfigValidation(format!(
                "validation.export_threshold_percent must be a non-negative number, got {export}"
            )));
        }

        let outlier = self.validation.outlier_threshold;
        if !outlier.is_finite() || outlier <= 0.0 {
            return Err(ValidationError::ConfigValidation(format!(
                "validation.outlier_threshold must be a positive number, got {outlier}"
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
