use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{OutlierMethod, ToleranceKind};
use crate::diagnostics::Diagnostic;

/// Identity of a building or surface feature.
pub type FeatureId = i64;

// ---------------------------------------------------------------------------
// Entity levels
// ---------------------------------------------------------------------------

/// Surface subtype of a building's boundary surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Roof,
    Wall,
    Floor,
}

impl SurfaceKind {
    pub const ALL: [SurfaceKind; 3] = [SurfaceKind::Roof, SurfaceKind::Wall, SurfaceKind::Floor];

    /// Classname used for this subtype in calculated surface tables.
    pub fn classname(&self) -> &'static str {
        match self {
            Self::Roof => "RoofSurface",
            Self::Wall => "WallSurface",
            Self::Floor => "GroundSurface",
        }
    }

    /// Key of this subtype under `attributes.child`.
    pub fn config_key(&self) -> &'static str {
        match self {
            Self::Roof => "roof",
            Self::Wall => "wall",
            Self::Floor => "floor",
        }
    }
}

impl std::fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.config_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityLevel {
    Building,
    Surface(SurfaceKind),
}

impl std::fmt::Display for EntityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Building => write!(f, "building"),
            Self::Surface(kind) => write!(f, "{kind}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One calculated building or surface row.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedRecord {
    pub feature_id: FeatureId,
    /// Surface classname (`RoofSurface`, ...); `None` for buildings.
    pub classname: Option<String>,
    /// Numeric computed attributes. Missing or non-numeric cells are absent.
    pub values: HashMap<String, f64>,
}

impl CalculatedRecord {
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }
}

/// Calculated rows plus the column set the source table declared.
///
/// The column set is tracked separately from the row values so that a column
/// that exists but is empty everywhere is told apart from one that is absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculatedTable {
    pub columns: Vec<String>,
    pub rows: Vec<CalculatedRecord>,
}

impl CalculatedTable {
    pub fn new(columns: Vec<String>, rows: Vec<CalculatedRecord>) -> Self {
        Self { columns, rows }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// A raw reference property as stored with the feature, before mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ThematicProperty {
    pub feature_id: FeatureId,
    pub source_label: String,
    pub value: Option<f64>,
}

/// Reference value resolved to a computed attribute name.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRecord {
    pub feature_id: FeatureId,
    pub attribute_name: String,
    pub thematic_value: Option<f64>,
}

/// Pre-loaded tables for one validation run.
#[derive(Debug, Clone, Default)]
pub struct ValidationInput {
    pub buildings: CalculatedTable,
    pub surfaces: CalculatedTable,
    pub building_properties: Vec<ThematicProperty>,
    pub surface_properties: Vec<ThematicProperty>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One compared (feature, attribute) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub feature_id: FeatureId,
    pub classname: Option<String>,
    pub attribute_name: String,
    pub calculated_value: f64,
    pub thematic_value: f64,
    pub difference: f64,
    pub percent_error: Option<f64>,
    /// `None` until tolerance is checked, and whenever no threshold applies.
    pub within_tolerance: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub attribute_name: String,
    pub count: usize,
    pub mean_difference: f64,
    pub std_difference: Option<f64>,
    pub rmse: f64,
    pub mae: f64,
    pub r_squared: Option<f64>,
    pub mean_percent_error: Option<f64>,
    pub median_percent_error: Option<f64>,
    pub std_percent_error: Option<f64>,
}

/// Descriptive statistics of the reference values of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceStats {
    pub attribute_name: String,
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct LevelReport {
    pub level: String,
    pub records: Vec<ValidationRecord>,
    pub summary: Vec<ValidationSummary>,
    pub outliers: Vec<ValidationRecord>,
    pub flagged: Vec<ValidationRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub meta: ValidationMeta,
    pub building: LevelReport,
    pub surfaces: Vec<LevelReport>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn levels(&self) -> impl Iterator<Item = &LevelReport> {
        std::iter::once(&self.building).chain(self.surfaces.iter())
    }

    pub fn flagged_count(&self) -> usize {
        self.levels().map(|l| l.flagged.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationMeta {
    pub dataset: Option<String>,
    pub engine_version: String,
    pub run_at: String,
    pub tolerance_kind: ToleranceKind,
    pub outlier_method: OutlierMethod,
    pub outlier_threshold: f64,
    pub export_threshold_percent: f64,
}
