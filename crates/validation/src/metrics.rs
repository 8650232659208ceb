use std::collections::BTreeMap;

use crate::config::{OutlierMethod, ToleranceKind, ToleranceSettings};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ValidationError;
use crate::model::{ReferenceStats, ValidationRecord, ValidationSummary};

// ---------------------------------------------------------------------------
// Basic statistics
// ---------------------------------------------------------------------------

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

// ---------------------------------------------------------------------------
// Error metrics
// ---------------------------------------------------------------------------

fn select<'a>(
    records: &'a [ValidationRecord],
    attribute_name: Option<&str>,
) -> Vec<&'a ValidationRecord> {
    records
        .iter()
        .filter(|r| attribute_name.map_or(true, |a| r.attribute_name == a))
        .collect()
}

/// Group records by attribute name and apply `f` to each group.
pub fn by_attribute<T>(
    records: &[ValidationRecord],
    f: impl Fn(&[&ValidationRecord]) -> T,
) -> BTreeMap<String, T> {
    let mut groups: BTreeMap<&str, Vec<&ValidationRecord>> = BTreeMap::new();
    for r in records {
        groups.entry(r.attribute_name.as_str()).or_default().push(r);
    }
    groups
        .into_iter()
        .map(|(name, group)| (name.to_string(), f(&group)))
        .collect()
}

fn rmse_of(group: &[&ValidationRecord]) -> Option<f64> {
    let squares: Vec<f64> = group.iter().map(|r| r.difference.powi(2)).collect();
    mean(&squares).map(f64::sqrt)
}

fn mae_of(group: &[&ValidationRecord]) -> Option<f64> {
    let abs: Vec<f64> = group.iter().map(|r| r.difference.abs()).collect();
    mean(&abs)
}

/// `1 - SS_res / SS_tot`; undefined below two records or for a constant reference.
fn r_squared_of(group: &[&ValidationRecord]) -> Option<f64> {
    if group.len() < 2 {
        return None;
    }
    let reference: Vec<f64> = group.iter().map(|r| r.thematic_value).collect();
    let ref_mean = mean(&reference)?;
    let ss_res: f64 = group
        .iter()
        .map(|r| (r.calculated_value - r.thematic_value).powi(2))
        .sum();
    let ss_tot: f64 = reference.iter().map(|v| (v - ref_mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return None;
    }
    Some(1.0 - ss_res / ss_tot)
}

/// Root mean square of `difference`, optionally restricted to one attribute.
pub fn rmse(records: &[ValidationRecord], attribute_name: Option<&str>) -> Option<f64> {
    rmse_of(&select(records, attribute_name))
}

/// Mean absolute `difference`, optionally restricted to one attribute.
pub fn mae(records: &[ValidationRecord], attribute_name: Option<&str>) -> Option<f64> {
    mae_of(&select(records, attribute_name))
}

/// Coefficient of determination of calculated against reference values.
pub fn r_squared(records: &[ValidationRecord], attribute_name: Option<&str>) -> Option<f64> {
    r_squared_of(&select(records, attribute_name))
}

/// Per-attribute summary statistics, ordered by attribute name.
pub fn summarize(records: &[ValidationRecord]) -> Vec<ValidationSummary> {
    by_attribute(records, |group| {
        let differences: Vec<f64> = group.iter().map(|r| r.difference).collect();
        let percent: Vec<f64> = group.iter().filter_map(|r| r.percent_error).collect();

        ValidationSummary {
            attribute_name: group[0].attribute_name.clone(),
            count: group.len(),
            mean_difference: mean(&differences).unwrap_or(0.0),
            std_difference: sample_std(&differences),
            rmse: rmse_of(group).unwrap_or(0.0),
            mae: mae_of(group).unwrap_or(0.0),
            r_squared: r_squared_of(group),
            mean_percent_error: mean(&percent),
            median_percent_error: median(&percent),
            std_percent_error: sample_std(&percent),
        }
    })
    .into_values()
    .collect()
}

/// Descriptive statistics of `thematic_value` per attribute.
pub fn describe_reference(records: &[ValidationRecord]) -> Vec<ReferenceStats> {
    by_attribute(records, |group| {
        let values: Vec<f64> = group.iter().map(|r| r.thematic_value).collect();
        ReferenceStats {
            attribute_name: group[0].attribute_name.clone(),
            count: values.len(),
            mean: mean(&values).unwrap_or(0.0),
            std: sample_std(&values),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    })
    .into_values()
    .collect()
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

/// Computed attributes that share a tolerance key with other attributes.
const TOLERANCE_ALIASES: &[(&str, &str)] = &[("min_height", "height"), ("max_height", "height")];

/// Key under which an attribute's threshold is configured.
pub fn tolerance_key(attribute_name: &str) -> &str {
    TOLERANCE_ALIASES
        .iter()
        .find(|(name, _)| *name == attribute_name)
        .map(|(_, key)| *key)
        .unwrap_or(attribute_name)
}

/// Thresholds of one tolerance kind, looked up by attribute name.
#[derive(Debug, Clone)]
pub struct ToleranceTable {
    kind: ToleranceKind,
    thresholds: BTreeMap<String, f64>,
}

impl ToleranceTable {
    pub fn new(settings: &ToleranceSettings, kind: ToleranceKind) -> Self {
        Self {
            kind,
            thresholds: settings.thresholds(kind).clone(),
        }
    }

    pub fn kind(&self) -> ToleranceKind {
        self.kind
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    pub fn threshold_for(&self, attribute_name: &str) -> Option<f64> {
        self.thresholds.get(tolerance_key(attribute_name)).copied()
    }

    /// `None` when no threshold is configured or the measure is undefined.
    pub fn check(&self, record: &ValidationRecord) -> Option<bool> {
        let threshold = self.threshold_for(&record.attribute_name)?;
        match self.kind {
            ToleranceKind::Absolute => Some(record.difference.abs() <= threshold),
            ToleranceKind::Percent => record.percent_error.map(|p| p.abs() <= threshold),
        }
    }
}

/// Copy of `records` with `within_tolerance` set from the configured thresholds.
pub fn check_tolerance(
    records: &[ValidationRecord],
    tolerance: &ToleranceSettings,
    kind: ToleranceKind,
    diagnostics: &mut Diagnostics,
) -> Vec<ValidationRecord> {
    let table = ToleranceTable::new(tolerance, kind);
    if table.is_empty() && !records.is_empty() {
        diagnostics.push(Diagnostic::NoTolerances {
            tolerance_kind: table.kind(),
        });
    }

    records
        .iter()
        .map(|r| ValidationRecord {
            within_tolerance: table.check(r),
            ..r.clone()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Outliers
// ---------------------------------------------------------------------------

/// Records whose `difference` is an outlier within the selection.
pub fn detect_outliers(
    records: &[ValidationRecord],
    attribute_name: Option<&str>,
    method: OutlierMethod,
    threshold: f64,
) -> Result<Vec<ValidationRecord>, ValidationError> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(ValidationError::InvalidArgument(format!(
            "outlier threshold must be a non-negative number, got {threshold}"
        )));
    }

    let selected = select(records, attribute_name);
    let differences: Vec<f64> = selected.iter().map(|r| r.difference).collect();

    let is_outlier: Box<dyn Fn(f64) -> bool> = match method {
        OutlierMethod::Iqr => {
            let (Some(q1), Some(q3)) = (quantile(&differences, 0.25), quantile(&differences, 0.75))
            else {
                return Ok(Vec::new());
            };
            let iqr = q3 - q1;
            let lower = q1 - threshold * iqr;
            let upper = q3 + threshold * iqr;
            Box::new(move |x| x < lower || x > upper)
        }
        OutlierMethod::Zscore => {
            let (Some(m), Some(std)) = (mean(&differences), sample_std(&differences)) else {
                return Ok(Vec::new());
            };
            if std == 0.0 {
                return Ok(Vec::new());
            }
            Box::new(move |x| ((x - m) / std).abs() > threshold)
        }
    };

    Ok(selected
        .into_iter()
        .filter(|r| is_outlier(r.difference))
        .cloned()
        .collect())
}

/// Same as [`detect_outliers`], with the method given by name.
pub fn detect_outliers_by_name(
    records: &[ValidationRecord],
    attribute_name: Option<&str>,
    method: &str,
    threshold: f64,
) -> Result<Vec<ValidationRecord>, ValidationError> {
    detect_outliers(records, attribute_name, method.parse()?, threshold)
}
