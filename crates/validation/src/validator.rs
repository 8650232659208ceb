use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::mapping::AttributeMapping;
use crate::model::{
    CalculatedRecord, CalculatedTable, EntityLevel, FeatureId, ReferenceRecord, SurfaceKind,
    ValidationRecord,
};
use crate::semantics;

/// Compare building-level calculated values with their reference values.
pub fn validate_entity_attributes(
    calculated: &CalculatedTable,
    reference: &[ReferenceRecord],
    mapping: &AttributeMapping,
    diagnostics: &mut Diagnostics,
) -> Vec<ValidationRecord> {
    let level = EntityLevel::Building;
    if calculated.is_empty() || reference.is_empty() {
        diagnostics.push(Diagnostic::EmptyInput { level: level.to_string() });
        return Vec::new();
    }

    let rows: Vec<&CalculatedRecord> = calculated.rows.iter().collect();
    join_attributes(level, calculated, &rows, reference, mapping, diagnostics)
}

/// Compare calculated values of one surface subtype with their reference values.
///
/// Attributes not validated for `subtype` (tilt and azimuth outside roofs)
/// are dropped from `mapping` and reported as not applicable.
pub fn validate_surface_attributes(
    calculated: &CalculatedTable,
    reference: &[ReferenceRecord],
    mapping: &AttributeMapping,
    subtype: SurfaceKind,
    diagnostics: &mut Diagnostics,
) -> Vec<ValidationRecord> {
    let level = EntityLevel::Surface(subtype);
    let (mapping, dropped) = mapping.restricted_to(subtype);
    for attribute in dropped {
        diagnostics.push(Diagnostic::NotApplicable {
            level: level.to_string(),
            attribute,
        });
    }

    if calculated.is_empty() || reference.is_empty() {
        diagnostics.push(Diagnostic::EmptyInput { level: level.to_string() });
        return Vec::new();
    }

    let classname = subtype.classname();
    let rows: Vec<&CalculatedRecord> = calculated
        .rows
        .iter()
        .filter(|r| r.classname.as_deref() == Some(classname))
        .collect();

    if rows.is_empty() {
        diagnostics.push(Diagnostic::NoSurfaces { classname: classname.into() });
        return Vec::new();
    }

    join_attributes(level, calculated, &rows, reference, &mapping, diagnostics)
}

/// Inner-join calculated rows and reference rows per mapped attribute.
///
/// Output is grouped by attribute (mapping order) and sorted by feature id
/// within each attribute.
fn join_attributes(
    level: EntityLevel,
    table: &CalculatedTable,
    rows: &[&CalculatedRecord],
    reference: &[ReferenceRecord],
    mapping: &AttributeMapping,
    diagnostics: &mut Diagnostics,
) -> Vec<ValidationRecord> {
    let level_name = level.to_string();

    let mut by_feature: BTreeMap<FeatureId, &CalculatedRecord> = BTreeMap::new();
    for &row in rows {
        if by_feature.contains_key(&row.feature_id) {
            diagnostics.push(Diagnostic::DuplicateFeature {
                level: level_name.clone(),
                feature_id: row.feature_id,
            });
            continue;
        }
        by_feature.insert(row.feature_id, row);
    }

    let reference_index = index_reference(&level_name, reference, mapping, diagnostics);

    let mut out = Vec::new();

    for (attribute, _label) in mapping.iter() {
        if !table.has_column(attribute) {
            diagnostics.push(Diagnostic::MissingColumn {
                level: level_name.clone(),
                attribute: attribute.into(),
            });
            continue;
        }

        let Some(values) = reference_index.get(attribute) else {
            diagnostics.push(Diagnostic::NoReferenceData {
                level: level_name.clone(),
                attribute: attribute.into(),
            });
            continue;
        };

        let mut excluded = 0;
        for (feature_id, thematic_value) in values {
            let Some(row) = by_feature.get(feature_id) else {
                continue;
            };
            let Some(calculated_value) = row.value(attribute) else {
                continue;
            };

            match semantics::compute(attribute, calculated_value, *thematic_value) {
                Some(measure) => out.push(ValidationRecord {
                    feature_id: *feature_id,
                    classname: row.classname.clone(),
                    attribute_name: attribute.to_string(),
                    calculated_value,
                    thematic_value: *thematic_value,
                    difference: measure.difference,
                    percent_error: measure.percent_error,
                    within_tolerance: None,
                }),
                None => excluded += 1,
            }
        }

        if excluded > 0 {
            diagnostics.push(Diagnostic::UndefinedAzimuth {
                level: level_name.clone(),
                excluded,
            });
        }
    }

    if out.is_empty() {
        diagnostics.push(Diagnostic::NoResults { level: level_name });
        return out;
    }

    let features: BTreeSet<FeatureId> = out.iter().map(|r| r.feature_id).collect();
    tracing::info!(
        level = %level,
        records = out.len(),
        features = features.len(),
        "validated attribute values"
    );

    out
}

/// attribute -> feature -> reference value, for mapped attributes only.
/// Rows without a numeric value are skipped; the first value per feature wins.
fn index_reference<'a>(
    level_name: &str,
    reference: &'a [ReferenceRecord],
    mapping: &AttributeMapping,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<&'a str, BTreeMap<FeatureId, f64>> {
    let mut index: BTreeMap<&str, BTreeMap<FeatureId, f64>> = BTreeMap::new();

    for r in reference {
        if mapping.source_label(&r.attribute_name).is_none() {
            continue;
        }
        let Some(value) = r.thematic_value.filter(|v| v.is_finite()) else {
            continue;
        };

        let per_feature = index.entry(r.attribute_name.as_str()).or_default();
        if per_feature.contains_key(&r.feature_id) {
            diagnostics.push(Diagnostic::DuplicateReference {
                level: level_name.into(),
                attribute: r.attribute_name.clone(),
                feature_id: r.feature_id,
            });
            continue;
        }
        per_feature.insert(r.feature_id, value);
    }

    index
}
