//! CSV loaders for calculated tables and thematic property tables.

use std::collections::HashMap;

use crate::error::ValidationError;
use crate::model::{CalculatedRecord, CalculatedTable, FeatureId, ThematicProperty};

/// Candidate value columns of a thematic table, in priority order.
const THEMATIC_VALUE_COLUMNS: [&str; 3] = ["thematic_value", "val_double", "val_string"];

/// Candidate label columns of a thematic table.
const THEMATIC_LABEL_COLUMNS: [&str; 2] = ["source_label", "name"];

/// Parse a finite number; anything else is treated as missing.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn read_headers(
    table: &str,
    reader: &mut csv::Reader<&[u8]>,
) -> Result<Vec<String>, ValidationError> {
    let headers = reader.headers()?;
    if headers.is_empty() {
        return Err(ValidationError::MissingColumn {
            table: table.into(),
            column: "<header>".into(),
        });
    }
    Ok(headers.iter().map(|h| h.trim().to_string()).collect())
}

fn column_index(table: &str, headers: &[String], name: &str) -> Result<usize, ValidationError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| ValidationError::MissingColumn {
            table: table.into(),
            column: name.into(),
        })
}

fn parse_feature_id(
    table: &str,
    row: usize,
    column: &str,
    raw: &str,
) -> Result<FeatureId, ValidationError> {
    raw.trim().parse().map_err(|_| ValidationError::ValueParse {
        table: table.into(),
        row,
        column: column.into(),
        value: raw.into(),
    })
}

/// Load a calculated building or surface table.
///
/// Every header becomes a known column. Cells that are not finite numbers
/// are left out of the row's values.
pub fn load_calculated_csv(
    table: &str,
    csv_data: &str,
    id_column: &str,
    classname_column: Option<&str>,
) -> Result<CalculatedTable, ValidationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers = read_headers(table, &mut reader)?;
    let id_idx = column_index(table, &headers, id_column)?;
    let class_idx = classname_column
        .map(|c| column_index(table, &headers, c))
        .transpose()?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;

        let feature_id = parse_feature_id(table, row, id_column, record.get(id_idx).unwrap_or(""))?;
        let classname = class_idx
            .and_then(|ci| record.get(ci))
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let mut values = HashMap::new();
        for (ci, header) in headers.iter().enumerate() {
            if ci == id_idx || Some(ci) == class_idx {
                continue;
            }
            if let Some(v) = record.get(ci).and_then(parse_number) {
                values.insert(header.clone(), v);
            }
        }

        rows.push(CalculatedRecord {
            feature_id,
            classname,
            values,
        });
    }

    tracing::debug!(table, rows = rows.len(), "loaded calculated table");
    Ok(CalculatedTable::new(headers, rows))
}

/// Load raw thematic properties (`feature_id`, label, value).
///
/// The label comes from `source_label` (or `name`); the value from the first
/// of `thematic_value`, `val_double`, `val_string` that holds a number.
pub fn load_thematic_csv(
    table: &str,
    csv_data: &str,
) -> Result<Vec<ThematicProperty>, ValidationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers = read_headers(table, &mut reader)?;
    let id_idx = column_index(table, &headers, "feature_id")?;
    let label_idx = THEMATIC_LABEL_COLUMNS
        .iter()
        .find_map(|c| headers.iter().position(|h| h == c))
        .ok_or_else(|| ValidationError::MissingColumn {
            table: table.into(),
            column: THEMATIC_LABEL_COLUMNS[0].into(),
        })?;
    let value_idxs: Vec<usize> = THEMATIC_VALUE_COLUMNS
        .iter()
        .filter_map(|c| headers.iter().position(|h| h == c))
        .collect();
    if value_idxs.is_empty() {
        return Err(ValidationError::MissingColumn {
            table: table.into(),
            column: THEMATIC_VALUE_COLUMNS[0].into(),
        });
    }

    let mut out = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let feature_id =
            parse_feature_id(table, i + 1, "feature_id", record.get(id_idx).unwrap_or(""))?;
        let source_label = record.get(label_idx).unwrap_or("").trim().to_string();
        let value = value_idxs
            .iter()
            .find_map(|&vi| record.get(vi).and_then(parse_number));

        out.push(ThematicProperty {
            feature_id,
            source_label,
            value,
        });
    }

    tracing::debug!(table, rows = out.len(), "loaded thematic properties");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_rejects_non_finite() {
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn load_surfaces() {
        let csv = "\
surface_feature_id,building_feature_id,classname,surface_area,tilt,azimuth,is_valid
10,1,RoofSurface,50.5,30,180,true
11,1,WallSurface,20,,,true
";
        let table =
            load_calculated_csv("surfaces", csv, "surface_feature_id", Some("classname")).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.has_column("azimuth"));
        assert!(!table.has_column("volume"));

        let roof = &table.rows[0];
        assert_eq!(roof.feature_id, 10);
        assert_eq!(roof.classname.as_deref(), Some("RoofSurface"));
        assert_eq!(roof.value("surface_area"), Some(50.5));
        assert_eq!(roof.value("building_feature_id"), Some(1.0));
        assert_eq!(roof.value("is_valid"), None);

        let wall = &table.rows[1];
        assert_eq!(wall.value("tilt"), None);
    }

    #[test]
    fn load_buildings_without_classname() {
        let csv = "building_feature_id,footprint_area\n1,100\n2,abc\n";
        let table = load_calculated_csv("buildings", csv, "building_feature_id", None).unwrap();
        assert_eq!(table.rows[0].classname, None);
        assert_eq!(table.rows[1].value("footprint_area"), None);
    }

    #[test]
    fn missing_id_column_is_error() {
        let csv = "id,footprint_area\n1,100\n";
        let err = load_calculated_csv("buildings", csv, "building_feature_id", None).unwrap_err();
        assert!(err.to_string().contains("missing column 'building_feature_id'"));
    }

    #[test]
    fn bad_id_is_error() {
        let csv = "building_feature_id,footprint_area\nB-1,100\n";
        let err = load_calculated_csv("buildings", csv, "building_feature_id", None).unwrap_err();
        assert!(matches!(err, ValidationError::ValueParse { row: 1, .. }));
    }

    #[test]
    fn thematic_prefers_double_then_string() {
        let csv = "\
feature_id,name,val_double,val_string
1,Flaeche,120.5,
1,value,,9.75
2,Dachneigung,,steep
";
        let props = load_thematic_csv("properties", csv).unwrap();
        assert_eq!(props.len(), 3);
        assert_eq!(props[0].source_label, "Flaeche");
        assert_eq!(props[0].value, Some(120.5));
        assert_eq!(props[1].value, Some(9.75));
        assert_eq!(props[2].value, None);
    }

    #[test]
    fn thematic_requires_value_column() {
        let csv = "feature_id,source_label,comment\n1,Flaeche,x\n";
        let err = load_thematic_csv("properties", csv).unwrap_err();
        assert!(err.to_string().contains("thematic_value"));
    }
}
