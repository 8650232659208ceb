use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::ValidationError;
use crate::model::ValidationRecord;

/// Angular distance above which an azimuth comparison is treated as a
/// probable orientation flip, regardless of the percent threshold.
pub const AZIMUTH_FLIP_DIFFERENCE: f64 = 170.0;

/// Column order of exported validation CSVs.
pub const RECORD_COLUMNS: [&str; 8] = [
    "feature_id",
    "classname",
    "attribute_name",
    "calculated_value",
    "thematic_value",
    "difference",
    "percent_error",
    "within_tolerance",
];

pub fn is_flagged(record: &ValidationRecord, threshold_percent: f64) -> bool {
    let percent_exceeded = record
        .percent_error
        .is_some_and(|p| p.abs() > threshold_percent);
    percent_exceeded || record.difference.abs() > AZIMUTH_FLIP_DIFFERENCE
}

/// Records exceeding the export threshold, in input order.
pub fn flag_records(records: &[ValidationRecord], threshold_percent: f64) -> Vec<ValidationRecord> {
    records
        .iter()
        .filter(|r| is_flagged(r, threshold_percent))
        .cloned()
        .collect()
}

/// Write records as CSV. The header is written even when `records` is empty.
pub fn write_records<W: Write>(
    writer: W,
    records: &[ValidationRecord],
) -> Result<(), ValidationError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(RECORD_COLUMNS)?;
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_records_csv(path: &Path, records: &[ValidationRecord]) -> Result<(), ValidationError> {
    write_records(File::create(path)?, records)
}

/// Write the flagged subset of `records` to `path` and return it.
pub fn export_flagged(
    records: &[ValidationRecord],
    threshold_percent: f64,
    path: &Path,
) -> Result<Vec<ValidationRecord>, ValidationError> {
    let flagged = flag_records(records, threshold_percent);
    write_records_csv(path, &flagged)?;
    tracing::info!(
        path = %path.display(),
        flagged = flagged.len(),
        threshold_percent,
        "exported flagged records"
    );
    Ok(flagged)
}

/// Read records previously written by [`write_records`].
pub fn read_records<R: Read>(reader: R) -> Result<Vec<ValidationRecord>, ValidationError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut out = Vec::new();
    for record in rdr.deserialize() {
        out.push(record?);
    }
    Ok(out)
}

pub fn read_records_csv(path: &Path) -> Result<Vec<ValidationRecord>, ValidationError> {
    read_records(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(
        id: i64,
        attribute: &str,
        difference: f64,
        percent_error: Option<f64>,
    ) -> ValidationRecord {
        ValidationRecord {
            feature_id: id,
            classname: Some("RoofSurface".into()),
            attribute_name: attribute.into(),
            calculated_value: 0.0,
            thematic_value: 0.0,
            difference,
            percent_error,
            within_tolerance: None,
        }
    }

    #[test]
    fn percent_over_threshold_flagged() {
        assert!(is_flagged(&rec(1, "surface_area", 1.5, Some(15.0)), 10.0));
        assert!(is_flagged(&rec(1, "surface_area", -1.5, Some(-15.0)), 10.0));
        assert!(!is_flagged(&rec(1, "surface_area", 0.5, Some(5.0)), 10.0));
        assert!(!is_flagged(&rec(1, "surface_area", 1.0, Some(10.0)), 10.0));
    }

    #[test]
    fn azimuth_flip_flagged_by_difference() {
        assert!(is_flagged(&rec(2, "azimuth", 175.0, Some(5.0)), 10.0));
        assert!(is_flagged(&rec(2, "azimuth", 175.0, None), 10.0));
        assert!(!is_flagged(&rec(2, "azimuth", 170.0, None), 10.0));
        assert!(!is_flagged(&rec(2, "tilt", 40.0, None), 10.0));
    }

    #[test]
    fn flag_records_keeps_order() {
        let records = vec![
            rec(1, "surface_area", 1.5, Some(15.0)),
            rec(2, "surface_area", 0.1, Some(1.0)),
            rec(3, "azimuth", 178.0, None),
        ];
        let flagged = flag_records(&records, 10.0);
        let ids: Vec<_> = flagged.iter().map(|r| r.feature_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn csv_header_and_nulls() {
        let mut records = vec![rec(7, "azimuth", 12.5, None)];
        records[0].within_tolerance = Some(true);
        let mut buf = Vec::new();
        write_records(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), RECORD_COLUMNS.join(","));
        assert_eq!(lines.next().unwrap(), "7,RoofSurface,azimuth,0.0,0.0,12.5,,true");
    }

    #[test]
    fn empty_export_still_has_header() {
        let mut buf = Vec::new();
        write_records(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().trim_end(), RECORD_COLUMNS.join(","));
    }

    #[test]
    fn read_back_preserves_nulls() {
        let mut buf = Vec::new();
        let records = vec![rec(1, "surface_area", 1.5, Some(15.0)), rec(3, "azimuth", 178.0, None)];
        write_records(&mut buf, &records).unwrap();
        let back = read_records(buf.as_slice()).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn export_flagged_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roof_flagged.csv");
        let records = vec![
            rec(1, "surface_area", 1.5, Some(15.0)),
            rec(2, "azimuth", 175.0, None),
            rec(3, "surface_area", 0.2, Some(5.0)),
        ];
        let flagged = export_flagged(&records, 10.0, &path).unwrap();
        assert_eq!(flagged.len(), 2);

        let back = read_records_csv(&path).unwrap();
        assert_eq!(back, flagged);
    }
}
