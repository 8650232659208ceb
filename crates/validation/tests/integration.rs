use std::path::PathBuf;

use c2t_validation::config::{OutlierMethod, ToleranceKind, ValidationConfig};
use c2t_validation::diagnostics::{Diagnostic, Diagnostics};
use c2t_validation::engine::run;
use c2t_validation::export::{export_flagged, read_records_csv};
use c2t_validation::load::{load_calculated_csv, load_thematic_csv};
use c2t_validation::model::{LevelReport, ValidationInput, ValidationReport};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

fn fixture_config() -> ValidationConfig {
    ValidationConfig::from_toml(&read_fixture("validation.toml")).unwrap()
}

fn load_input(config: &ValidationConfig) -> ValidationInput {
    let inputs = config.inputs.as_ref().expect("fixture config has [inputs]");
    let file = |name: &Option<String>| read_fixture(name.as_deref().unwrap());

    ValidationInput {
        buildings: load_calculated_csv(
            "building_calculated",
            &file(&inputs.building_calculated),
            &inputs.building_id_column,
            None,
        )
        .unwrap(),
        surfaces: load_calculated_csv(
            "surface_calculated",
            &file(&inputs.surface_calculated),
            &inputs.surface_id_column,
            Some(inputs.classname_column.as_str()),
        )
        .unwrap(),
        building_properties: load_thematic_csv(
            "building_thematic",
            &file(&inputs.building_thematic),
        )
        .unwrap(),
        surface_properties: load_thematic_csv(
            "surface_thematic",
            &file(&inputs.surface_thematic),
        )
        .unwrap(),
    }
}

fn load_and_run(config: &ValidationConfig) -> (ValidationReport, Diagnostics) {
    let input = load_input(config);
    let mut diagnostics = Diagnostics::new();
    let report = run(config, &input, &mut diagnostics).unwrap();
    (report, diagnostics)
}

fn surface<'a>(report: &'a ValidationReport, level: &str) -> &'a LevelReport {
    report
        .surfaces
        .iter()
        .find(|l| l.level == level)
        .unwrap_or_else(|| panic!("no {level} level in report"))
}

// -------------------------------------------------------------------------
// Full pipeline
// -------------------------------------------------------------------------

#[test]
fn fixture_record_counts() {
    let (report, _) = load_and_run(&fixture_config());

    assert_eq!(report.meta.dataset.as_deref(), Some("Fixture Quarter"));
    assert_eq!(report.building.records.len(), 9);
    assert_eq!(surface(&report, "roof").records.len(), 13);
    assert_eq!(surface(&report, "wall").records.len(), 2);
    assert_eq!(surface(&report, "floor").records.len(), 1);
    assert_eq!(report.flagged_count(), 4);
}

#[test]
fn fixture_diagnostics() {
    let (report, diagnostics) = load_and_run(&fixture_config());

    assert_eq!(
        diagnostics.entries(),
        &[
            Diagnostic::UndefinedAzimuth {
                level: "roof".into(),
                excluded: 1,
            },
            Diagnostic::NotApplicable {
                level: "wall".into(),
                attribute: "tilt".into(),
            },
        ]
    );
    assert_eq!(report.diagnostics, diagnostics.entries());
}

#[test]
fn building_summary_and_outliers() {
    let (report, _) = load_and_run(&fixture_config());
    let building = &report.building;

    let names: Vec<_> = building.summary.iter().map(|s| s.attribute_name.as_str()).collect();
    assert_eq!(names, vec!["footprint_area", "max_height"]);

    let area = &building.summary[0];
    assert_eq!(area.count, 5);
    assert!((area.mae - 7.6).abs() < 1e-9);
    assert!(area.r_squared.is_some());

    let ids: Vec<_> = building.outliers.iter().map(|r| r.feature_id).collect();
    assert_eq!(ids, vec![1003]);

    assert_eq!(building.flagged.len(), 1);
    assert_eq!(building.flagged[0].feature_id, 1003);
    assert_eq!(building.flagged[0].within_tolerance, Some(false));
}

#[test]
fn height_reference_from_string_value() {
    let (report, _) = load_and_run(&fixture_config());

    let b1002 = report
        .building
        .records
        .iter()
        .find(|r| r.feature_id == 1002 && r.attribute_name == "max_height")
        .unwrap();
    assert_eq!(b1002.thematic_value, 7.0);
    assert_eq!(b1002.within_tolerance, Some(true));

    // 1004 only carries an unmapped property.
    assert!(!report
        .building
        .records
        .iter()
        .any(|r| r.feature_id == 1004 && r.attribute_name == "max_height"));
}

#[test]
fn roof_azimuth_wraps_and_flags_flip() {
    let (report, _) = load_and_run(&fixture_config());
    let roof = surface(&report, "roof");

    let azimuth: Vec<_> = roof.records.iter().filter(|r| r.attribute_name == "azimuth").collect();
    let ids: Vec<_> = azimuth.iter().map(|r| r.feature_id).collect();
    assert_eq!(ids, vec![2001, 2002, 2004, 2005]);

    let flip = azimuth.iter().find(|r| r.feature_id == 2004).unwrap();
    assert_eq!(flip.difference, 175.0);
    assert_eq!(flip.percent_error, None);
    assert_eq!(flip.within_tolerance, Some(false));

    let flagged: Vec<_> = roof
        .flagged
        .iter()
        .map(|r| (r.feature_id, r.attribute_name.as_str()))
        .collect();
    assert_eq!(flagged, vec![(2004, "azimuth"), (2004, "surface_area")]);
}

#[test]
fn wall_skips_roof_only_attributes() {
    let (report, _) = load_and_run(&fixture_config());
    let wall = surface(&report, "wall");

    assert!(wall.records.iter().all(|r| r.attribute_name == "surface_area"));
    assert!(wall.records.iter().all(|r| r.classname.as_deref() == Some("WallSurface")));
    assert_eq!(wall.flagged.len(), 1);
    assert_eq!(wall.flagged[0].feature_id, 3002);
}

// -------------------------------------------------------------------------
// Settings variations
// -------------------------------------------------------------------------

#[test]
fn percent_tolerance_mode() {
    let mut config = fixture_config();
    config.validation.tolerance_kind = ToleranceKind::Percent;
    let (report, _) = load_and_run(&config);

    let within = |id: i64, attribute: &str| {
        report
            .levels()
            .flat_map(|l| l.records.iter())
            .find(|r| r.feature_id == id && r.attribute_name == attribute)
            .unwrap()
            .within_tolerance
    };

    assert_eq!(within(1001, "footprint_area"), Some(true));
    assert_eq!(within(1003, "footprint_area"), Some(false));
    assert_eq!(within(1001, "max_height"), Some(true));
    assert_eq!(within(2001, "tilt"), None);
    assert_eq!(within(2001, "azimuth"), None);
}

#[test]
fn zscore_outliers() {
    let mut config = fixture_config();
    config.validation.outlier_method = OutlierMethod::Zscore;
    let (report, _) = load_and_run(&config);

    let ids: Vec<_> = report.building.outliers.iter().map(|r| r.feature_id).collect();
    assert_eq!(ids, vec![1003]);
    assert_eq!(report.meta.outlier_method, OutlierMethod::Zscore);
}

#[test]
fn flagged_export_round_trip() {
    let (report, _) = load_and_run(&fixture_config());
    let roof = surface(&report, "roof");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roof_flagged.csv");
    let flagged = export_flagged(&roof.records, config_threshold(), &path).unwrap();
    assert_eq!(flagged, roof.flagged);

    let back = read_records_csv(&path).unwrap();
    assert_eq!(back, roof.flagged);
}

fn config_threshold() -> f64 {
    fixture_config().validation.export_threshold_percent
}
