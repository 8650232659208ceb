//! `c2t-validate run | check | describe` — config-driven attribute validation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use c2t_validation::config::{
    AttributesConfig, DatasetInfo, InputsConfig, ToleranceKind, ValidationConfig,
};
use c2t_validation::export::{export_flagged, read_records_csv, write_records_csv};
use c2t_validation::load::{load_calculated_csv, load_thematic_csv};
use c2t_validation::mapping::AttributeMapping;
use c2t_validation::metrics::describe_reference;
use c2t_validation::model::{
    CalculatedTable, EntityLevel, LevelReport, SurfaceKind, ThematicProperty, ValidationInput,
    ValidationRecord, ValidationReport,
};
use c2t_validation::Diagnostics;

use crate::exit_codes::{EXIT_ERROR, EXIT_FLAGGED, EXIT_INVALID_CONFIG, EXIT_RUNTIME};
use crate::CliError;

fn runtime_err(msg: impl Into<String>) -> CliError {
    CliError::new(EXIT_RUNTIME, msg)
}

fn read_config(config_path: &Path) -> Result<ValidationConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        runtime_err(format!("cannot read config {}: {e}", config_path.display()))
    })?;
    let config = ValidationConfig::from_toml(&config_str)?;
    tracing::debug!(config = %config_path.display(), "config loaded");
    Ok(config)
}

/// Read an optional input file relative to the config file's directory.
fn read_input(base_dir: &Path, file: Option<&str>) -> Result<Option<String>, CliError> {
    let Some(file) = file else {
        return Ok(None);
    };
    let path = base_dir.join(file);
    std::fs::read_to_string(&path)
        .map(Some)
        .map_err(|e| runtime_err(format!("cannot read {}: {e}", path.display())))
}

fn load_calculated(
    base_dir: &Path,
    file: Option<&str>,
    id_column: &str,
    classname_column: Option<&str>,
) -> Result<CalculatedTable, CliError> {
    match (read_input(base_dir, file)?, file) {
        (Some(data), Some(name)) => {
            Ok(load_calculated_csv(name, &data, id_column, classname_column)?)
        }
        _ => Ok(CalculatedTable::default()),
    }
}

fn load_thematic(base_dir: &Path, file: Option<&str>) -> Result<Vec<ThematicProperty>, CliError> {
    match (read_input(base_dir, file)?, file) {
        (Some(data), Some(name)) => Ok(load_thematic_csv(name, &data)?),
        _ => Ok(Vec::new()),
    }
}

fn load_input(inputs: &InputsConfig, base_dir: &Path) -> Result<ValidationInput, CliError> {
    Ok(ValidationInput {
        buildings: load_calculated(
            base_dir,
            inputs.building_calculated.as_deref(),
            &inputs.building_id_column,
            None,
        )?,
        surfaces: load_calculated(
            base_dir,
            inputs.surface_calculated.as_deref(),
            &inputs.surface_id_column,
            Some(inputs.classname_column.as_str()),
        )?,
        building_properties: load_thematic(base_dir, inputs.building_thematic.as_deref())?,
        surface_properties: load_thematic(base_dir, inputs.surface_thematic.as_deref())?,
    })
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    fail_on_flagged: bool,
) -> Result<(), CliError> {
    if let Some(ref dir) = out_dir {
        if dir.is_file() {
            return Err(CliError::usage(format!(
                "--out-dir {} is a file, not a directory",
                dir.display()
            )));
        }
    }

    let config = read_config(&config_path)?;
    let inputs = config.inputs.as_ref().ok_or_else(|| {
        CliError::new(EXIT_INVALID_CONFIG, "config has no [inputs] section").with_hint(
            "add [inputs] with building_calculated, surface_calculated, \
             building_thematic, surface_thematic",
        )
    })?;

    // Resolve file paths relative to config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let input = load_input(inputs, base_dir)?;

    let mut diagnostics = Diagnostics::new();
    let report = c2t_validation::run(&config, &input, &mut diagnostics)?;

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| runtime_err(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref dir) = out_dir {
        write_level_csvs(&report, dir, config.validation.export_threshold_percent)?;
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&report);

    let flagged = report.flagged_count();
    if fail_on_flagged && flagged > 0 {
        return Err(CliError::new(
            EXIT_FLAGGED,
            format!("{flagged} flagged record(s) above the export threshold"),
        ));
    }

    Ok(())
}

/// `<level>_validation.csv` and `<level>_flagged.csv` for every level in the report.
fn write_level_csvs(
    report: &ValidationReport,
    dir: &Path,
    threshold_percent: f64,
) -> Result<(), CliError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| runtime_err(format!("cannot create {}: {e}", dir.display())))?;

    for level in report.levels() {
        let records_path = dir.join(format!("{}_validation.csv", level.level));
        write_records_csv(&records_path, &level.records)?;

        let flagged_path = dir.join(format!("{}_flagged.csv", level.level));
        export_flagged(&level.records, threshold_percent, &flagged_path)?;
    }

    eprintln!("wrote {} level(s) to {}", report.levels().count(), dir.display());
    Ok(())
}

fn print_summary(report: &ValidationReport) {
    if let Some(ref name) = report.meta.dataset {
        eprintln!("dataset: {name}");
    }
    for level in report.levels() {
        print_level(level);
    }
    eprintln!(
        "{} flagged, {} diagnostic(s)",
        report.flagged_count(),
        report.diagnostics.len()
    );
}

fn print_level(level: &LevelReport) {
    let outside = level
        .records
        .iter()
        .filter(|r| r.within_tolerance == Some(false))
        .count();
    eprintln!(
        "{}: {} records, {} outside tolerance, {} outliers, {} flagged",
        level.level,
        level.records.len(),
        outside,
        level.outliers.len(),
        level.flagged.len(),
    );

    for s in &level.summary {
        let r2 = s
            .r_squared
            .map(|v| format!("{v:.3}"))
            .unwrap_or_else(|| "-".into());
        let pct = s
            .mean_percent_error
            .map(|v| format!("{v:+.2}%"))
            .unwrap_or_else(|| "-".into());
        eprintln!(
            "  {:<16} n={:<5} mean={:+.3} rmse={:.3} mae={:.3} r2={} pct={}",
            s.attribute_name, s.count, s.mean_difference, s.rmse, s.mae, r2, pct,
        );
    }
}

// ============================================================================
// check
// ============================================================================

pub fn cmd_check(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;

    print_dataset(&config.dataset);

    let attributes = &config.attributes;
    print_mapping(
        attributes,
        &AttributeMapping::resolve(attributes, EntityLevel::Building),
        &[],
    );
    for kind in SurfaceKind::ALL {
        let (mapping, dropped) =
            AttributeMapping::resolve(attributes, EntityLevel::Surface(kind)).restricted_to(kind);
        print_mapping(attributes, &mapping, &dropped);
    }

    let s = &config.validation;
    println!(
        "validation: tolerance={} export_threshold={}% outliers={} (threshold {})",
        s.tolerance_kind, s.export_threshold_percent, s.outlier_method, s.outlier_threshold,
    );
    for kind in [ToleranceKind::Absolute, ToleranceKind::Percent] {
        print_thresholds(kind, s.tolerance.thresholds(kind));
    }

    eprintln!("config ok: {}", config_path.display());
    Ok(())
}

fn print_dataset(dataset: &DatasetInfo) {
    println!("dataset: {}", dataset.name.as_deref().unwrap_or("unnamed"));
    if let Some(ref country) = dataset.country {
        println!("  country: {country}");
    }
    if let Some(lod) = dataset.lod {
        println!("  lod: {lod}");
    }
    if let Some(ref description) = dataset.description {
        println!("  description: {description}");
    }
}

fn print_mapping(
    attributes: &AttributesConfig,
    mapping: &AttributeMapping,
    not_applicable: &[String],
) {
    if mapping.is_empty() && not_applicable.is_empty() {
        return;
    }
    println!("[{}]", mapping.level());
    for (attribute, label) in mapping.iter() {
        match attributes.unit_of(mapping.level(), attribute) {
            Some(unit) => println!("  {attribute} <- {label} ({unit})"),
            None => println!("  {attribute} <- {label}"),
        }
    }
    for attribute in not_applicable {
        println!("  {attribute} (not validated for this surface type)");
    }
}

fn print_thresholds(kind: ToleranceKind, thresholds: &BTreeMap<String, f64>) {
    if thresholds.is_empty() {
        return;
    }
    let entries: Vec<String> = thresholds
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    println!("tolerance.{kind}: {}", entries.join(" "));
}

// ============================================================================
// describe
// ============================================================================

pub fn cmd_describe(files: Vec<PathBuf>, json_output: bool) -> Result<(), CliError> {
    let mut records: Vec<ValidationRecord> = Vec::new();
    for path in &files {
        let mut rows = read_records_csv(path).map_err(|e| {
            let hint = format!("{} must be a CSV written by `run --out-dir`", path.display());
            CliError::from(e).with_hint(hint)
        })?;
        records.append(&mut rows);
    }

    let stats = describe_reference(&records);

    if json_output {
        let json_str = serde_json::to_string_pretty(&stats)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    println!(
        "{:<16} {:>6} {:>12} {:>12} {:>12} {:>12}",
        "attribute", "count", "mean", "std", "min", "max"
    );
    for s in &stats {
        let std = s.std.map(|v| format!("{v:.3}")).unwrap_or_else(|| "-".into());
        println!(
            "{:<16} {:>6} {:>12.3} {:>12} {:>12.3} {:>12.3}",
            s.attribute_name, s.count, s.mean, std, s.min, s.max
        );
    }
    Ok(())
}
