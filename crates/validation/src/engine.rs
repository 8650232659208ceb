use crate::config::{ValidationConfig, ValidationSettings};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ValidationError;
use crate::export::flag_records;
use crate::mapping::AttributeMapping;
use crate::metrics::{check_tolerance, detect_outliers, summarize};
use crate::model::{
    EntityLevel, LevelReport, SurfaceKind, ValidationInput, ValidationMeta, ValidationRecord,
    ValidationReport,
};
use crate::validator::{validate_entity_attributes, validate_surface_attributes};

/// Validate buildings and every configured surface subtype.
///
/// Recoverable data issues are pushed into `diagnostics` and copied into the
/// report; only invalid settings abort the run.
pub fn run(
    config: &ValidationConfig,
    input: &ValidationInput,
    diagnostics: &mut Diagnostics,
) -> Result<ValidationReport, ValidationError> {
    let settings = &config.validation;

    let building = {
        let mapping = AttributeMapping::resolve(&config.attributes, EntityLevel::Building);
        let reference = mapping.expand_reference(&input.building_properties);
        let records =
            validate_entity_attributes(&input.buildings, &reference, &mapping, diagnostics);
        finish_level(EntityLevel::Building, records, settings, diagnostics)?
    };

    let mut surfaces = Vec::new();
    for kind in SurfaceKind::ALL {
        let level = EntityLevel::Surface(kind);
        let mapping = AttributeMapping::resolve(&config.attributes, level);
        let (applicable, dropped) = mapping.restricted_to(kind);
        if applicable.is_empty() {
            for attribute in dropped {
                diagnostics.push(Diagnostic::NotApplicable {
                    level: level.to_string(),
                    attribute,
                });
            }
            tracing::debug!(level = %level, "no attributes configured, skipping");
            continue;
        }

        let reference = mapping.expand_reference(&input.surface_properties);
        let records =
            validate_surface_attributes(&input.surfaces, &reference, &mapping, kind, diagnostics);
        surfaces.push(finish_level(level, records, settings, diagnostics)?);
    }

    let report = ValidationReport {
        meta: ValidationMeta {
            dataset: config.dataset.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            tolerance_kind: settings.tolerance_kind,
            outlier_method: settings.outlier_method,
            outlier_threshold: settings.outlier_threshold,
            export_threshold_percent: settings.export_threshold_percent,
        },
        building,
        surfaces,
        diagnostics: diagnostics.entries().to_vec(),
    };

    tracing::info!(
        levels = report.levels().count(),
        flagged = report.flagged_count(),
        diagnostics = report.diagnostics.len(),
        "validation run complete"
    );
    Ok(report)
}

/// Tolerance, summary, outliers and flagged subset for one level's records.
fn finish_level(
    level: EntityLevel,
    records: Vec<ValidationRecord>,
    settings: &ValidationSettings,
    diagnostics: &mut Diagnostics,
) -> Result<LevelReport, ValidationError> {
    let records = check_tolerance(
        &records,
        &settings.tolerance,
        settings.tolerance_kind,
        diagnostics,
    );
    let summary = summarize(&records);

    let mut outliers = Vec::new();
    for s in &summary {
        outliers.extend(detect_outliers(
            &records,
            Some(s.attribute_name.as_str()),
            settings.outlier_method,
            settings.outlier_threshold,
        )?);
    }

    let flagged = flag_records(&records, settings.export_threshold_percent);

    tracing::debug!(
        level = %level,
        records = records.len(),
        outliers = outliers.len(),
        flagged = flagged.len(),
        "level finished"
    );

    Ok(LevelReport {
        level: level.to_string(),
        records,
        summary,
        outliers,
        flagged,
    })
}
