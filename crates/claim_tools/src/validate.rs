//! Catalog validation.
//!
//! The engine trusts its templates at runtime. These checks catch broken
//! level ladders before a catalog ships.

use std::collections::BTreeSet;
use std::path::Path;

use claim_core::catalog::BuildingTemplate;
use claim_core::error::{ClaimError, Result};
use serde::Serialize;

/// Problems found in one catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
    /// Number of templates checked.
    pub templates: usize,
    /// Problems the engine cannot work around.
    pub errors: Vec<String>,
    /// Suspicious data that still loads.
    pub warnings: Vec<String>,
}

impl CatalogReport {
    /// Check if no errors were found. Warnings do not count.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a list of templates.
#[must_use]
pub fn validate_templates(templates: &[BuildingTemplate]) -> CatalogReport {
    let mut report = CatalogReport {
        templates: templates.len(),
        ..CatalogReport::default()
    };

    let mut seen = BTreeSet::new();
    for template in templates {
        if !seen.insert(&template.id) {
            report
                .errors
                .push(format!("{}: duplicate template id", template.id));
        }
        check_template(template, &mut report);
    }
    report
}

fn check_template(template: &BuildingTemplate, report: &mut CatalogReport) {
    let id = &template.id;

    if template.max_level == 0 {
        report.errors.push(format!("{id}: max_level must be at least 1"));
    }
    if template.max_per_territory == 0 {
        report
            .errors
            .push(format!("{id}: max_per_territory must be at least 1"));
    }

    let levels = template.max_level as usize;
    if template.build_time_secs_by_level.len() != levels {
        report.errors.push(format!(
            "{id}: build_time_secs_by_level has {} entries, expected {levels}",
            template.build_time_secs_by_level.len()
        ));
    }
    if template.required_resources_by_level.len() != levels {
        report.errors.push(format!(
            "{id}: required_resources_by_level has {} entries, expected {levels}",
            template.required_resources_by_level.len()
        ));
    }

    for (i, pair) in template.build_time_secs_by_level.windows(2).enumerate() {
        if pair[1] < pair[0] {
            report.warnings.push(format!(
                "{id}: level {} builds faster than level {} ({}s < {}s)",
                i + 2,
                i + 1,
                pair[1],
                pair[0]
            ));
        }
    }

    for (i, pair) in template.required_resources_by_level.windows(2).enumerate() {
        for (resource, &previous) in &pair[0] {
            let next = pair[1].get(resource).copied().unwrap_or(0);
            if next < previous {
                report.warnings.push(format!(
                    "{id}: {resource} cost drops from {previous} at level {} to {next} at level {}",
                    i + 1,
                    i + 2
                ));
            }
        }
    }
}

/// Parse a RON catalog file and check it.
///
/// Duplicates are reported rather than silently replaced, so the file is
/// read as a plain list instead of through `BuildingCatalog`.
pub fn validate_catalog_file(path: &Path) -> Result<CatalogReport> {
    let contents = std::fs::read_to_string(path).map_err(|source| ClaimError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let templates: Vec<BuildingTemplate> =
        ron::from_str(&contents).map_err(|e| ClaimError::DataParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    Ok(validate_templates(&templates))
}
