//! Questionnaire catalog loading and validation.
//!
//! The catalog is the read-only scope -> principle -> criterion ->
//! indicator hierarchy every other component works against. Two on-disk
//! formats are supported: one CSV partition per scope (the default), and
//! the legacy single-file outline handled in [`outline`].

pub mod outline;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::CatalogConfig;
use crate::models::{Catalog, Criterion, Indicator, Principle, Scope};

/// Errors raised while loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog partition for scope '{scope}' not found: {path}")]
    MissingPartition { scope: String, path: String },

    #[error("Catalog file not found: {path}")]
    MissingFile { path: String },

    #[error("No catalog partitions configured")]
    NoPartitions,

    #[error("Catalog column '{column}' missing in {path}")]
    MissingColumn { path: String, column: String },

    #[error("Catalog row '{label}' has no {expected} context")]
    OrphanRow { label: String, expected: String },

    #[error("Duplicate indicator '{label}' (first under scope '{first}', again under '{second}')")]
    DuplicateIndicator {
        label: String,
        first: String,
        second: String,
    },

    #[error("Duplicate scope '{name}' in the catalog")]
    DuplicateScope { name: String },

    #[error("Catalog is empty: no indicators found")]
    Empty,

    #[error("Failed to read catalog file {path}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// On-disk catalog layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogFormat {
    /// One CSV file per scope, mapped explicitly in configuration.
    #[default]
    Partitioned,
    /// Single legacy outline file, first column only.
    Outline,
}

/// Resolved catalog-loading settings.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    /// Directory holding the catalog files.
    pub dir: PathBuf,
    pub format: CatalogFormat,
    /// File name of the outline, relative to `dir`.
    pub outline_file: String,
    /// Ordered scope name -> partition file name mapping.
    pub partitions: Vec<(String, String)>,
}

impl From<&CatalogConfig> for CatalogSettings {
    fn from(cfg: &CatalogConfig) -> Self {
        Self {
            dir: PathBuf::from(&cfg.dir),
            format: cfg.format,
            outline_file: cfg.outline_file.clone(),
            partitions: cfg
                .partitions
                .iter()
                .map(|p| (p.scope.clone(), p.file.clone()))
                .collect(),
        }
    }
}

/// Loads and validates the catalog under the given settings.
pub fn load(settings: &CatalogSettings) -> Result<Catalog, CatalogError> {
    let catalog = match settings.format {
        CatalogFormat::Partitioned => load_partitioned(settings)?,
        CatalogFormat::Outline => outline::parse_file(&settings.dir.join(&settings.outline_file))?,
    };
    validate(&catalog)?;
    info!(
        scopes = catalog.scopes.len(),
        indicators = catalog.indicator_count(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// Loads one partition file per configured scope, in mapping order.
///
/// Every configured partition must exist; a missing file is a hard error
/// naming the scope, never a silent skip.
fn load_partitioned(settings: &CatalogSettings) -> Result<Catalog, CatalogError> {
    if settings.partitions.is_empty() {
        return Err(CatalogError::NoPartitions);
    }

    let mut scopes = Vec::with_capacity(settings.partitions.len());
    for (scope_name, file) in &settings.partitions {
        let path = settings.dir.join(file);
        if !path.exists() {
            return Err(CatalogError::MissingPartition {
                scope: scope_name.clone(),
                path: path.display().to_string(),
            });
        }
        let scope = parse_partition(scope_name, &path)?;
        debug!(
            scope = %scope.name,
            indicators = scope.indicator_labels().len(),
            "catalog partition parsed"
        );
        scopes.push(scope);
    }

    Ok(Catalog { scopes })
}

/// Parses one scope partition with `Principle,Criterion,Indicator` columns.
///
/// Blank principle/criterion cells inherit the previous row's value, the
/// way the source spreadsheets leave group labels on their first row only.
fn parse_partition(scope_name: &str, path: &Path) -> Result<Scope, CatalogError> {
    let read_err = |source| CatalogError::Read {
        path: path.display().to_string(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(read_err)?;
    let headers = reader.headers().map_err(read_err)?.clone();
    let principle_col = require_column(&headers, "Principle", path)?;
    let criterion_col = require_column(&headers, "Criterion", path)?;
    let indicator_col = require_column(&headers, "Indicator", path)?;

    let mut scope = Scope {
        name: scope_name.to_string(),
        principles: Vec::new(),
    };
    let mut current_principle = String::new();
    let mut current_criterion = String::new();

    for record in reader.records() {
        let record = record.map_err(read_err)?;
        let principle_cell = record.get(principle_col).unwrap_or("").trim();
        let criterion_cell = record.get(criterion_col).unwrap_or("").trim();
        let indicator_cell = record.get(indicator_col).unwrap_or("").trim();

        if !principle_cell.is_empty() {
            current_principle = principle_cell.to_string();
        }
        if !criterion_cell.is_empty() {
            current_criterion = criterion_cell.to_string();
        }
        if indicator_cell.is_empty() {
            continue;
        }
        if current_principle.is_empty() {
            return Err(CatalogError::OrphanRow {
                label: indicator_cell.to_string(),
                expected: "principle".to_string(),
            });
        }
        if current_criterion.is_empty() {
            return Err(CatalogError::OrphanRow {
                label: indicator_cell.to_string(),
                expected: "criterion".to_string(),
            });
        }

        push_indicator(&mut scope, &current_principle, &current_criterion, indicator_cell);
    }

    Ok(scope)
}

fn require_column(
    headers: &csv::StringRecord,
    name: &str,
    path: &Path,
) -> Result<usize, CatalogError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| CatalogError::MissingColumn {
            path: path.display().to_string(),
            column: name.to_string(),
        })
}

/// Appends an indicator under its principle/criterion, creating the branch
/// on first sight.
fn push_indicator(scope: &mut Scope, principle: &str, criterion: &str, indicator: &str) {
    let principle = match scope.principles.iter_mut().find(|p| p.name == principle) {
        Some(p) => p,
        None => {
            scope.principles.push(Principle {
                name: principle.to_string(),
                criteria: Vec::new(),
            });
            scope.principles.last_mut().unwrap()
        }
    };
    let criterion = match principle.criteria.iter_mut().find(|c| c.name == criterion) {
        Some(c) => c,
        None => {
            principle.criteria.push(Criterion {
                name: criterion.to_string(),
                indicators: Vec::new(),
            });
            principle.criteria.last_mut().unwrap()
        }
    };
    criterion.indicators.push(Indicator::new(indicator));
}

/// Structural validation shared by both formats.
///
/// Rejects an indicator-free catalog, repeated scope names, and indicator
/// labels reused anywhere in the tree; label uniqueness is what keys the
/// response store's columns.
fn validate(catalog: &Catalog) -> Result<(), CatalogError> {
    if catalog.is_empty() {
        return Err(CatalogError::Empty);
    }

    let mut scope_names: BTreeMap<String, ()> = BTreeMap::new();
    for scope in &catalog.scopes {
        let key = scope.name.trim().to_lowercase();
        if scope_names.insert(key, ()).is_some() {
            return Err(CatalogError::DuplicateScope {
                name: scope.name.clone(),
            });
        }
    }

    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for scope in &catalog.scopes {
        for label in scope.indicator_labels() {
            if let Some(first) = seen.insert(label, scope.name.as_str()) {
                return Err(CatalogError::DuplicateIndicator {
                    label: label.to_string(),
                    first: first.to_string(),
                    second: scope.name.clone(),
                });
            }
        }
    }

    Ok(())
}
