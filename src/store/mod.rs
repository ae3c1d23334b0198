//! Append-only CSV response store.
//!
//! One row per submission: the fixed identity columns followed by one
//! column per catalog indicator holding the raw score text. The header is
//! written on first append and checked against the catalog on every later
//! one; rows are never rewritten.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Catalog, Response, Score};

/// Identity columns preceding the per-indicator columns.
pub const META_COLUMNS: [&str; 4] = ["Name", "Contact", "Mosaic", "Timestamp"];

/// Fallback format for timestamps written by the old spreadsheet exports.
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Errors raised at the store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Submission is missing required field '{field}'")]
    MissingIdentity { field: &'static str },

    #[error("Store header in {path} does not match the catalog: {detail}")]
    HeaderMismatch { path: String, detail: String },

    #[error("Store column '{column}' missing in {path}")]
    MissingColumn { path: String, column: String },

    #[error("Failed to read store file {path}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write store file {path}")]
    Write {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to open store file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Handle on the response CSV file.
#[derive(Debug, Clone)]
pub struct ResponseStore {
    path: PathBuf,
}

impl ResponseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Appends one response.
    ///
    /// Creates the file with its header on first write; afterwards the
    /// existing header must match the catalog's column layout exactly.
    /// Submissions without a respondent name or mosaic are rejected before
    /// anything touches the file.
    pub fn append(&self, response: &Response, catalog: &Catalog) -> Result<(), StoreError> {
        if response.respondent.trim().is_empty() {
            return Err(StoreError::MissingIdentity { field: "name" });
        }
        if response.mosaic.trim().is_empty() {
            return Err(StoreError::MissingIdentity { field: "mosaic" });
        }

        let labels = catalog.indicator_labels();
        let mut row: Vec<String> = Vec::with_capacity(META_COLUMNS.len() + labels.len());
        row.push(response.respondent.clone());
        row.push(response.contact.clone());
        row.push(response.mosaic.clone());
        row.push(response.submitted_at.to_rfc3339());
        for label in &labels {
            row.push(response.score(label).to_string());
        }

        let write_err = |source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        };
        let io_err = |source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if self.path.exists() {
            self.check_header(&labels)?;
            let file = OpenOptions::new()
                .append(true)
                .open(&self.path)
                .map_err(io_err)?;
            let mut writer = csv::Writer::from_writer(file);
            writer.write_record(&row).map_err(write_err)?;
            writer.flush().map_err(io_err)?;
        } else {
            let mut writer = csv::Writer::from_path(&self.path).map_err(write_err)?;
            let header: Vec<&str> = META_COLUMNS.iter().copied().chain(labels).collect();
            writer.write_record(&header).map_err(write_err)?;
            writer.write_record(&row).map_err(write_err)?;
            writer.flush().map_err(io_err)?;
        }

        debug!(
            respondent = %response.respondent,
            mosaic = %response.mosaic,
            path = %self.path.display(),
            "response appended"
        );
        Ok(())
    }

    /// Loads every stored response in append order.
    ///
    /// A store file that does not exist yet is simply empty. Score cells
    /// are parsed with the total [`Score::parse`], so malformed values
    /// come back as NA instead of failing the batch.
    pub fn load(&self) -> Result<Vec<Response>, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "store file absent, no responses");
            return Ok(Vec::new());
        }

        let read_err = |source| StoreError::Read {
            path: self.path.display().to_string(),
            source,
        };

        let mut reader = csv::Reader::from_path(&self.path).map_err(read_err)?;
        let headers = reader.headers().map_err(read_err)?.clone();
        let name_col = self.require_column(&headers, "Name")?;
        let contact_col = self.require_column(&headers, "Contact")?;
        let mosaic_col = self.require_column(&headers, "Mosaic")?;
        let timestamp_col = self.require_column(&headers, "Timestamp")?;

        // Every non-identity column is a score column keyed by its header.
        let score_columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                *i != name_col && *i != contact_col && *i != mosaic_col && *i != timestamp_col
            })
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        let mut responses = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_err)?;
            let scores = score_columns
                .iter()
                .map(|(i, label)| {
                    let raw = record.get(*i).unwrap_or("");
                    (label.clone(), Score::parse(raw))
                })
                .collect();

            responses.push(Response {
                respondent: record.get(name_col).unwrap_or("").to_string(),
                contact: record.get(contact_col).unwrap_or("").to_string(),
                mosaic: record.get(mosaic_col).unwrap_or("").to_string(),
                submitted_at: parse_timestamp(record.get(timestamp_col).unwrap_or("")),
                scores,
            });
        }

        debug!(
            count = responses.len(),
            path = %self.path.display(),
            "responses loaded"
        );
        Ok(responses)
    }

    /// Verifies an existing store's header against the catalog layout.
    ///
    /// A store that has not been created yet passes trivially.
    pub fn verify_header(&self, catalog: &Catalog) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.check_header(&catalog.indicator_labels())
    }

    fn check_header(&self, labels: &[&str]) -> Result<(), StoreError> {
        let read_err = |source| StoreError::Read {
            path: self.path.display().to_string(),
            source,
        };
        let mut reader = csv::Reader::from_path(&self.path).map_err(read_err)?;
        let headers = reader.headers().map_err(read_err)?;

        let expected: Vec<&str> = META_COLUMNS.iter().copied().chain(labels.iter().copied()).collect();
        let actual: Vec<&str> = headers.iter().collect();
        if let Some(detail) = header_mismatch(&expected, &actual) {
            return Err(StoreError::HeaderMismatch {
                path: self.path.display().to_string(),
                detail,
            });
        }
        Ok(())
    }

    fn require_column(
        &self,
        headers: &csv::StringRecord,
        name: &str,
    ) -> Result<usize, StoreError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| StoreError::MissingColumn {
                path: self.path.display().to_string(),
                column: name.to_string(),
            })
    }
}

/// Human-readable description of the first header difference, if any.
fn header_mismatch(expected: &[&str], actual: &[&str]) -> Option<String> {
    if expected.len() != actual.len() {
        return Some(format!(
            "expected {} columns, found {}",
            expected.len(),
            actual.len()
        ));
    }
    for (i, (e, a)) in expected.iter().zip(actual).enumerate() {
        if e != a {
            return Some(format!("column {} is '{a}', expected '{e}'", i + 1));
        }
    }
    None
}

/// Parses a stored timestamp, accepting RFC 3339 and the legacy naive
/// format; anything else falls back to the epoch with a warning so one bad
/// row never sinks a reload.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT) {
        return naive.and_utc();
    }
    warn!(raw, "unparseable timestamp, falling back to epoch");
    DateTime::<Utc>::UNIX_EPOCH
}
