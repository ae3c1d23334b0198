//! Legacy single-file catalog outline.
//!
//! The outline format predates the per-scope partitions: one CSV where
//! only the first column matters. Marker rows (`SCOPE`, `PRINCIPLE`,
//! `CRITERION`, case-insensitive, optional colon) open a new hierarchy
//! level and the numbered rows below them are indicators. The parser folds
//! rows into the tree with plain local state; a numbered row arriving
//! before its context markers is a hard error.

use std::path::Path;

use tracing::{debug, warn};

use crate::catalog::CatalogError;
use crate::models::{Catalog, Criterion, Indicator, Principle, Scope};

const SCOPE_MARKER: &str = "SCOPE";
const PRINCIPLE_MARKER: &str = "PRINCIPLE";
const CRITERION_MARKER: &str = "CRITERION";

/// Parses a legacy outline file into a catalog.
pub fn parse_file(path: &Path) -> Result<Catalog, CatalogError> {
    if !path.exists() {
        return Err(CatalogError::MissingFile {
            path: path.display().to_string(),
        });
    }

    let read_err = |source| CatalogError::Read {
        path: path.display().to_string(),
        source,
    };

    // Outline sheets have no header row and ragged column counts.
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(read_err)?;

    let mut scopes: Vec<Scope> = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(read_err)?;
        let cell = record.get(0).unwrap_or("").trim();
        if cell.is_empty() {
            continue;
        }
        let row = index + 1;

        if let Some(name) = marker_value(cell, SCOPE_MARKER) {
            if name.is_empty() {
                warn!(row, "scope marker without a name ignored");
                continue;
            }
            scopes.push(Scope {
                name,
                principles: Vec::new(),
            });
        } else if let Some(name) = marker_value(cell, PRINCIPLE_MARKER) {
            if name.is_empty() {
                warn!(row, "principle marker without a name ignored");
                continue;
            }
            let scope = scopes.last_mut().ok_or_else(|| orphan(cell, "scope"))?;
            scope.principles.push(Principle {
                name,
                criteria: Vec::new(),
            });
        } else if let Some(name) = marker_value(cell, CRITERION_MARKER) {
            if name.is_empty() {
                warn!(row, "criterion marker without a name ignored");
                continue;
            }
            let scope = scopes.last_mut().ok_or_else(|| orphan(cell, "scope"))?;
            let principle = scope
                .principles
                .last_mut()
                .ok_or_else(|| orphan(cell, "principle"))?;
            principle.criteria.push(Criterion {
                name,
                indicators: Vec::new(),
            });
        } else if Indicator::has_numeric_prefix(cell) {
            let criterion = open_criterion(&mut scopes, cell)?;
            criterion.indicators.push(Indicator::new(cell));
        } else {
            // Legacy sheets carry stray note rows between sections.
            debug!(row, cell, "unrecognized outline row skipped");
        }
    }

    Ok(Catalog { scopes })
}

/// The criterion the next indicator row belongs to, or the orphan error
/// naming the innermost missing marker.
fn open_criterion<'a>(
    scopes: &'a mut [Scope],
    label: &str,
) -> Result<&'a mut Criterion, CatalogError> {
    let scope = scopes.last_mut().ok_or_else(|| orphan(label, "scope"))?;
    let principle = scope
        .principles
        .last_mut()
        .ok_or_else(|| orphan(label, "principle"))?;
    principle
        .criteria
        .last_mut()
        .ok_or_else(|| orphan(label, "criterion"))
}

fn orphan(label: &str, expected: &str) -> CatalogError {
    CatalogError::OrphanRow {
        label: label.to_string(),
        expected: expected.to_string(),
    }
}

/// Extracts the name from a marker cell such as `"SCOPE: Governance"`.
///
/// The marker word matches case-insensitively and must be followed by a
/// colon, whitespace, or end of cell, so `"Scopes of work"` is not a
/// marker. Returns the trimmed remainder, which may be empty.
fn marker_value(cell: &str, marker: &str) -> Option<String> {
    let mut rest_start = 0;
    let mut chars = cell.char_indices();
    for expected in marker.chars() {
        let (i, c) = chars.next()?;
        if !c.eq_ignore_ascii_case(&expected) {
            return None;
        }
        rest_start = i + c.len_utf8();
    }

    let rest = &cell[rest_start..];
    match rest.chars().next() {
        None => Some(String::new()),
        Some(c) if c == ':' || c.is_whitespace() => {
            Some(rest.trim_start_matches(':').trim().to_string())
        }
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(body: &str) -> Result<Catalog, CatalogError> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("indicators.csv");
        fs::write(&path, body).unwrap();
        parse_file(&path)
    }

    #[test]
    fn test_parse_outline_shape() {
        let catalog = parse(
            "SCOPE: Governance\n\
             PRINCIPLE: Legitimacy\n\
             CRITERION: Representation\n\
             1. Council exists,notes,more\n\
             1.2 Council meets regularly\n\
             CRITERION: Accountability\n\
             2. Reports published\n\
             SCOPE: Management\n\
             PRINCIPLE: Capacity\n\
             CRITERION: Staffing\n\
             3. Staff assigned\n",
        )
        .unwrap();

        assert_eq!(catalog.scopes.len(), 2);
        let governance = &catalog.scopes[0];
        assert_eq!(governance.name, "Governance");
        assert_eq!(governance.principles.len(), 1);
        assert_eq!(governance.principles[0].criteria.len(), 2);
        // Only the first column of an indicator row is read.
        assert_eq!(
            governance.principles[0].criteria[0]
                .indicators
                .iter()
                .map(|i| i.label.as_str())
                .collect::<Vec<_>>(),
            vec!["1. Council exists", "1.2 Council meets regularly"]
        );
        assert_eq!(catalog.scopes[1].indicator_labels(), vec!["3. Staff assigned"]);
    }

    #[test]
    fn test_markers_case_insensitive_colon_optional() {
        let catalog = parse(
            "scope Governance\n\
             Principle: Legitimacy\n\
             criterion Representation\n\
             1. Council exists\n",
        )
        .unwrap();

        assert_eq!(catalog.scopes[0].name, "Governance");
        assert_eq!(catalog.indicator_count(), 1);
    }

    #[test]
    fn test_indicator_before_any_marker() {
        let err = parse("1. Council exists\n").unwrap_err();
        match err {
            CatalogError::OrphanRow { label, expected } => {
                assert_eq!(label, "1. Council exists");
                assert_eq!(expected, "scope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_indicator_before_criterion() {
        let err = parse(
            "SCOPE: Governance\n\
             PRINCIPLE: Legitimacy\n\
             1. Council exists\n",
        )
        .unwrap_err();
        match err {
            CatalogError::OrphanRow { expected, .. } => assert_eq!(expected, "criterion"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_criterion_before_principle() {
        let err = parse(
            "SCOPE: Governance\n\
             CRITERION: Representation\n",
        )
        .unwrap_err();
        match err {
            CatalogError::OrphanRow { expected, .. } => assert_eq!(expected, "principle"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unnamed_marker_ignored() {
        // The empty CRITERION marker is dropped; the indicator lands under
        // the still-open previous criterion.
        let catalog = parse(
            "SCOPE: Governance\n\
             PRINCIPLE: Legitimacy\n\
             CRITERION: Representation\n\
             1. Council exists\n\
             CRITERION:\n\
             2. Reports published\n",
        )
        .unwrap();

        let criteria = &catalog.scopes[0].principles[0].criteria;
        assert_eq!(criteria.len(), 1);
        assert_eq!(criteria[0].indicators.len(), 2);
    }

    #[test]
    fn test_stray_rows_skipped() {
        let catalog = parse(
            "Effectiveness questionnaire v2\n\
             SCOPE: Governance\n\
             PRINCIPLE: Legitimacy\n\
             CRITERION: Representation\n\
             see notes below\n\
             1. Council exists\n",
        )
        .unwrap();

        assert_eq!(catalog.indicator_count(), 1);
    }

    #[test]
    fn test_marker_prefix_words_are_not_markers() {
        // "Scopes of work" must not open a scope.
        let err = parse(
            "Scopes of work\n\
             1. Council exists\n",
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::OrphanRow { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = parse_file(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, CatalogError::MissingFile { .. }));
    }
}
