//! Remediation recommendations for underperforming scopes.
//!
//! Recommendations live in a flat CSV (`Scope,Problem,Suggestion`) and are
//! matched to low scopes by exact normalized scope label. The file is
//! optional: without it every low scope still shows up in the report,
//! carrying the sentinel text instead of advice.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::{EffectivenessStatus, RecommendationEntry, ScopeAdvice, ScopeEvaluation};

/// Text shown for a low scope with no matching recommendation entry.
pub const NO_RECOMMENDATION: &str = "No recommendation available";

/// Raw CSV row shape.
#[derive(Debug, Deserialize)]
struct RecommendationRow {
    #[serde(rename = "Scope")]
    scope: String,
    #[serde(rename = "Problem", default)]
    problem: Option<String>,
    #[serde(rename = "Suggestion", default)]
    suggestion: String,
}

/// All recommendation entries, in file order.
#[derive(Debug, Clone, Default)]
pub struct RecommendationSet {
    entries: Vec<RecommendationEntry>,
}

impl RecommendationSet {
    /// A set with no entries, used when the file is absent.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the recommendations file.
    ///
    /// Returns `Ok(None)` when the file does not exist so the caller can
    /// degrade with a warning instead of failing the run. Rows without a
    /// scope or a suggestion are skipped.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open recommendations file: {}", path.display()))?;

        let mut entries = Vec::new();
        for (index, row) in reader.deserialize::<RecommendationRow>().enumerate() {
            let row = row.with_context(|| {
                format!("Failed to parse recommendations file: {}", path.display())
            })?;
            let scope = row.scope.trim();
            let suggestion = row.suggestion.trim();
            if scope.is_empty() || suggestion.is_empty() {
                warn!(row = index + 2, "recommendation row without scope or suggestion skipped");
                continue;
            }
            entries.push(RecommendationEntry {
                scope: scope.to_string(),
                problem: row
                    .problem
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
                suggestion: suggestion.to_string(),
            });
        }

        debug!(count = entries.len(), path = %path.display(), "recommendations loaded");
        Ok(Some(Self { entries }))
    }

    /// Entries for one scope, matched on the trimmed, case-insensitive
    /// label; no fuzzy matching.
    pub fn for_scope(&self, scope: &str) -> Vec<&RecommendationEntry> {
        let wanted = normalize(scope);
        self.entries
            .iter()
            .filter(|e| normalize(&e.scope) == wanted)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Builds the advice list: one entry per scope classified low, in
/// evaluation order. A low scope with no matching recommendations keeps an
/// empty entry list; the report renders it with [`NO_RECOMMENDATION`].
pub fn advise(
    evaluations: &[ScopeEvaluation],
    recommendations: &RecommendationSet,
) -> Vec<ScopeAdvice> {
    evaluations
        .iter()
        .filter(|e| e.status == EffectivenessStatus::Low)
        .map(|e| ScopeAdvice {
            scope: e.scope.clone(),
            mean: e.mean,
            entries: recommendations
                .for_scope(&e.scope)
                .into_iter()
                .cloned()
                .collect(),
        })
        .collect()
}
