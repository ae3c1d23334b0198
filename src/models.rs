//! Data models for the effectiveness scoring pipeline.
//!
//! This module contains all the core data structures used throughout
//! the application: scores, the indicator hierarchy, responses, and
//! the analysis report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single indicator score as entered by a respondent.
///
/// Parsing is total: `"0"` through `"3"` become values, the usual
/// not-applicable spellings become [`Score::NotApplicable`], and anything
/// else is coerced to [`Score::NotApplicable`] rather than failing the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// A valid score on the 0 (no effectiveness) to 3 (high) scale.
    Value(u8),
    /// Explicitly excluded from averaging.
    NotApplicable,
}

impl Score {
    /// Parse a raw cell value. Never fails; unknown input coerces to NA.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "0" => Score::Value(0),
            "1" => Score::Value(1),
            "2" => Score::Value(2),
            "3" => Score::Value(3),
            _ => Score::NotApplicable,
        }
    }

    /// Whether a raw cell value is one of the recognized spellings.
    ///
    /// Used at the submission boundary to warn about coerced garbage
    /// without rejecting the batch.
    pub fn is_recognized(raw: &str) -> bool {
        matches!(
            raw.trim().to_lowercase().as_str(),
            "0" | "1" | "2" | "3" | "" | "na" | "n/a" | "ns" | "not applicable"
        )
    }

    /// The numeric value, or `None` for NA.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Score::Value(v) => Some(f64::from(*v)),
            Score::NotApplicable => None,
        }
    }

    /// Whether this score participates in averaging.
    pub fn is_applicable(&self) -> bool {
        matches!(self, Score::Value(_))
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Value(v) => write!(f, "{}", v),
            Score::NotApplicable => write!(f, "NA"),
        }
    }
}

/// An atomic scored question.
///
/// The label carries a hierarchical numeric prefix (e.g. `"3.2 The council
/// meets regularly"`) and doubles as the indicator's identifier in the
/// response store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    /// Full indicator text, starting with the numeric prefix.
    pub label: String,
}

impl Indicator {
    /// Create an indicator from its label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Whether a cell looks like an indicator label: the text up to the
    /// first `.` must be all digits (`"3.2 ..."`, `"12.10 ..."`).
    pub fn has_numeric_prefix(text: &str) -> bool {
        let head = text.trim().split('.').next().unwrap_or("");
        !head.is_empty() && head.chars().all(|c| c.is_ascii_digit())
    }
}

/// A criterion grouping one or more indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub indicators: Vec<Indicator>,
}

/// A principle grouping one or more criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principle {
    pub name: String,
    pub criteria: Vec<Criterion>,
}

/// A top-level evaluation dimension (e.g. Governance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub name: String,
    pub principles: Vec<Principle>,
}

impl Scope {
    /// All indicator labels under this scope, in catalog order.
    pub fn indicator_labels(&self) -> Vec<&str> {
        self.principles
            .iter()
            .flat_map(|p| p.criteria.iter())
            .flat_map(|c| c.indicators.iter())
            .map(|i| i.label.as_str())
            .collect()
    }
}

/// The full questionnaire hierarchy, loaded once per invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub scopes: Vec<Scope>,
}

impl Catalog {
    /// All indicator labels across all scopes, in catalog order.
    ///
    /// This order defines the response store's column layout.
    pub fn indicator_labels(&self) -> Vec<&str> {
        self.scopes
            .iter()
            .flat_map(|s| s.indicator_labels())
            .collect()
    }

    /// Total number of indicators.
    pub fn indicator_count(&self) -> usize {
        self.indicator_labels().len()
    }

    /// Whether the catalog holds no indicators at all.
    pub fn is_empty(&self) -> bool {
        self.indicator_count() == 0
    }

    /// Look up a scope by its exact name.
    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.iter().find(|s| s.name == name)
    }
}

/// One respondent submission: identity fields plus one score per indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Respondent name. Required; also the grouping key for the
    /// per-respondent significance sample.
    pub respondent: String,
    /// Email or phone. Optional free text.
    pub contact: String,
    /// The mosaic (site/network) this respondent represents. Required.
    pub mosaic: String,
    /// When the submission was recorded.
    pub submitted_at: DateTime<Utc>,
    /// Indicator label -> score. Indicators absent from the map read as NA.
    pub scores: BTreeMap<String, Score>,
}

impl Response {
    /// The score for an indicator, NA when the indicator was never answered.
    pub fn score(&self, indicator: &str) -> Score {
        self.scores
            .get(indicator)
            .copied()
            .unwrap_or(Score::NotApplicable)
    }

    /// Number of indicators with an applicable (non-NA) score.
    pub fn answered_count(&self) -> usize {
        self.scores.values().filter(|s| s.is_applicable()).count()
    }
}

/// Effectiveness classification of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectivenessStatus {
    /// Mean at or above the threshold with a significant test result.
    Effective,
    /// Mean at or above the threshold but the sample is too small or the
    /// test is not significant.
    Uncertain,
    /// Mean below the threshold.
    Low,
}

impl fmt::Display for EffectivenessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectivenessStatus::Effective => write!(f, "Effective"),
            EffectivenessStatus::Uncertain => write!(f, "Uncertain (low sample)"),
            EffectivenessStatus::Low => write!(f, "Low"),
        }
    }
}

impl EffectivenessStatus {
    /// Returns an emoji representation of the status.
    pub fn emoji(&self) -> &'static str {
        match self {
            EffectivenessStatus::Effective => "🟢",
            EffectivenessStatus::Uncertain => "🟡",
            EffectivenessStatus::Low => "🔴",
        }
    }
}

/// Which tail of the t distribution the significance test uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tail {
    /// One-sided: H1 is "population mean above the threshold".
    Greater,
    /// Two-sided: H1 is "population mean differs from the threshold".
    TwoSided,
}

impl fmt::Display for Tail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tail::Greater => write!(f, "greater"),
            Tail::TwoSided => write!(f, "two-sided"),
        }
    }
}

/// How the per-scope significance sample is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleMode {
    /// One sample point per respondent: the mean of that respondent's
    /// non-NA scores within the scope. Keeps sample points independent.
    RespondentMeans,
    /// Every raw non-NA score in the scope is one sample point.
    PooledScores,
}

impl fmt::Display for SampleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleMode::RespondentMeans => write!(f, "respondent-means"),
            SampleMode::PooledScores => write!(f, "pooled-scores"),
        }
    }
}

/// Per-scope significance evaluation, one row of the effectiveness table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeEvaluation {
    pub scope: String,
    /// Mean of the significance sample.
    pub mean: f64,
    /// Number of sample points the test saw.
    pub sample_size: usize,
    /// t statistic; absent when the sample was too small or degenerate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t_statistic: Option<f64>,
    /// One- or two-tailed p-value; absent when the sample was too small.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
    pub status: EffectivenessStatus,
}

/// Mean of one indicator across responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorMean {
    pub label: String,
    /// `None` when every score for this indicator was NA.
    pub mean: Option<f64>,
    /// Number of non-NA scores behind the mean.
    pub samples: usize,
}

/// Criterion-level rollup: mean of its defined indicator means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionMeans {
    pub name: String,
    pub mean: Option<f64>,
    pub indicators: Vec<IndicatorMean>,
}

/// Principle-level rollup: mean of its defined criterion means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipleMeans {
    pub name: String,
    pub mean: Option<f64>,
    pub criteria: Vec<CriterionMeans>,
}

/// Scope-level rollup: mean of its defined principle means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeMeans {
    pub name: String,
    pub mean: Option<f64>,
    pub principles: Vec<PrincipleMeans>,
}

/// Descriptive statistics for one indicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorStats {
    pub label: String,
    /// Number of non-NA scores.
    pub count: usize,
    pub mean: Option<f64>,
    /// Unbiased standard deviation (n-1); `None` below two samples.
    pub std_dev: Option<f64>,
}

/// One roster line in the report's respondent listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondentSummary {
    pub name: String,
    pub mosaic: String,
    pub submitted_at: DateTime<Utc>,
    /// Indicators answered with a non-NA score.
    pub answered: usize,
}

/// A prewritten remediation entry keyed by scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub scope: String,
    /// Optional finer-grained problem label within the scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    pub suggestion: String,
}

/// Remediation advice for one underperforming scope.
///
/// An empty `entries` list still produces a report row, rendered with the
/// "no recommendation available" sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeAdvice {
    pub scope: String,
    pub mean: f64,
    pub entries: Vec<RecommendationEntry>,
}

/// Metadata about an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Mosaic filter applied, `None` for all responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mosaic: Option<String>,
    /// Date and time of the analysis.
    pub generated_at: DateTime<Utc>,
    /// Name of the scoring profile used.
    pub profile: String,
    pub threshold: f64,
    pub tail: Tail,
    pub alpha: f64,
    pub sample_mode: SampleMode,
    /// Submissions included in the analysis.
    pub responses: usize,
    /// Distinct respondent names behind those submissions.
    pub respondents: usize,
    /// Indicators in the catalog.
    pub indicators: usize,
}

/// The complete analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    /// Effectiveness-by-scope table.
    pub evaluations: Vec<ScopeEvaluation>,
    /// Scope -> principle -> criterion mean rollup.
    pub hierarchy: Vec<ScopeMeans>,
    /// Per-indicator descriptive statistics.
    pub indicator_stats: Vec<IndicatorStats>,
    /// Respondent roster.
    pub respondents: Vec<RespondentSummary>,
    /// Remediation advice for scopes below the threshold.
    pub advice: Vec<ScopeAdvice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Catalog {
        Catalog {
            scopes: vec![Scope {
                name: "Governance".to_string(),
                principles: vec![Principle {
                    name: "Participation".to_string(),
                    criteria: vec![Criterion {
                        name: "Council".to_string(),
                        indicators: vec![
                            Indicator::new("1.1 Council exists"),
                            Indicator::new("1.2 Council meets regularly"),
                        ],
                    }],
                }],
            }],
        }
    }

    #[test]
    fn test_score_parse_values() {
        assert_eq!(Score::parse("0"), Score::Value(0));
        assert_eq!(Score::parse("3"), Score::Value(3));
        assert_eq!(Score::parse(" 2 "), Score::Value(2));
    }

    #[test]
    fn test_score_parse_coerces_garbage_to_na() {
        assert_eq!(Score::parse("NA"), Score::NotApplicable);
        assert_eq!(Score::parse("NS"), Score::NotApplicable);
        assert_eq!(Score::parse(""), Score::NotApplicable);
        assert_eq!(Score::parse("4"), Score::NotApplicable);
        assert_eq!(Score::parse("yes"), Score::NotApplicable);
        assert_eq!(Score::parse("2.5"), Score::NotApplicable);
    }

    #[test]
    fn test_score_recognized() {
        assert!(Score::is_recognized("2"));
        assert!(Score::is_recognized("na"));
        assert!(Score::is_recognized("N/A"));
        assert!(Score::is_recognized(""));
        assert!(!Score::is_recognized("4"));
        assert!(!Score::is_recognized("maybe"));
    }

    #[test]
    fn test_score_numeric() {
        assert_eq!(Score::Value(3).numeric(), Some(3.0));
        assert_eq!(Score::NotApplicable.numeric(), None);
    }

    #[test]
    fn test_score_display_round_trips() {
        for raw in ["0", "1", "2", "3", "NA"] {
            assert_eq!(Score::parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_indicator_numeric_prefix() {
        assert!(Indicator::has_numeric_prefix("3.2 Council meets"));
        assert!(Indicator::has_numeric_prefix("12.10 Budget executed"));
        assert!(Indicator::has_numeric_prefix("7"));
        assert!(!Indicator::has_numeric_prefix("Principle 1"));
        assert!(!Indicator::has_numeric_prefix("3 no dot prefix"));
        assert!(!Indicator::has_numeric_prefix(""));
    }

    #[test]
    fn test_catalog_indicator_labels_in_order() {
        let catalog = sample_catalog();
        assert_eq!(
            catalog.indicator_labels(),
            vec!["1.1 Council exists", "1.2 Council meets regularly"]
        );
        assert_eq!(catalog.indicator_count(), 2);
        assert!(!catalog.is_empty());
    }

    #[test]
    fn test_catalog_scope_lookup() {
        let catalog = sample_catalog();
        assert!(catalog.scope("Governance").is_some());
        assert!(catalog.scope("governance").is_none());
        assert!(catalog.scope("Biodiversity").is_none());
    }

    #[test]
    fn test_response_score_defaults_to_na() {
        let response = Response {
            respondent: "Ana".to_string(),
            contact: String::new(),
            mosaic: "Central Coast".to_string(),
            submitted_at: Utc::now(),
            scores: [("1.1 Council exists".to_string(), Score::Value(2))]
                .into_iter()
                .collect(),
        };

        assert_eq!(response.score("1.1 Council exists"), Score::Value(2));
        assert_eq!(response.score("9.9 Unknown"), Score::NotApplicable);
        assert_eq!(response.answered_count(), 1);
    }

    #[test]
    fn test_status_display_and_emoji() {
        assert_eq!(EffectivenessStatus::Effective.to_string(), "Effective");
        assert_eq!(
            EffectivenessStatus::Uncertain.to_string(),
            "Uncertain (low sample)"
        );
        assert_eq!(EffectivenessStatus::Low.emoji(), "🔴");
        assert_eq!(EffectivenessStatus::Effective.emoji(), "🟢");
    }

    #[test]
    fn test_tail_and_sample_mode_display() {
        assert_eq!(Tail::Greater.to_string(), "greater");
        assert_eq!(Tail::TwoSided.to_string(), "two-sided");
        assert_eq!(SampleMode::RespondentMeans.to_string(), "respondent-means");
        assert_eq!(SampleMode::PooledScores.to_string(), "pooled-scores");
    }
}
