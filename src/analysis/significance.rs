//! Scope-level significance evaluation.
//!
//! Runs a one-sample t-test of each scope's score sample against the
//! profile threshold and classifies the scope as effective, uncertain, or
//! low. The sample itself comes from the aggregator, either one mean per
//! respondent or the pooled raw scores, depending on the active profile.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::analysis::{aggregator, stats};
use crate::config::ScoringProfile;
use crate::models::{Catalog, EffectivenessStatus, Response, SampleMode, Scope, ScopeEvaluation, Tail};

/// Resolved evaluation settings for one report run.
#[derive(Debug, Clone, Copy)]
pub struct EvalSettings {
    /// Effectiveness threshold the sample mean is tested against.
    pub threshold: f64,
    /// Which tail of the t distribution the p-value covers.
    pub tail: Tail,
    /// Significance level below which the threshold is considered met.
    pub alpha: f64,
    /// How the per-scope sample is assembled.
    pub sample: SampleMode,
}

impl From<&ScoringProfile> for EvalSettings {
    fn from(profile: &ScoringProfile) -> Self {
        Self {
            threshold: profile.threshold,
            tail: profile.tail,
            alpha: profile.alpha,
            sample: profile.sample,
        }
    }
}

/// Outcome of a one-sample t-test.
///
/// `t_statistic` is `None` when the statistic is undefined, which happens
/// for a zero-variance sample; the p-value is still assigned by the
/// degenerate-case rules below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    pub t_statistic: Option<f64>,
    pub p_value: f64,
}

/// One-sample t-test of `sample` against `threshold`.
///
/// Returns `None` for samples with fewer than two observations, where no
/// degrees of freedom remain. A zero-variance sample sitting exactly on
/// the threshold yields p = 1.0 (no evidence of deviation); one away from
/// the threshold yields the limit p-value for the requested tail.
pub fn one_sample_t_test(sample: &[f64], threshold: f64, tail: Tail) -> Option<TTest> {
    if sample.len() < 2 {
        return None;
    }
    let n = sample.len() as f64;
    let m = stats::mean(sample)?;
    let sd = stats::sample_std_dev(sample)?;
    let diff = m - threshold;

    if sd == 0.0 {
        let p_value = if diff == 0.0 {
            1.0
        } else {
            match tail {
                Tail::Greater => {
                    if diff > 0.0 {
                        0.0
                    } else {
                        1.0
                    }
                }
                Tail::TwoSided => 0.0,
            }
        };
        return Some(TTest {
            t_statistic: None,
            p_value,
        });
    }

    let t = diff / (sd / n.sqrt());
    let df = n - 1.0;
    let p_value = match tail {
        Tail::Greater => 1.0 - stats::student_t_cdf(t, df),
        Tail::TwoSided => 2.0 * (1.0 - stats::student_t_cdf(t.abs(), df)),
    };

    Some(TTest {
        t_statistic: Some(t),
        p_value,
    })
}

/// Classification policy for one scope.
///
/// A mean below the threshold is low no matter what the test says. At or
/// above the threshold, the scope is effective only when the test ran and
/// came back significant; otherwise the evidence is insufficient and the
/// scope stays uncertain.
pub fn classify(mean: f64, p_value: Option<f64>, settings: &EvalSettings) -> EffectivenessStatus {
    if mean < settings.threshold {
        return EffectivenessStatus::Low;
    }
    match p_value {
        Some(p) if p < settings.alpha => EffectivenessStatus::Effective,
        _ => EffectivenessStatus::Uncertain,
    }
}

/// Evaluates a single scope from its score sample.
///
/// Returns `None` for an empty sample; callers decide how to surface the
/// missing scope.
pub fn evaluate_scope(
    scope_name: &str,
    sample: &[f64],
    settings: &EvalSettings,
) -> Option<ScopeEvaluation> {
    let mean = stats::mean(sample)?;
    let test = one_sample_t_test(sample, settings.threshold, settings.tail);
    let p_value = test.as_ref().map(|t| t.p_value);
    let status = classify(mean, p_value, settings);

    debug!(
        scope = scope_name,
        mean,
        n = sample.len(),
        p = ?p_value,
        status = %status,
        "scope evaluated"
    );

    Some(ScopeEvaluation {
        scope: scope_name.to_string(),
        mean,
        sample_size: sample.len(),
        t_statistic: test.as_ref().and_then(|t| t.t_statistic),
        p_value,
        status,
    })
}

/// Evaluates every scope of the catalog, in catalog order.
///
/// Scopes with no applicable scores in `responses` are skipped with a
/// warning rather than reported at an artificial zero.
pub fn evaluate_scopes(
    catalog: &Catalog,
    responses: &[Response],
    settings: &EvalSettings,
) -> Vec<ScopeEvaluation> {
    let mut evaluations = Vec::with_capacity(catalog.scopes.len());
    for scope in &catalog.scopes {
        let sample = scope_sample(scope, responses, settings.sample);
        match evaluate_scope(&scope.name, &sample, settings) {
            Some(eval) => evaluations.push(eval),
            None => warn!(scope = %scope.name, "no applicable scores, scope skipped"),
        }
    }
    evaluations
}

/// Assembles the score sample for one scope under the given mode.
fn scope_sample(scope: &Scope, responses: &[Response], mode: SampleMode) -> Vec<f64> {
    match mode {
        SampleMode::RespondentMeans => {
            let means: BTreeMap<String, f64> =
                aggregator::respondent_scope_means(scope, responses);
            means.into_values().collect()
        }
        SampleMode::PooledScores => aggregator::pooled_scope_scores(scope, responses),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Criterion, Indicator, Principle, Score};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn settings(threshold: f64, tail: Tail, sample: SampleMode) -> EvalSettings {
        EvalSettings {
            threshold,
            tail,
            alpha: 0.05,
            sample,
        }
    }

    fn standard() -> EvalSettings {
        settings(2.0, Tail::Greater, SampleMode::RespondentMeans)
    }

    fn scope_with_indicators(name: &str, labels: &[&str]) -> Scope {
        Scope {
            name: name.to_string(),
            principles: vec![Principle {
                name: format!("{name} principle"),
                criteria: vec![Criterion {
                    name: format!("{name} criterion"),
                    indicators: labels.iter().map(|l| Indicator::new(*l)).collect(),
                }],
            }],
        }
    }

    fn response(name: &str, scores: &[(&str, &str)]) -> Response {
        Response {
            respondent: name.to_string(),
            contact: String::new(),
            mosaic: "Test Mosaic".to_string(),
            submitted_at: Utc::now(),
            scores: scores
                .iter()
                .map(|(label, raw)| (label.to_string(), Score::parse(raw)))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_t_test_requires_two_samples() {
        assert!(one_sample_t_test(&[], 2.0, Tail::Greater).is_none());
        assert!(one_sample_t_test(&[2.5], 2.0, Tail::Greater).is_none());
    }

    #[test]
    fn test_t_test_basic_greater() {
        // mean 2.75, sd 0.5, t = 3.0 at df = 3.
        let test = one_sample_t_test(&[3.0, 2.0, 3.0, 3.0], 2.0, Tail::Greater).unwrap();
        assert!((test.t_statistic.unwrap() - 3.0).abs() < 1e-12);
        assert!((test.p_value - 0.028834).abs() < 1e-4);
    }

    #[test]
    fn test_t_test_mean_on_threshold() {
        // mean exactly 2.0: t = 0, one-sided p = 0.5.
        let test = one_sample_t_test(&[3.0, 1.0, 3.0, 1.0], 2.0, Tail::Greater).unwrap();
        assert_eq!(test.t_statistic, Some(0.0));
        assert!((test.p_value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_t_test_constant_sample_on_threshold() {
        let test = one_sample_t_test(&[2.0, 2.0, 2.0, 2.0], 2.0, Tail::Greater).unwrap();
        assert_eq!(test.t_statistic, None);
        assert_eq!(test.p_value, 1.0);
    }

    #[test]
    fn test_t_test_constant_sample_above_threshold() {
        let test = one_sample_t_test(&[3.0, 3.0, 3.0, 3.0], 2.0, Tail::Greater).unwrap();
        assert_eq!(test.t_statistic, None);
        assert_eq!(test.p_value, 0.0);
    }

    #[test]
    fn test_t_test_constant_sample_below_threshold_greater() {
        // Every score below the threshold: no support for "greater".
        let test = one_sample_t_test(&[1.0, 1.0, 1.0], 2.0, Tail::Greater).unwrap();
        assert_eq!(test.t_statistic, None);
        assert_eq!(test.p_value, 1.0);
    }

    #[test]
    fn test_t_test_constant_sample_two_sided() {
        let test = one_sample_t_test(&[1.0, 1.0, 1.0], 1.5, Tail::TwoSided).unwrap();
        assert_eq!(test.t_statistic, None);
        assert_eq!(test.p_value, 0.0);
    }

    #[test]
    fn test_t_test_two_sided_doubles_tail() {
        // t = 3.0 at df = 3: two-sided p is twice the one-sided tail.
        let test = one_sample_t_test(&[2.0, 2.0, 2.0, 3.0], 1.5, Tail::TwoSided).unwrap();
        assert!((test.t_statistic.unwrap() - 3.0).abs() < 1e-12);
        assert!((test.p_value - 0.057668).abs() < 1e-4);
    }

    #[test]
    fn test_classify_low_mean_wins() {
        // Below the threshold stays low even with a tiny p-value.
        let status = classify(1.9, Some(0.001), &standard());
        assert_eq!(status, EffectivenessStatus::Low);
    }

    #[test]
    fn test_classify_significant() {
        let status = classify(2.75, Some(0.028), &standard());
        assert_eq!(status, EffectivenessStatus::Effective);
    }

    #[test]
    fn test_classify_insufficient_evidence() {
        assert_eq!(
            classify(2.5, Some(0.3), &standard()),
            EffectivenessStatus::Uncertain
        );
        // No test at all (single respondent) is also uncertain.
        assert_eq!(classify(2.5, None, &standard()), EffectivenessStatus::Uncertain);
    }

    #[test]
    fn test_evaluate_scope_empty_sample() {
        assert!(evaluate_scope("Governance", &[], &standard()).is_none());
    }

    #[test]
    fn test_evaluate_scope_single_respondent() {
        let eval = evaluate_scope("Governance", &[2.5], &standard()).unwrap();
        assert_eq!(eval.sample_size, 1);
        assert_eq!(eval.p_value, None);
        assert_eq!(eval.status, EffectivenessStatus::Uncertain);
    }

    #[test]
    fn test_evaluate_scope_effective() {
        let eval = evaluate_scope("Governance", &[3.0, 2.0, 3.0, 3.0], &standard()).unwrap();
        assert_eq!(eval.status, EffectivenessStatus::Effective);
        assert!((eval.mean - 2.75).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_scope_constant_at_threshold_stays_uncertain() {
        // Everyone scoring exactly the threshold is no evidence of exceeding it.
        let eval = evaluate_scope("Governance", &[2.0, 2.0, 2.0, 2.0], &standard()).unwrap();
        assert_eq!(eval.p_value, Some(1.0));
        assert_eq!(eval.status, EffectivenessStatus::Uncertain);
    }

    #[test]
    fn test_evaluate_scopes_skips_empty_scope() {
        let catalog = Catalog {
            scopes: vec![
                scope_with_indicators("Governance", &["1. Council"]),
                scope_with_indicators("Management", &["9. Plan"]),
            ],
        };
        // Nobody answered the Management indicator.
        let responses = vec![
            response("ana", &[("1. Council", "3")]),
            response("bruno", &[("1. Council", "2"), ("9. Plan", "NS")]),
        ];

        let evals = evaluate_scopes(&catalog, &responses, &standard());
        assert_eq!(evals.len(), 1);
        assert_eq!(evals[0].scope, "Governance");
        assert_eq!(evals[0].sample_size, 2);
    }

    #[test]
    fn test_evaluate_scopes_pooled_mode() {
        let catalog = Catalog {
            scopes: vec![scope_with_indicators(
                "Governance",
                &["1. Council", "2. Charter"],
            )],
        };
        let responses = vec![
            response("ana", &[("1. Council", "3"), ("2. Charter", "2")]),
            response("bruno", &[("1. Council", "1"), ("2. Charter", "2")]),
        ];

        let pooled = settings(1.5, Tail::TwoSided, SampleMode::PooledScores);
        let evals = evaluate_scopes(&catalog, &responses, &pooled);
        assert_eq!(evals.len(), 1);
        // Four raw scores pooled, not two respondent means.
        assert_eq!(evals[0].sample_size, 4);
        assert!((evals[0].mean - 2.0).abs() < 1e-12);
    }
}
