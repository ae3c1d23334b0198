//! Score aggregation over the catalog hierarchy.
//!
//! All means here follow the same rule: NA and missing scores are ignored,
//! a node with no valid children has an undefined mean, and every parent
//! level averages its children's means (unweighted mean-of-means), never
//! the raw leaf scores.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{
    Catalog, CriterionMeans, IndicatorMean, IndicatorStats, PrincipleMeans, RespondentSummary,
    Response, Scope, ScopeMeans,
};

use crate::analysis::stats;

/// Restricts a response set to one mosaic.
///
/// Matching is on the trimmed, case-insensitive mosaic label, the same
/// normalization the recommendation matcher applies to scope names.
pub fn filter_by_mosaic(responses: &[Response], mosaic: &str) -> Vec<Response> {
    let wanted = normalize(mosaic);
    responses
        .iter()
        .filter(|r| normalize(&r.mosaic) == wanted)
        .cloned()
        .collect()
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

/// All applicable (non-NA) scores recorded for one indicator, in response
/// order.
fn indicator_values(label: &str, responses: &[Response]) -> Vec<f64> {
    responses
        .iter()
        .filter_map(|r| r.score(label).numeric())
        .collect()
}

/// Mean of the defined child means; `None` when every child is undefined.
fn mean_of_defined<I>(children: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let defined: Vec<f64> = children.into_iter().flatten().collect();
    stats::mean(&defined)
}

/// Computes the full scope -> principle -> criterion -> indicator mean
/// rollup, preserving catalog order.
pub fn hierarchy_means(catalog: &Catalog, responses: &[Response]) -> Vec<ScopeMeans> {
    catalog
        .scopes
        .iter()
        .map(|scope| {
            let principles: Vec<PrincipleMeans> = scope
                .principles
                .iter()
                .map(|principle| {
                    let criteria: Vec<CriterionMeans> = principle
                        .criteria
                        .iter()
                        .map(|criterion| {
                            let indicators: Vec<IndicatorMean> = criterion
                                .indicators
                                .iter()
                                .map(|indicator| {
                                    let values = indicator_values(&indicator.label, responses);
                                    IndicatorMean {
                                        label: indicator.label.clone(),
                                        mean: stats::mean(&values),
                                        samples: values.len(),
                                    }
                                })
                                .collect();
                            let mean = mean_of_defined(indicators.iter().map(|i| i.mean));
                            CriterionMeans {
                                name: criterion.name.clone(),
                                mean,
                                indicators,
                            }
                        })
                        .collect();
                    let mean = mean_of_defined(criteria.iter().map(|c| c.mean));
                    PrincipleMeans {
                        name: principle.name.clone(),
                        mean,
                        criteria,
                    }
                })
                .collect();
            let mean = mean_of_defined(principles.iter().map(|p| p.mean));
            ScopeMeans {
                name: scope.name.clone(),
                mean,
                principles,
            }
        })
        .collect()
}

/// Per-respondent mean over one scope's indicators.
///
/// Each respondent contributes the average of their own applicable scores
/// within the scope; respondents who answered nothing applicable in the
/// scope are omitted. Keyed by respondent name, so repeat submissions under
/// the same name pool into one sample point.
pub fn respondent_scope_means(scope: &Scope, responses: &[Response]) -> BTreeMap<String, f64> {
    let labels = scope.indicator_labels();
    let mut values: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for response in responses {
        let scores: Vec<f64> = labels
            .iter()
            .filter_map(|label| response.score(label).numeric())
            .collect();
        if !scores.is_empty() {
            values
                .entry(response.respondent.clone())
                .or_default()
                .extend(scores);
        }
    }

    values
        .into_iter()
        .filter_map(|(name, scores)| stats::mean(&scores).map(|m| (name, m)))
        .collect()
}

/// Every applicable raw score within one scope, pooled across respondents.
pub fn pooled_scope_scores(scope: &Scope, responses: &[Response]) -> Vec<f64> {
    responses
        .iter()
        .flat_map(|response| {
            scope
                .indicator_labels()
                .into_iter()
                .filter_map(|label| response.score(label).numeric())
                .collect::<Vec<f64>>()
        })
        .collect()
}

/// Descriptive statistics for every catalog indicator, in catalog order.
pub fn indicator_stats(catalog: &Catalog, responses: &[Response]) -> Vec<IndicatorStats> {
    catalog
        .indicator_labels()
        .into_iter()
        .map(|label| {
            let values = indicator_values(label, responses);
            IndicatorStats {
                label: label.to_string(),
                count: values.len(),
                mean: stats::mean(&values),
                std_dev: stats::sample_std_dev(&values),
            }
        })
        .collect()
}

/// One roster line per submission, in store order.
pub fn respondent_summaries(responses: &[Response]) -> Vec<RespondentSummary> {
    responses
        .iter()
        .map(|r| RespondentSummary {
            name: r.respondent.clone(),
            mosaic: r.mosaic.clone(),
            submitted_at: r.submitted_at,
            answered: r.answered_count(),
        })
        .collect()
}

/// Number of distinct respondent names in the set.
pub fn distinct_respondents(responses: &[Response]) -> usize {
    responses
        .iter()
        .map(|r| r.respondent.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Criterion, Indicator, Principle, Score};
    use chrono::Utc;

    fn response(name: &str, mosaic: &str, scores: &[(&str, &str)]) -> Response {
        Response {
            respondent: name.to_string(),
            contact: String::new(),
            mosaic: mosaic.to_string(),
            submitted_at: Utc::now(),
            scores: scores
                .iter()
                .map(|(label, raw)| (label.to_string(), Score::parse(raw)))
                .collect(),
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            scopes: vec![Scope {
                name: "Governance".to_string(),
                principles: vec![
                    Principle {
                        name: "Legitimacy".to_string(),
                        criteria: vec![Criterion {
                            name: "Representation".to_string(),
                            indicators: vec![Indicator::new("1. Council exists")],
                        }],
                    },
                    Principle {
                        name: "Direction".to_string(),
                        criteria: vec![Criterion {
                            name: "Planning".to_string(),
                            indicators: vec![
                                Indicator::new("2. Plan exists"),
                                Indicator::new("3. Plan applied"),
                                Indicator::new("4. Plan reviewed"),
                            ],
                        }],
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_filter_by_mosaic() {
        let responses = vec![
            response("ana", "Mosaico Central", &[]),
            response("bruno", "Litoral Norte", &[]),
            response("carla", "  mosaico central ", &[]),
        ];

        let filtered = filter_by_mosaic(&responses, "Mosaico Central");
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].respondent, "ana");
        assert_eq!(filtered[1].respondent, "carla");
    }

    #[test]
    fn test_indicator_mean_ignores_na() {
        let responses = vec![
            response("ana", "M", &[("1. Council exists", "3")]),
            response("bruno", "M", &[("1. Council exists", "NS")]),
            response("carla", "M", &[("1. Council exists", "1")]),
        ];

        let rollup = hierarchy_means(&catalog(), &responses);
        let indicator = &rollup[0].principles[0].criteria[0].indicators[0];
        assert_eq!(indicator.samples, 2);
        assert_eq!(indicator.mean, Some(2.0));
    }

    #[test]
    fn test_all_na_criterion_is_undefined() {
        // Only the first principle's indicator gets answers; the second
        // principle must come out undefined, not zero.
        let responses = vec![
            response("ana", "M", &[("1. Council exists", "2"), ("2. Plan exists", "NS")]),
        ];

        let rollup = hierarchy_means(&catalog(), &responses);
        let planning = &rollup[0].principles[1].criteria[0];
        assert_eq!(planning.mean, None);
        assert_eq!(rollup[0].principles[1].mean, None);
        // The scope mean only averages the defined principle.
        assert_eq!(rollup[0].mean, Some(2.0));
    }

    #[test]
    fn test_scope_mean_is_mean_of_means() {
        // Principle "Legitimacy" has one indicator at 3; "Direction" has
        // three indicators at 1. A raw-leaf average would be 1.5; the
        // mean-of-means is 2.0.
        let responses = vec![response(
            "ana",
            "M",
            &[
                ("1. Council exists", "3"),
                ("2. Plan exists", "1"),
                ("3. Plan applied", "1"),
                ("4. Plan reviewed", "1"),
            ],
        )];

        let rollup = hierarchy_means(&catalog(), &responses);
        assert_eq!(rollup[0].principles[0].mean, Some(3.0));
        assert_eq!(rollup[0].principles[1].mean, Some(1.0));
        assert_eq!(rollup[0].mean, Some(2.0));
    }

    #[test]
    fn test_respondent_scope_means() {
        let cat = catalog();
        let scope = &cat.scopes[0];
        let responses = vec![
            response(
                "ana",
                "M",
                &[("1. Council exists", "3"), ("2. Plan exists", "1")],
            ),
            response("bruno", "M", &[("1. Council exists", "NS")]),
            response("carla", "M", &[("3. Plan applied", "2")]),
        ];

        let means = respondent_scope_means(scope, &responses);
        // bruno answered nothing applicable and is omitted.
        assert_eq!(means.len(), 2);
        assert_eq!(means.get("ana"), Some(&2.0));
        assert_eq!(means.get("carla"), Some(&2.0));
    }

    #[test]
    fn test_repeat_submissions_pool_by_name() {
        let cat = catalog();
        let scope = &cat.scopes[0];
        let responses = vec![
            response("ana", "M", &[("1. Council exists", "3")]),
            response("ana", "M", &[("2. Plan exists", "1")]),
        ];

        let means = respondent_scope_means(scope, &responses);
        assert_eq!(means.len(), 1);
        assert_eq!(means.get("ana"), Some(&2.0));
    }

    #[test]
    fn test_pooled_scope_scores() {
        let cat = catalog();
        let scope = &cat.scopes[0];
        let responses = vec![
            response(
                "ana",
                "M",
                &[("1. Council exists", "3"), ("2. Plan exists", "1")],
            ),
            response("bruno", "M", &[("1. Council exists", "2")]),
        ];

        let pooled = pooled_scope_scores(scope, &responses);
        assert_eq!(pooled, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_indicator_stats() {
        let responses = vec![
            response("ana", "M", &[("1. Council exists", "1")]),
            response("bruno", "M", &[("1. Council exists", "3")]),
        ];

        let stats = indicator_stats(&catalog(), &responses);
        assert_eq!(stats.len(), 4);
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].mean, Some(2.0));
        assert!((stats[0].std_dev.unwrap() - 2.0f64.sqrt()).abs() < 1e-12);
        // Unanswered indicators carry no statistics.
        assert_eq!(stats[1].count, 0);
        assert_eq!(stats[1].mean, None);
        assert_eq!(stats[1].std_dev, None);
    }

    #[test]
    fn test_respondent_summaries_and_distinct() {
        let responses = vec![
            response("ana", "M", &[("1. Council exists", "1")]),
            response("bruno", "M", &[]),
            response("ana", "M", &[("2. Plan exists", "NS")]),
        ];

        let roster = respondent_summaries(&responses);
        assert_eq!(roster.len(), 3);
        assert_eq!(roster[0].answered, 1);
        assert_eq!(roster[2].answered, 0);
        assert_eq!(distinct_respondents(&responses), 2);
    }
}
