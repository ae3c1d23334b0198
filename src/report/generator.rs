//! Markdown report generation.
//!
//! Renders one [`AnalysisReport`] as a Markdown document section by
//! section, plus the JSON rendition of the same structure.

use crate::models::{
    AnalysisReport, IndicatorStats, ReportMetadata, RespondentSummary, ScopeAdvice,
    ScopeEvaluation, ScopeMeans,
};
use crate::recommend::NO_RECOMMENDATION;
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Placeholder for values no sample could define.
const UNDEFINED: &str = "–";

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalysisReport) -> String {
    let mut output = String::new();

    // Title
    match &report.metadata.mosaic {
        Some(mosaic) => output.push_str(&format!("# Effectiveness Report: {}\n\n", mosaic)),
        None => output.push_str("# Effectiveness Report\n\n"),
    }

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents());
    output.push_str(&generate_effectiveness_section(&report.evaluations));
    output.push_str(&generate_hierarchy_section(&report.hierarchy));
    output.push_str(&generate_indicator_section(&report.indicator_stats));
    output.push_str(&generate_respondents_section(&report.respondents));
    output.push_str(&generate_recommendations_section(&report.advice));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Mosaic:** {}\n",
        metadata.mosaic.as_deref().unwrap_or("all mosaics")
    ));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Profile:** `{}` (threshold {}, {}, alpha {}, {})\n",
        metadata.profile, metadata.threshold, metadata.tail, metadata.alpha, metadata.sample_mode
    ));
    section.push_str(&format!("- **Responses:** {}\n", metadata.responses));
    section.push_str(&format!("- **Respondents:** {}\n", metadata.respondents));
    section.push_str(&format!("- **Indicators:** {}\n", metadata.indicators));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents() -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Effectiveness by Scope](#effectiveness-by-scope)\n");
    toc.push_str("- [Score Breakdown](#score-breakdown)\n");
    toc.push_str("- [Indicator Statistics](#indicator-statistics)\n");
    toc.push_str("- [Respondents](#respondents)\n");
    toc.push_str("- [Recommendations](#recommendations)\n");
    toc.push('\n');

    toc
}

/// Generate the effectiveness-by-scope table.
fn generate_effectiveness_section(evaluations: &[ScopeEvaluation]) -> String {
    let mut section = String::new();

    section.push_str("## Effectiveness by Scope\n\n");

    if evaluations.is_empty() {
        section.push_str("No scope had any applicable scores.\n\n");
        return section;
    }

    section.push_str("| Scope | Mean | N | t | p | Status |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---|\n");
    for eval in evaluations {
        section.push_str(&format!(
            "| {} | {:.2} | {} | {} | {} | {} {} |\n",
            eval.scope,
            eval.mean,
            eval.sample_size,
            fmt_opt(eval.t_statistic, 3),
            fmt_opt(eval.p_value, 4),
            eval.status.emoji(),
            eval.status,
        ));
    }
    section.push('\n');

    section
}

/// Generate the scope/principle/criterion breakdown.
fn generate_hierarchy_section(hierarchy: &[ScopeMeans]) -> String {
    let mut section = String::new();

    section.push_str("## Score Breakdown\n\n");

    for scope in hierarchy {
        section.push_str(&format!(
            "### {} ({})\n\n",
            scope.name,
            fmt_opt(scope.mean, 2)
        ));
        for principle in &scope.principles {
            section.push_str(&format!(
                "- **{}**: {}\n",
                principle.name,
                fmt_opt(principle.mean, 2)
            ));
            for criterion in &principle.criteria {
                section.push_str(&format!(
                    "  - {}: {}\n",
                    criterion.name,
                    fmt_opt(criterion.mean, 2)
                ));
            }
        }
        section.push('\n');
    }

    section
}

/// Generate the per-indicator statistics table.
fn generate_indicator_section(stats: &[IndicatorStats]) -> String {
    let mut section = String::new();

    section.push_str("## Indicator Statistics\n\n");
    section.push_str("| Indicator | Answers | Mean | Std Dev |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    for stat in stats {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            stat.label,
            stat.count,
            fmt_opt(stat.mean, 2),
            fmt_opt(stat.std_dev, 2),
        ));
    }
    section.push('\n');

    section
}

/// Generate the respondent roster.
fn generate_respondents_section(respondents: &[RespondentSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Respondents\n\n");
    section.push_str("| Name | Mosaic | Submitted | Answered |\n");
    section.push_str("|:---|:---|:---|:---:|\n");
    for respondent in respondents {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            respondent.name,
            respondent.mosaic,
            respondent.submitted_at.format("%Y-%m-%d %H:%M"),
            respondent.answered,
        ));
    }
    section.push('\n');

    section
}

/// Generate the recommendations section.
fn generate_recommendations_section(advice: &[ScopeAdvice]) -> String {
    let mut section = String::new();

    section.push_str("## Recommendations\n\n");

    if advice.is_empty() {
        section.push_str("✅ All scopes met the effectiveness threshold.\n\n");
        return section;
    }

    for scope in advice {
        section.push_str(&format!("### 🔴 {} (mean {:.2})\n\n", scope.scope, scope.mean));
        if scope.entries.is_empty() {
            section.push_str(&format!("*{}*\n\n", NO_RECOMMENDATION));
            continue;
        }
        for entry in &scope.entries {
            match &entry.problem {
                Some(problem) => {
                    section.push_str(&format!("- **{}**: {}\n", problem, entry.suggestion))
                }
                None => section.push_str(&format!("- {}\n", entry.suggestion)),
            }
        }
        section.push('\n');
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by effmeter*\n");

    footer
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => UNDEFINED.to_string(),
    }
}

/// Write the Markdown report to a file.
pub fn write_report(report: &AnalysisReport, path: &Path) -> Result<()> {
    let content = generate_markdown_report(report);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(report: &AnalysisReport, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
