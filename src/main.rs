//! effmeter - Survey-driven effectiveness scoring for protected-area mosaics
//!
//! A CLI tool that records questionnaire submissions, aggregates indicator
//! scores over the scope/principle/criterion catalog, and reports per-scope
//! effectiveness backed by a one-sample t-test.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, catalog, store failure, etc.)
//!   2 - --fail-on-low set and at least one scope classified Low

mod analysis;
mod catalog;
mod cli;
mod config;
mod models;
mod recommend;
mod report;
mod store;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, Command, OutputFormat};
use config::Config;
use models::{AnalysisReport, Catalog, EffectivenessStatus, ReportMetadata, Response, Score};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init early (no logging needed)
    if let Command::Init { force } = &args.command {
        return handle_init(*force);
    }

    // Initialize logging
    init_logging(&args);

    info!("effmeter v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle `init`: generate a default effmeter.toml.
fn handle_init(force: bool) -> Result<()> {
    let path = Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() && !force {
        eprintln!("⚠️  effmeter.toml already exists. Use --force to overwrite it.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write effmeter.toml")?;

    println!("✅ Created effmeter.toml with default settings.");
    println!("   Edit it to point at your catalog, response store, and recommendations.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Dispatch the selected subcommand. Returns the process exit code.
fn run(args: Args) -> Result<i32> {
    let config = load_config(&args)?;

    match &args.command {
        Command::Submit {
            name,
            contact,
            mosaic,
            answers,
        } => run_submit(&config, name, contact, mosaic, answers),
        Command::Report {
            mosaic,
            format,
            output,
            profile,
            fail_on_low,
        } => run_report(
            &config,
            mosaic.as_deref(),
            *format,
            output.as_deref(),
            profile.as_deref(),
            *fail_on_low,
        ),
        Command::Check => run_check(&config),
        // Handled before logging was initialized; kept for completeness.
        Command::Init { force } => handle_init(*force).map(|_| 0),
    }
}

/// Raw CSV row shape of an answers file.
#[derive(Debug, serde::Deserialize)]
struct AnswerRow {
    #[serde(rename = "Indicator")]
    indicator: String,
    #[serde(rename = "Score", default)]
    score: String,
}

/// Handle `submit`: record one questionnaire submission.
fn run_submit(
    config: &Config,
    name: &str,
    contact: &str,
    mosaic: &str,
    answers: &Path,
) -> Result<i32> {
    let catalog = catalog::load(&catalog::CatalogSettings::from(&config.catalog))?;
    let scores = read_answers(answers, &catalog)?;

    let response = Response {
        respondent: name.to_string(),
        contact: contact.to_string(),
        mosaic: mosaic.to_string(),
        submitted_at: Utc::now(),
        scores,
    };

    let store = store::ResponseStore::new(&config.store.responses);
    store.append(&response, &catalog)?;

    println!(
        "✅ Submission recorded for {} ({}): {} of {} indicators answered.",
        name,
        mosaic,
        response.answered_count(),
        catalog.indicator_count()
    );
    Ok(0)
}

/// Reads a two-column `Indicator,Score` answers file.
///
/// Unknown indicators are warned about and ignored; unrecognized score
/// spellings are warned about and recorded as NA.
fn read_answers(path: &Path, catalog: &Catalog) -> Result<BTreeMap<String, Score>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open answers file: {}", path.display()))?;

    let known: BTreeSet<&str> = catalog.indicator_labels().into_iter().collect();
    let mut scores = BTreeMap::new();

    for row in reader.deserialize::<AnswerRow>() {
        let row =
            row.with_context(|| format!("Failed to parse answers file: {}", path.display()))?;
        let label = row.indicator.trim();
        if label.is_empty() {
            continue;
        }
        if !known.contains(label) {
            warn!(indicator = label, "answers file names an unknown indicator, ignored");
            continue;
        }
        let raw = row.score.trim();
        if !Score::is_recognized(raw) {
            warn!(
                indicator = label,
                score = raw,
                "unrecognized score value, recorded as NA"
            );
        }
        scores.insert(label.to_string(), Score::parse(raw));
    }

    Ok(scores)
}

/// Handle `report`: aggregate, evaluate, and write the report.
fn run_report(
    config: &Config,
    mosaic: Option<&str>,
    format: OutputFormat,
    output: Option<&Path>,
    profile_override: Option<&str>,
    fail_on_low: bool,
) -> Result<i32> {
    let catalog = catalog::load(&catalog::CatalogSettings::from(&config.catalog))?;

    let store = store::ResponseStore::new(&config.store.responses);
    let mut responses = store.load()?;
    let loaded = responses.len();

    if let Some(mosaic) = mosaic {
        responses = analysis::filter_by_mosaic(&responses, mosaic);
        info!(mosaic, kept = responses.len(), loaded, "mosaic filter applied");
    }

    if responses.is_empty() {
        match mosaic {
            Some(m) => println!("📭 No responses recorded for mosaic '{}'.", m),
            None => println!("📭 No responses recorded yet."),
        }
        return Ok(0);
    }

    let (profile_name, profile) = config.scoring.active(profile_override)?;
    let settings = analysis::EvalSettings::from(profile);
    println!(
        "📊 Evaluating {} responses with the '{}' profile...",
        responses.len(),
        profile_name
    );

    let evaluations = analysis::evaluate_scopes(&catalog, &responses, &settings);
    let hierarchy = analysis::hierarchy_means(&catalog, &responses);
    let indicator_stats = analysis::indicator_stats(&catalog, &responses);
    let respondents = analysis::respondent_summaries(&responses);

    let recommendations_path = Path::new(&config.recommendations.file);
    let recommendations = match recommend::RecommendationSet::load(recommendations_path)? {
        Some(set) => set,
        None => {
            warn!(
                file = %config.recommendations.file,
                "recommendations file not found, advice will be empty"
            );
            recommend::RecommendationSet::empty()
        }
    };
    let advice = recommend::advise(&evaluations, &recommendations);

    let metadata = ReportMetadata {
        mosaic: mosaic.map(str::to_string),
        generated_at: Utc::now(),
        profile: profile_name.to_string(),
        threshold: profile.threshold,
        tail: profile.tail,
        alpha: profile.alpha,
        sample_mode: profile.sample,
        responses: responses.len(),
        respondents: analysis::distinct_respondents(&responses),
        indicators: catalog.indicator_count(),
    };

    let analysis_report = AnalysisReport {
        metadata,
        evaluations,
        hierarchy,
        indicator_stats,
        respondents,
        advice,
    };

    let output_path: PathBuf = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.general.output));

    match format {
        OutputFormat::Markdown => report::write_report(&analysis_report, &output_path),
        OutputFormat::Json => report::write_json_report(&analysis_report, &output_path),
    }
    .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    let effective = count_status(&analysis_report.evaluations, EffectivenessStatus::Effective);
    let uncertain = count_status(&analysis_report.evaluations, EffectivenessStatus::Uncertain);
    let low = count_status(&analysis_report.evaluations, EffectivenessStatus::Low);

    println!("\n📊 Effectiveness Summary:");
    println!("   Scopes evaluated: {}", analysis_report.evaluations.len());
    println!(
        "   - 🟢 Effective: {} | 🟡 Uncertain: {} | 🔴 Low: {}",
        effective, uncertain, low
    );
    println!("\n✅ Report saved to: {}", output_path.display());

    if fail_on_low && low > 0 {
        eprintln!(
            "\n⛔ {} scope(s) below the effectiveness threshold. Failing (exit code 2).",
            low
        );
        return Ok(2);
    }

    Ok(0)
}

fn count_status(evaluations: &[models::ScopeEvaluation], status: EffectivenessStatus) -> usize {
    evaluations.iter().filter(|e| e.status == status).count()
}

/// Handle `check`: verify the data files line up with each other.
fn run_check(config: &Config) -> Result<i32> {
    println!("🔍 Checking data files...\n");

    let catalog = catalog::load(&catalog::CatalogSettings::from(&config.catalog))?;
    println!(
        "   📚 Catalog: {} scopes, {} indicators",
        catalog.scopes.len(),
        catalog.indicator_count()
    );
    for scope in &catalog.scopes {
        println!(
            "      - {}: {} indicators",
            scope.name,
            scope.indicator_labels().len()
        );
    }

    let store = store::ResponseStore::new(&config.store.responses);
    if store.exists() {
        store.verify_header(&catalog)?;
        let responses = store.load()?;
        println!(
            "   🗃️  Store: {} responses in {} (columns match the catalog)",
            responses.len(),
            config.store.responses
        );
        let mosaics: BTreeSet<&str> = responses.iter().map(|r| r.mosaic.as_str()).collect();
        if !mosaics.is_empty() {
            println!(
                "   🌍 Mosaics: {}",
                mosaics.into_iter().collect::<Vec<_>>().join(", ")
            );
        }
    } else {
        println!(
            "   🗃️  Store: {} not created yet (first submit will create it)",
            config.store.responses
        );
    }

    let recommendations_path = Path::new(&config.recommendations.file);
    match recommend::RecommendationSet::load(recommendations_path)? {
        Some(set) => println!(
            "   💡 Recommendations: {} entries in {}",
            set.len(),
            config.recommendations.file
        ),
        None => println!(
            "   ⚠️  Recommendations: {} not found (reports will carry no advice)",
            config.recommendations.file
        ),
    }

    println!("\n✅ Check complete.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
