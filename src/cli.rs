//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// effmeter - survey-driven effectiveness scoring for protected-area mosaics
///
/// Collects questionnaire submissions, aggregates indicator scores over the
/// scope/principle/criterion catalog, and reports per-scope effectiveness
/// backed by a one-sample t-test against the configured threshold.
///
/// Examples:
///   effmeter init
///   effmeter submit --name "Ana Souza" --mosaic "Mosaico Central" --answers answers.csv
///   effmeter report --mosaic "Mosaico Central"
///   effmeter report --profile legacy --format json --output report.json
///   effmeter check
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for effmeter.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Record one questionnaire submission in the response store
    Submit {
        /// Respondent name
        #[arg(short, long)]
        name: String,

        /// Respondent contact (email or phone)
        #[arg(long, default_value = "")]
        contact: String,

        /// Mosaic the respondent answers for
        #[arg(short, long)]
        mosaic: String,

        /// Answers file: a two-column CSV with an Indicator,Score header
        #[arg(short, long, value_name = "FILE")]
        answers: PathBuf,
    },

    /// Aggregate stored responses and write the effectiveness report
    Report {
        /// Restrict the analysis to one mosaic
        #[arg(short, long)]
        mosaic: Option<String>,

        /// Output format (markdown, json)
        #[arg(long, default_value = "markdown", value_name = "FORMAT")]
        format: OutputFormat,

        /// Output file path
        ///
        /// Defaults to the path configured in effmeter.toml.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Scoring profile to evaluate with
        ///
        /// Can also be set via the EFFMETER_PROFILE env var. Defaults to
        /// the profile named in effmeter.toml.
        #[arg(short, long, env = "EFFMETER_PROFILE", value_name = "NAME")]
        profile: Option<String>,

        /// Exit with code 2 when any scope is classified Low
        ///
        /// Useful for CI pipelines watching a mosaic's effectiveness.
        #[arg(long)]
        fail_on_low: bool,
    },

    /// Verify that the catalog, store, and recommendations files line up
    Check,

    /// Generate a default effmeter.toml configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Command::Submit {
            name,
            mosaic,
            answers,
            ..
        } = &self.command
        {
            if name.trim().is_empty() {
                return Err("Respondent name must not be empty".to_string());
            }
            if mosaic.trim().is_empty() {
                return Err("Mosaic must not be empty".to_string());
            }
            if !answers.exists() {
                return Err(format!("Answers file does not exist: {}", answers.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
