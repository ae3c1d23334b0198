//! Configuration file handling.
//!
//! This module handles loading configuration from `effmeter.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::catalog::CatalogFormat;
use crate::models::{SampleMode, Tail};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "effmeter.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Catalog input settings.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Response store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Recommendations input settings.
    #[serde(default)]
    pub recommendations: RecommendationsConfig,

    /// Scoring profile settings.
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default report output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "effectiveness_report.md".to_string()
}

/// Catalog input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding the catalog files.
    #[serde(default = "default_catalog_dir")]
    pub dir: String,

    /// Catalog layout on disk.
    #[serde(default)]
    pub format: CatalogFormat,

    /// Outline file name, used only with `format = "outline"`.
    #[serde(default = "default_outline_file")]
    pub outline_file: String,

    /// Ordered scope -> partition file mapping, used only with
    /// `format = "partitioned"`.
    #[serde(default = "default_partitions")]
    pub partitions: Vec<PartitionEntry>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            dir: default_catalog_dir(),
            format: CatalogFormat::default(),
            outline_file: default_outline_file(),
            partitions: default_partitions(),
        }
    }
}

/// One scope -> partition file mapping entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionEntry {
    pub scope: String,
    pub file: String,
}

fn default_catalog_dir() -> String {
    "catalog".to_string()
}

fn default_outline_file() -> String {
    "indicators.csv".to_string()
}

fn default_partitions() -> Vec<PartitionEntry> {
    [
        ("Governance", "governance.csv"),
        ("Management", "management.csv"),
        ("Sociodiversity", "sociodiversity.csv"),
        ("Biodiversity", "biodiversity.csv"),
    ]
    .into_iter()
    .map(|(scope, file)| PartitionEntry {
        scope: scope.to_string(),
        file: file.to_string(),
    })
    .collect()
}

/// Response store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the response CSV file.
    #[serde(default = "default_responses_file")]
    pub responses: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            responses: default_responses_file(),
        }
    }
}

fn default_responses_file() -> String {
    "responses.csv".to_string()
}

/// Recommendations input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsConfig {
    /// Path of the recommendations CSV file.
    #[serde(default = "default_recommendations_file")]
    pub file: String,
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            file: default_recommendations_file(),
        }
    }
}

fn default_recommendations_file() -> String {
    "recommendations.csv".to_string()
}

/// Scoring profile settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Profile used when none is selected on the command line.
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Named profiles available for selection.
    #[serde(default = "default_profiles")]
    pub profiles: BTreeMap<String, ScoringProfile>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            profiles: default_profiles(),
        }
    }
}

/// A named bundle of threshold, tail, alpha, and sample mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringProfile {
    /// Effectiveness threshold the sample mean is tested against.
    pub threshold: f64,

    /// Which tail of the t distribution the p-value covers.
    #[serde(default = "default_tail")]
    pub tail: Tail,

    /// Significance level.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// How the per-scope sample is assembled.
    #[serde(default = "default_sample_mode")]
    pub sample: SampleMode,
}

fn default_profile_name() -> String {
    "standard".to_string()
}

fn default_tail() -> Tail {
    Tail::Greater
}

fn default_alpha() -> f64 {
    0.05
}

fn default_sample_mode() -> SampleMode {
    SampleMode::RespondentMeans
}

fn default_profiles() -> BTreeMap<String, ScoringProfile> {
    BTreeMap::from([
        (
            "standard".to_string(),
            ScoringProfile {
                threshold: 2.0,
                tail: Tail::Greater,
                alpha: 0.05,
                sample: SampleMode::RespondentMeans,
            },
        ),
        (
            "legacy".to_string(),
            ScoringProfile {
                threshold: 1.5,
                tail: Tail::TwoSided,
                alpha: 0.05,
                sample: SampleMode::PooledScores,
            },
        ),
    ])
}

impl ScoringConfig {
    /// Resolves the active profile, preferring the command-line override
    /// over the configured default.
    pub fn active(&self, override_name: Option<&str>) -> Result<(&str, &ScoringProfile)> {
        let name = override_name.unwrap_or(&self.profile);
        match self.profiles.get_key_value(name) {
            Some((name, profile)) => Ok((name.as_str(), profile)),
            None => {
                let known: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
                bail!(
                    "Unknown scoring profile '{}' (known profiles: {})",
                    name,
                    known.join(", ")
                )
            }
        }
    }

    /// Keeps the built-in profiles selectable when the user defines their
    /// own table; a user entry with the same name wins.
    fn ensure_builtin_profiles(&mut self) {
        for (name, profile) in default_profiles() {
            self.profiles.entry(name).or_insert(profile);
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.scoring.ensure_builtin_profiles();

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
