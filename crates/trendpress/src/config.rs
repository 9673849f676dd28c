//! Configuration file handling
//!
//! Loads `~/.trendpress/config.toml` (or an explicit `--config` path). Every
//! section is optional and falls back to its defaults:
//!
//! ```toml
//! [paths]
//! store = "/srv/trendpress/content.json"
//! signals = "/srv/trendpress/trends.json"
//!
//! [ranker]
//! max_concurrent = 8
//!
//! [duplicate]
//! skip_threshold = 0.85
//!
//! [links.style]
//! label = "Related reading"
//!
//! [jobs.pipeline]
//! batch_size = 5
//!
//! [jobs.reaper]
//! anchor = "finished_at"
//!
//! [generation]
//! command = "claude"
//! args = ["-p"]
//!
//! [rate_limits."jobs.start"]
//! max = 5
//! window_ms = 60000
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use trendpress_guard::EndpointLimit;
use trendpress_jobs::{PipelineConfig, ReaperConfig};
use trendpress_vetting::{DuplicateGuardConfig, LinkConfig, RankerConfig};

use crate::service::endpoints;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine config location: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendpressConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub ranker: RankerConfig,

    #[serde(default)]
    pub duplicate: DuplicateGuardConfig,

    #[serde(default)]
    pub links: LinkConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    /// Keyed by endpoint name; endpoints without an entry are not limited.
    #[serde(default = "default_rate_limits")]
    pub rate_limits: BTreeMap<String, EndpointLimit>,
}

/// File locations. Relative entries resolve against the Trendpress home.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// JSON content store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<PathBuf>,

    /// JSON file of candidate topics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<PathBuf>,

    /// Finished job records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<PathBuf>,
}

impl PathsConfig {
    pub fn store_path(&self, home: &Path) -> PathBuf {
        resolve(home, self.store.as_deref(), "content.json")
    }

    pub fn signals_path(&self, home: &Path) -> PathBuf {
        resolve(home, self.signals.as_deref(), "trends.json")
    }

    pub fn history_path(&self, home: &Path) -> PathBuf {
        resolve(home, self.history.as_deref(), "jobs.json")
    }
}

fn resolve(home: &Path, configured: Option<&Path>, default_name: &str) -> PathBuf {
    match configured {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => home.join(path),
        None => home.join(default_name),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub reaper: ReaperConfig,

    /// Finished jobs kept in the history file.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

/// External generation command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments placed before the prompt is piped to stdin.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// USD per million prompt tokens
    #[serde(default = "default_input_price")]
    pub input_price_per_mtok: f64,

    /// USD per million completion tokens
    #[serde(default = "default_output_price")]
    pub output_price_per_mtok: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            timeout_secs: default_timeout_secs(),
            input_price_per_mtok: default_input_price(),
            output_price_per_mtok: default_output_price(),
        }
    }
}

// Default value functions
fn default_history_limit() -> usize { 50 }
fn default_command() -> String { "claude".to_string() }
fn default_args() -> Vec<String> { vec!["-p".to_string()] }
fn default_timeout_secs() -> u64 { 300 }
fn default_input_price() -> f64 { 3.0 }
fn default_output_price() -> f64 { 15.0 }

fn default_rate_limits() -> BTreeMap<String, EndpointLimit> {
    BTreeMap::from([
        (endpoints::START_JOB.to_string(), EndpointLimit { max: 10, window_ms: 60_000 }),
        (endpoints::UPDATE_JOB.to_string(), EndpointLimit { max: 600, window_ms: 60_000 }),
        (endpoints::DISMISS_JOB.to_string(), EndpointLimit { max: 60, window_ms: 60_000 }),
    ])
}

impl Default for TrendpressConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            ranker: RankerConfig::default(),
            duplicate: DuplicateGuardConfig::default(),
            links: LinkConfig::default(),
            jobs: JobsConfig::default(),
            generation: GenerationConfig::default(),
            rate_limits: default_rate_limits(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            reaper: ReaperConfig::default(),
            history_limit: default_history_limit(),
        }
    }
}

impl TrendpressConfig {
    /// Reject settings the components cannot work with.
    pub fn validate(&self) -> Result<()> {
        let dup = &self.duplicate;
        for (name, value) in [
            ("duplicate.retain_threshold", dup.retain_threshold),
            ("duplicate.skip_threshold", dup.skip_threshold),
            ("duplicate.category_bonus_floor", dup.category_bonus_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        if dup.retain_threshold > dup.skip_threshold {
            return Err(ConfigError::Invalid(format!(
                "duplicate.retain_threshold ({}) exceeds skip_threshold ({})",
                dup.retain_threshold, dup.skip_threshold
            )));
        }
        if self.ranker.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "ranker.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.generation.command.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "generation.command must not be empty".to_string(),
            ));
        }
        if let Some((name, _)) = self.rate_limits.iter().find(|(_, l)| l.window_ms == 0) {
            return Err(ConfigError::Invalid(format!(
                "rate_limits.{} needs a non-zero window_ms",
                name
            )));
        }
        Ok(())
    }
}

/// Load configuration from a file; a missing file yields defaults.
pub fn load_config(config_path: &Path) -> Result<TrendpressConfig> {
    if !config_path.exists() {
        return Ok(TrendpressConfig::default());
    }

    let content = std::fs::read_to_string(config_path)?;
    let config: TrendpressConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

pub fn default_config_path() -> Result<PathBuf> {
    trendpress_logging::trendpress_home()
        .map(|home| home.join("config.toml"))
        .map_err(|e| ConfigError::NotFound(e.to_string()))
}
