//! CLI module for Trendpress
//!
//! Each subcommand loads the configuration, assembles the control service
//! around the file-backed collaborators, and runs on a short-lived
//! current-thread runtime.

pub mod error;
pub mod output;

pub mod config;
pub mod jobs;
pub mod rank;
pub mod run;
pub mod vet;

use anyhow::Result;
use std::future::Future;
use std::path::PathBuf;
use trendpress::{build_runtime, load_config, Runtime, TrendpressConfig};

use crate::cli::error::HelpfulError;

/// Client id the CLI presents to the rate guard.
pub const CLI_CLIENT: &str = "cli";

/// Resolved configuration for one invocation.
pub struct CommandContext {
    pub config: TrendpressConfig,
    pub config_path: PathBuf,
    pub home: PathBuf,
}

impl CommandContext {
    /// Load the explicit `--config` file, or the default one if present.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self> {
        let home = trendpress_logging::trendpress_home()?;
        let config_path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(HelpfulError::file_not_found(&path).into());
                }
                path
            }
            None => home.join("config.toml"),
        };

        let config = load_config(&config_path)
            .map_err(|e| HelpfulError::invalid_config(&config_path, &e.to_string()))?;

        Ok(Self {
            config,
            config_path,
            home,
        })
    }

    pub fn runtime(&self) -> Result<Runtime> {
        build_runtime(&self.config, &self.home)
    }
}

/// Run a future to completion on a fresh current-thread runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(rt.block_on(future))
}

/// Reject blank keyword arguments before any lookup.
pub fn require_keyword(keyword: &str) -> Result<&str> {
    let trimmed = keyword.trim();
    if trimmed.is_empty() {
        return Err(HelpfulError::empty_keyword().into());
    }
    Ok(trimmed)
}
