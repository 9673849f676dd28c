//! Trendpress - Core Library
//!
//! Wires the vetting, job, and guard crates to file-backed collaborators and
//! exposes them through [`ControlService`].

pub mod config;
pub mod generator;
pub mod history;
pub mod service;
pub mod signals;
pub mod store;

pub use config::{load_config, ConfigError, TrendpressConfig};
pub use generator::CommandGenerator;
pub use history::JobHistory;
pub use service::{endpoints, ControlService, Guarded};
pub use signals::JsonSignalProvider;
pub use store::JsonContentStore;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use trendpress_jobs::pipeline::Collaborators;
use trendpress_jobs::{FallbackSignals, GenerationPipeline, JobRegistry};
use trendpress_protocol::GenerationProvider;
use trendpress_vetting::HeuristicEstimator;

/// A service assembled from configuration, plus the handles the CLI needs.
pub struct Runtime {
    pub service: ControlService,
    pub store: Arc<JsonContentStore>,
    pub history: JobHistory,
    pub signals_path: PathBuf,
}

/// Build the service with the configured external command as generator.
pub fn build_runtime(config: &TrendpressConfig, home: &Path) -> Result<Runtime> {
    let generator = Arc::new(CommandGenerator::from_config(&config.generation));
    build_runtime_with(config, home, generator)
}

/// Build the service around an explicit generator.
pub fn build_runtime_with(
    config: &TrendpressConfig,
    home: &Path,
    generator: Arc<dyn GenerationProvider>,
) -> Result<Runtime> {
    let store = Arc::new(JsonContentStore::open(config.paths.store_path(home))?);
    let signals_path = config.paths.signals_path(home);
    let signals = FallbackSignals::new(Arc::new(JsonSignalProvider::new(&signals_path)));

    let pipeline = GenerationPipeline::new(
        JobRegistry::new(),
        Collaborators {
            signals: Arc::new(signals),
            estimator: Arc::new(HeuristicEstimator::new()),
            generator,
            store: store.clone(),
        },
    )
    .with_config(config.jobs.pipeline.clone())
    .with_ranker_config(config.ranker.clone())
    .with_duplicate_config(config.duplicate.clone())
    .with_link_config(config.links.clone());

    Ok(Runtime {
        service: ControlService::new(pipeline, config.rate_limits.clone()),
        store,
        history: JobHistory::new(config.paths.history_path(home), config.jobs.history_limit),
        signals_path,
    })
}
