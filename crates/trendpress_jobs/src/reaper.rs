//! Background eviction of finished jobs.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::registry::JobRegistry;
use crate::{JOB_RETENTION_SECS, REAP_INTERVAL_MS};

/// Timestamp the retention window is measured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionAnchor {
    /// Job start. A long batch can be evicted soon after it finishes.
    #[default]
    StartedAt,
    /// Transition into `done`/`error`.
    FinishedAt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    #[serde(default)]
    pub anchor: RetentionAnchor,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            retention_secs: default_retention_secs(),
            anchor: RetentionAnchor::default(),
        }
    }
}

fn default_interval_ms() -> u64 { REAP_INTERVAL_MS }
fn default_retention_secs() -> u64 { JOB_RETENTION_SECS }

impl ReaperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retention_secs.min(i64::MAX as u64) as i64)
    }
}

/// Stops the reaper task.
pub struct ReaperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Signal the task and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

/// Spawn a task that evicts expired terminal jobs on every tick.
///
/// Must be called from within a tokio runtime.
pub fn spawn_reaper(registry: JobRegistry, config: ReaperConfig) -> ReaperHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval());
        // First tick completes immediately, skip it
        ticker.tick().await;
        info!(
            "Job reaper running every {}ms (retention {}s from {:?})",
            config.interval_ms, config.retention_secs, config.anchor
        );

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown_rx => {
                    debug!("Job reaper shutting down");
                    break;
                }

                _ = ticker.tick() => {
                    registry.evict_expired(Utc::now(), config.retention(), config.anchor);
                }
            }
        }
    });

    ReaperHandle {
        shutdown_tx: Some(shutdown_tx),
        task,
    }
}
