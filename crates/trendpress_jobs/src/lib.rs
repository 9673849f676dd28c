//! Generation job subsystem.
//!
//! Tracks multi-stage generation jobs from trend lookup to stored draft:
//! - Job creation and forward-only stage tracking
//! - Batch progress and per-item results
//! - Passive eviction of finished jobs
//! - The end-to-end pipeline that drives a job
//!
//! # Stages
//!
//! `idle → trends → benchmark → generate → done`, with `error` reachable from
//! any stage. `done` and `error` are absorbing: further mutations are
//! accepted and ignored.
//!
//! # Active job
//!
//! [`JobRegistry::active_job`] reports the first in-flight job in registry
//! order. It is a display convenience and does not limit concurrency.

pub mod metrics;
pub mod pipeline;
pub mod prompts;
pub mod reaper;
pub mod registry;
pub mod signals;

pub use metrics::{PipelineMetrics, PipelineMetricsSnapshot, PIPELINE_METRICS};
pub use pipeline::{Collaborators, GenerationPipeline, PipelineConfig};
pub use reaper::{spawn_reaper, ReaperConfig, ReaperHandle, RetentionAnchor};
pub use registry::JobRegistry;
pub use signals::{fallback_trends, FallbackSignals};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use trendpress_ids::JobId;

/// Reaper tick (5 seconds)
pub const REAP_INTERVAL_MS: u64 = 5_000;

/// Terminal job retention (60 seconds)
pub const JOB_RETENTION_SECS: u64 = 60;

/// How a job chose its topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// Top trending topic
    Single,
    /// Operator-supplied keyword
    Manual,
    /// Several top topics, processed one after another
    Batch,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobMode::Single => "single",
            JobMode::Manual => "manual",
            JobMode::Batch => "batch",
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(JobMode::Single),
            "manual" => Ok(JobMode::Manual),
            "batch" => Ok(JobMode::Batch),
            _ => Err(format!(
                "Invalid job mode: '{}'. Expected: single, manual, or batch",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Idle,
    Trends,
    Benchmark,
    Generate,
    Done,
    Error,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Idle => "idle",
            JobStage::Trends => "trends",
            JobStage::Benchmark => "benchmark",
            JobStage::Generate => "generate",
            JobStage::Done => "done",
            JobStage::Error => "error",
        }
    }

    /// Position in the forward order. Both terminal stages share the last slot.
    pub fn rank(&self) -> u8 {
        match self {
            JobStage::Idle => 0,
            JobStage::Trends => 1,
            JobStage::Benchmark => 2,
            JobStage::Generate => 3,
            JobStage::Done | JobStage::Error => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Done | JobStage::Error)
    }

    /// Neither idle nor terminal.
    pub fn is_in_flight(&self) -> bool {
        !matches!(self, JobStage::Idle | JobStage::Done | JobStage::Error)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(JobStage::Idle),
            "trends" => Ok(JobStage::Trends),
            "benchmark" => Ok(JobStage::Benchmark),
            "generate" => Ok(JobStage::Generate),
            "done" => Ok(JobStage::Done),
            "error" => Ok(JobStage::Error),
            _ => Err(format!(
                "Invalid job stage: '{}'. Expected: idle, trends, benchmark, generate, done, or error",
                s
            )),
        }
    }
}

/// Outcome of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub title: String,
    pub keyword: String,
    pub success: bool,
}

impl JobResult {
    pub fn succeeded(title: impl Into<String>, keyword: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            keyword: keyword.into(),
            success: true,
        }
    }

    pub fn failed(title: impl Into<String>, keyword: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            keyword: keyword.into(),
            success: false,
        }
    }
}

/// Full job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: JobId,
    pub mode: JobMode,
    pub stage: JobStage,
    /// Keyword currently being worked on
    pub keyword: String,
    pub started_at: DateTime<Utc>,
    /// Set on the transition into `done` or `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub batch_current: u32,
    pub batch_total: u32,
    /// Append-only
    pub results: Vec<JobResult>,
    /// Append-only
    pub errors: Vec<String>,
}

impl GenerationJob {
    /// A fresh job in the `trends` stage.
    pub fn new(mode: JobMode, keyword: impl Into<String>, batch_total: u32) -> Self {
        Self {
            id: JobId::new(),
            mode,
            stage: JobStage::Trends,
            keyword: keyword.into(),
            started_at: Utc::now(),
            finished_at: None,
            batch_current: 0,
            batch_total,
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Batch completion percentage (0.0 to 100.0)
    pub fn percentage(&self) -> f64 {
        if self.batch_total == 0 {
            100.0
        } else {
            (self.batch_current as f64 / self.batch_total as f64) * 100.0
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

/// Whether a mutation changed the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The job was already terminal.
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job {id} cannot move back from {from} to {to}")]
    BackwardTransition {
        id: JobId,
        from: JobStage,
        to: JobStage,
    },

    #[error("Job {id} batch progress {current} exceeds total {total}")]
    BatchOverflow { id: JobId, current: u32, total: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_is_forward() {
        let order = [
            JobStage::Idle,
            JobStage::Trends,
            JobStage::Benchmark,
            JobStage::Generate,
            JobStage::Done,
        ];
        assert!(order.windows(2).all(|w| w[0].rank() < w[1].rank()));
        assert_eq!(JobStage::Error.rank(), JobStage::Done.rank());
    }

    #[test]
    fn in_flight_excludes_idle_and_terminal() {
        assert!(!JobStage::Idle.is_in_flight());
        assert!(JobStage::Trends.is_in_flight());
        assert!(JobStage::Generate.is_in_flight());
        assert!(!JobStage::Done.is_in_flight());
        assert!(!JobStage::Error.is_in_flight());
    }

    #[test]
    fn new_job_starts_in_trends() {
        let job = GenerationJob::new(JobMode::Batch, "", 3);
        assert_eq!(job.stage, JobStage::Trends);
        assert_eq!(job.batch_current, 0);
        assert_eq!(job.percentage(), 0.0);
        assert!(job.finished_at.is_none());
    }

    #[test]
    fn enums_round_trip_through_strings() {
        assert_eq!("BATCH".parse::<JobMode>(), Ok(JobMode::Batch));
        assert_eq!("benchmark".parse::<JobStage>(), Ok(JobStage::Benchmark));
        assert!("paused".parse::<JobStage>().is_err());
        assert_eq!(
            serde_json::to_string(&JobMode::Manual).unwrap(),
            "\"manual\""
        );
    }
}
