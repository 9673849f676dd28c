//! Job Registry - shared, insertion-ordered job table
//!
//! Every mutation goes through a short critical section; nothing here awaits
//! while the lock is held.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use trendpress_ids::JobId;

use crate::reaper::RetentionAnchor;
use crate::{GenerationJob, JobError, JobMode, JobResult, JobStage, Transition};

/// Cloneable handle to the process-wide job table.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<Vec<GenerationJob>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a job in the `trends` stage. `batch_total` defaults to 1.
    pub fn start(&self, mode: JobMode, keyword: Option<&str>, batch_total: Option<u32>) -> JobId {
        let job = GenerationJob::new(mode, keyword.unwrap_or_default(), batch_total.unwrap_or(1));
        let id = job.id.clone();
        info!(
            "Started {} job {} (batch_total={})",
            job.mode, id, job.batch_total
        );
        self.lock().push(job);
        id
    }

    /// Move the job forward, optionally replacing the displayed keyword.
    ///
    /// Re-entering the current stage only updates the keyword. Entering a
    /// terminal stage stamps `finished_at`.
    pub fn advance_stage(
        &self,
        id: &JobId,
        stage: JobStage,
        keyword: Option<&str>,
    ) -> Result<Transition, JobError> {
        self.mutate(id, |job| {
            if stage.rank() < job.stage.rank() {
                return Err(JobError::BackwardTransition {
                    id: job.id.clone(),
                    from: job.stage,
                    to: stage,
                });
            }
            if let Some(keyword) = keyword {
                job.keyword = keyword.to_string();
            }
            if stage != job.stage {
                debug!("Job {}: {} -> {}", job.id, job.stage, stage);
                job.stage = stage;
                if stage.is_terminal() {
                    job.finished_at = Some(Utc::now());
                }
            }
            Ok(())
        })
    }

    /// Update batch position and keyword without touching the stage.
    pub fn report_batch_progress(
        &self,
        id: &JobId,
        current: u32,
        keyword: &str,
    ) -> Result<Transition, JobError> {
        self.mutate(id, |job| {
            if current > job.batch_total {
                return Err(JobError::BatchOverflow {
                    id: job.id.clone(),
                    current,
                    total: job.batch_total,
                });
            }
            job.batch_current = current;
            job.keyword = keyword.to_string();
            debug!("Job {}: batch {}/{} '{}'", job.id, current, job.batch_total, keyword);
            Ok(())
        })
    }

    pub fn record_result(&self, id: &JobId, result: JobResult) -> Result<Transition, JobError> {
        self.mutate(id, |job| {
            job.results.push(result);
            Ok(())
        })
    }

    pub fn record_error(&self, id: &JobId, message: impl Into<String>) -> Result<Transition, JobError> {
        let message = message.into();
        self.mutate(id, |job| {
            warn!("Job {} error: {}", job.id, message);
            job.errors.push(message);
            Ok(())
        })
    }

    /// Force the job into `done` or `error`.
    pub fn finish(&self, id: &JobId, success: bool) -> Result<Transition, JobError> {
        let stage = if success { JobStage::Done } else { JobStage::Error };
        let outcome = self.mutate(id, |job| {
            job.stage = stage;
            job.finished_at = Some(Utc::now());
            Ok(())
        })?;
        if outcome == Transition::Applied {
            info!("Finished job {}: {}", id, stage);
        }
        Ok(outcome)
    }

    /// Remove one job. Returns whether it existed.
    pub fn dismiss(&self, id: &JobId) -> bool {
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|j| &j.id != id);
        before != jobs.len()
    }

    /// Remove every job. Returns how many were dropped.
    pub fn clear_all(&self) -> usize {
        let mut jobs = self.lock();
        let count = jobs.len();
        jobs.clear();
        count
    }

    pub fn get(&self, id: &JobId) -> Option<GenerationJob> {
        self.lock().iter().find(|j| &j.id == id).cloned()
    }

    /// Snapshot of all jobs in registry order.
    pub fn list(&self) -> Vec<GenerationJob> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// First job, in registry order, that is neither idle nor terminal.
    pub fn active_job(&self) -> Option<GenerationJob> {
        self.lock().iter().find(|j| j.stage.is_in_flight()).cloned()
    }

    /// Drop terminal jobs whose anchor timestamp is at least `retention` old.
    pub fn evict_expired(
        &self,
        now: DateTime<Utc>,
        retention: Duration,
        anchor: RetentionAnchor,
    ) -> Vec<JobId> {
        let mut jobs = self.lock();
        let mut evicted = Vec::new();
        jobs.retain(|job| {
            if !job.stage.is_terminal() {
                return true;
            }
            let from = match anchor {
                RetentionAnchor::StartedAt => job.started_at,
                RetentionAnchor::FinishedAt => job.finished_at.unwrap_or(job.started_at),
            };
            if now - from >= retention {
                evicted.push(job.id.clone());
                false
            } else {
                true
            }
        });
        if !evicted.is_empty() {
            info!("Evicted {} finished jobs", evicted.len());
        }
        evicted
    }

    fn mutate<F>(&self, id: &JobId, apply: F) -> Result<Transition, JobError>
    where
        F: FnOnce(&mut GenerationJob) -> Result<(), JobError>,
    {
        let mut jobs = self.lock();
        let job = jobs
            .iter_mut()
            .find(|j| &j.id == id)
            .ok_or_else(|| JobError::NotFound(id.clone()))?;

        if job.stage.is_terminal() {
            debug!("Ignoring update to finished job {}", id);
            return Ok(Transition::Ignored);
        }

        apply(job)?;
        Ok(Transition::Applied)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<GenerationJob>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    pub(crate) fn with_job_mut(&self, id: &JobId, f: impl FnOnce(&mut GenerationJob)) {
        if let Some(job) = self.lock().iter_mut().find(|j| &j.id == id) {
            f(job);
        }
    }
}
