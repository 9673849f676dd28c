//! Control-service facade
//!
//! The single surface a host (CLI, HTTP layer, scheduler) talks to. Job
//! mutations are rate-guarded per client and endpoint; reads and the pure
//! vetting helpers are not. A rate-limited call returns
//! [`Guarded::Limited`] instead of an error.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use trendpress_guard::{EndpointLimit, RateDecision, RateGuard};
use trendpress_ids::JobId;
use trendpress_jobs::{
    spawn_reaper, GenerationJob, GenerationPipeline, JobError, JobMode, JobRegistry, JobResult,
    JobStage, PipelineMetricsSnapshot, ReaperConfig, ReaperHandle, Transition, PIPELINE_METRICS,
};
use trendpress_protocol::{CandidateTopic, DuplicateCheckResult, InternalLink, KeywordAnalysis};
use trendpress_vetting::inject_links_with;

/// Endpoint keys used for rate limiting.
pub mod endpoints {
    /// Starting jobs, directly or through the pipeline
    pub const START_JOB: &str = "jobs.start";
    /// Stage, progress, result, and error updates
    pub const UPDATE_JOB: &str = "jobs.update";
    /// Dismissing or clearing jobs
    pub const DISMISS_JOB: &str = "jobs.dismiss";
}

/// Admissions between sweeps of expired rate windows.
const PURGE_EVERY: u64 = 256;

/// Outcome of a rate-guarded call.
#[derive(Debug, Clone, PartialEq)]
pub enum Guarded<T> {
    Allowed(T),
    Limited(RateDecision),
}

impl<T> Guarded<T> {
    pub fn is_limited(&self) -> bool {
        matches!(self, Guarded::Limited(_))
    }

    pub fn allowed(self) -> Option<T> {
        match self {
            Guarded::Allowed(value) => Some(value),
            Guarded::Limited(_) => None,
        }
    }

    /// Seconds to wait before retrying, when limited.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Guarded::Allowed(_) => None,
            Guarded::Limited(decision) => decision.retry_after_seconds,
        }
    }
}

pub struct ControlService {
    registry: JobRegistry,
    pipeline: Arc<GenerationPipeline>,
    guard: RateGuard,
    limits: BTreeMap<String, EndpointLimit>,
    admissions: AtomicU64,
}

impl ControlService {
    pub fn new(pipeline: GenerationPipeline, limits: BTreeMap<String, EndpointLimit>) -> Self {
        Self {
            registry: pipeline.registry().clone(),
            pipeline: Arc::new(pipeline),
            guard: RateGuard::new(),
            limits,
            admissions: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn pipeline(&self) -> &GenerationPipeline {
        &self.pipeline
    }

    pub fn rate_guard(&self) -> &RateGuard {
        &self.guard
    }

    fn admit(&self, client: &str, endpoint: &str) -> Option<RateDecision> {
        let limit = self.limits.get(endpoint)?;
        let decision = self.guard.check(client, endpoint, limit);
        if (self.admissions.fetch_add(1, Ordering::Relaxed) + 1) % PURGE_EVERY == 0 {
            self.purge_rate_windows(Instant::now());
        }
        if decision.allowed {
            None
        } else {
            Some(decision)
        }
    }

    /// Drop rate windows that have already reset.
    pub fn purge_rate_windows(&self, now: Instant) -> usize {
        let purged = self.guard.purge_expired(now);
        if purged > 0 {
            debug!("Purged {} expired rate windows", purged);
        }
        purged
    }

    fn guarded<T>(
        &self,
        client: &str,
        endpoint: &str,
        op: impl FnOnce() -> Result<T, JobError>,
    ) -> Result<Guarded<T>, JobError> {
        if let Some(decision) = self.admit(client, endpoint) {
            return Ok(Guarded::Limited(decision));
        }
        op().map(Guarded::Allowed)
    }

    // === Job control ===

    pub fn start_job(
        &self,
        client: &str,
        mode: JobMode,
        keyword: Option<&str>,
        batch_total: Option<u32>,
    ) -> Guarded<JobId> {
        if let Some(decision) = self.admit(client, endpoints::START_JOB) {
            return Guarded::Limited(decision);
        }
        let id = self.registry.start(mode, keyword, batch_total);
        PIPELINE_METRICS.inc_jobs_started();
        info!("Client {} started {} job {}", client, mode, id);
        Guarded::Allowed(id)
    }

    pub fn advance_stage(
        &self,
        client: &str,
        id: &JobId,
        stage: JobStage,
        keyword: Option<&str>,
    ) -> Result<Guarded<Transition>, JobError> {
        self.guarded(client, endpoints::UPDATE_JOB, || {
            self.registry.advance_stage(id, stage, keyword)
        })
    }

    pub fn report_batch_progress(
        &self,
        client: &str,
        id: &JobId,
        current: u32,
        keyword: &str,
    ) -> Result<Guarded<Transition>, JobError> {
        self.guarded(client, endpoints::UPDATE_JOB, || {
            self.registry.report_batch_progress(id, current, keyword)
        })
    }

    pub fn record_result(
        &self,
        client: &str,
        id: &JobId,
        result: JobResult,
    ) -> Result<Guarded<Transition>, JobError> {
        self.guarded(client, endpoints::UPDATE_JOB, || {
            self.registry.record_result(id, result)
        })
    }

    pub fn record_error(
        &self,
        client: &str,
        id: &JobId,
        message: impl Into<String>,
    ) -> Result<Guarded<Transition>, JobError> {
        self.guarded(client, endpoints::UPDATE_JOB, || {
            self.registry.record_error(id, message)
        })
    }

    pub fn finish(
        &self,
        client: &str,
        id: &JobId,
        success: bool,
    ) -> Result<Guarded<Transition>, JobError> {
        self.guarded(client, endpoints::UPDATE_JOB, || {
            let transition = self.registry.finish(id, success)?;
            if transition == Transition::Applied {
                PIPELINE_METRICS.record_job_outcome(success);
            }
            Ok(transition)
        })
    }

    /// Remove a job. `Allowed(false)` when the id is unknown.
    pub fn dismiss(&self, client: &str, id: &JobId) -> Guarded<bool> {
        if let Some(decision) = self.admit(client, endpoints::DISMISS_JOB) {
            return Guarded::Limited(decision);
        }
        Guarded::Allowed(self.registry.dismiss(id))
    }

    pub fn clear_jobs(&self, client: &str) -> Guarded<usize> {
        if let Some(decision) = self.admit(client, endpoints::DISMISS_JOB) {
            return Guarded::Limited(decision);
        }
        Guarded::Allowed(self.registry.clear_all())
    }

    pub fn job(&self, id: &JobId) -> Option<GenerationJob> {
        self.registry.get(id)
    }

    pub fn jobs(&self) -> Vec<GenerationJob> {
        self.registry.list()
    }

    pub fn active_job(&self) -> Option<GenerationJob> {
        self.registry.active_job()
    }

    /// Start the background eviction task for this service's registry.
    pub fn spawn_reaper(&self, config: ReaperConfig) -> ReaperHandle {
        spawn_reaper(self.registry.clone(), config)
    }

    // === Pipeline runs ===

    pub async fn run_manual(
        &self,
        client: &str,
        keyword: &str,
        category: Option<&str>,
    ) -> Result<Guarded<JobId>, JobError> {
        if let Some(decision) = self.admit(client, endpoints::START_JOB) {
            return Ok(Guarded::Limited(decision));
        }
        self.pipeline
            .run_manual(keyword, category)
            .await
            .map(Guarded::Allowed)
    }

    pub async fn run_single(&self, client: &str) -> Result<Guarded<JobId>, JobError> {
        if let Some(decision) = self.admit(client, endpoints::START_JOB) {
            return Ok(Guarded::Limited(decision));
        }
        self.pipeline.run_single().await.map(Guarded::Allowed)
    }

    pub async fn run_batch(
        &self,
        client: &str,
        count: Option<u32>,
    ) -> Result<Guarded<JobId>, JobError> {
        if let Some(decision) = self.admit(client, endpoints::START_JOB) {
            return Ok(Guarded::Limited(decision));
        }
        self.pipeline.run_batch(count).await.map(Guarded::Allowed)
    }

    // === Vetting ===

    pub async fn rank_topics(&self, topics: &[CandidateTopic]) -> Vec<KeywordAnalysis> {
        self.pipeline.ranker().rank(topics).await
    }

    pub async fn check_duplicate(&self, keyword: &str, category: Option<&str>) -> DuplicateCheckResult {
        self.pipeline.guard().check(keyword, category).await
    }

    /// Related published posts; `limit` defaults to the configured count.
    pub async fn find_related_links(
        &self,
        keyword: &str,
        category_id: Option<&str>,
        exclude_slug: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<InternalLink> {
        let finder = self.pipeline.links();
        let limit = limit.unwrap_or(finder.config().default_limit);
        debug!("Finding up to {} links for '{}'", limit, keyword);
        finder
            .find_related(keyword, category_id, exclude_slug, limit)
            .await
    }

    /// Insert link blocks using the configured style.
    pub fn inject_links(&self, markdown: &str, links: &[InternalLink]) -> String {
        inject_links_with(markdown, links, &self.pipeline.links().config().style)
    }

    pub fn metrics(&self) -> PipelineMetricsSnapshot {
        PIPELINE_METRICS.snapshot()
    }
}
