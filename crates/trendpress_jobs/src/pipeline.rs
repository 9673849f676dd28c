//! End-to-end generation pipeline.
//!
//! Drives one registry job through trend lookup, ranking, duplicate vetting,
//! generation, link injection and storage. Topics are processed one after
//! another; an item failure is recorded on the job and the batch moves on.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use trendpress_ids::JobId;
use trendpress_protocol::{
    CandidateTopic, ContentStatus, ContentStore, EstimationProvider, GenerationConstraints,
    GenerationProvider, GenerationRequest, KeywordAnalysis, NewContent, Recommendation,
    SignalProvider, SignalSource,
};
use trendpress_vetting::links::inject_links_with;
use trendpress_vetting::ranker::analyze;
use trendpress_vetting::{
    DuplicateGuard, DuplicateGuardConfig, HeuristicEstimator, LinkConfig, LinkFinder, Ranker,
    RankerConfig,
};

use crate::metrics::PIPELINE_METRICS;
use crate::prompts::{build_article_prompt, extract_title, slugify};
use crate::registry::JobRegistry;
use crate::{JobError, JobMode, JobResult, JobStage, Transition};

/// Trend score given to operator-supplied keywords.
const MANUAL_TREND_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Topics per batch when the caller does not say.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_inject_links")]
    pub inject_links: bool,

    /// Status of stored drafts.
    #[serde(default)]
    pub content_status: ContentStatus,

    #[serde(default)]
    pub constraints: GenerationConstraints,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            inject_links: default_inject_links(),
            content_status: ContentStatus::default(),
            constraints: GenerationConstraints::default(),
        }
    }
}

fn default_batch_size() -> u32 { 3 }
fn default_inject_links() -> bool { true }

/// External collaborators the pipeline calls.
#[derive(Clone)]
pub struct Collaborators {
    pub signals: Arc<dyn SignalProvider>,
    pub estimator: Arc<dyn EstimationProvider>,
    pub generator: Arc<dyn GenerationProvider>,
    pub store: Arc<dyn ContentStore>,
}

/// A topic that passed duplicate vetting.
struct Selected {
    analysis: KeywordAnalysis,
    /// Existing titles to steer away from
    avoid_titles: Vec<String>,
}

pub struct GenerationPipeline {
    registry: JobRegistry,
    collaborators: Collaborators,
    ranker: Ranker,
    guard: DuplicateGuard,
    links: LinkFinder,
    config: PipelineConfig,
}

impl GenerationPipeline {
    pub fn new(registry: JobRegistry, collaborators: Collaborators) -> Self {
        Self {
            ranker: Ranker::new(collaborators.estimator.clone()),
            guard: DuplicateGuard::new(collaborators.store.clone()),
            links: LinkFinder::new(collaborators.store.clone()),
            registry,
            collaborators,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_ranker_config(mut self, config: RankerConfig) -> Self {
        self.ranker = Ranker::with_config(self.collaborators.estimator.clone(), config);
        self
    }

    pub fn with_duplicate_config(mut self, config: DuplicateGuardConfig) -> Self {
        self.guard = DuplicateGuard::with_config(self.collaborators.store.clone(), config);
        self
    }

    pub fn with_link_config(mut self, config: LinkConfig) -> Self {
        self.links = LinkFinder::with_config(self.collaborators.store.clone(), config);
        self
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn ranker(&self) -> &Ranker {
        &self.ranker
    }

    pub fn guard(&self) -> &DuplicateGuard {
        &self.guard
    }

    pub fn links(&self) -> &LinkFinder {
        &self.links
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Generate one article for an operator-supplied keyword.
    pub async fn run_manual(&self, keyword: &str, category: Option<&str>) -> Result<JobId, JobError> {
        let id = self.registry.start(JobMode::Manual, Some(keyword), Some(1));
        PIPELINE_METRICS.inc_jobs_started();

        let mut topic = CandidateTopic::new(keyword, SignalSource::Manual, MANUAL_TREND_SCORE);
        if let Some(category) = category {
            topic = topic.with_category(category);
        }

        self.registry.advance_stage(&id, JobStage::Benchmark, None)?;
        let analysis = match self.ranker.rank(std::slice::from_ref(&topic)).await.pop() {
            Some(analysis) => analysis,
            None => {
                // estimate failed; fall back to the offline table
                let signals = HeuristicEstimator::signals_for(&topic);
                analyze(&topic, &signals, &RankerConfig::default())
            }
        };

        let selected = self.vet(&id, vec![analysis], 1).await?;
        self.generate_all(&id, selected).await?;
        Ok(id)
    }

    /// Generate one article for the most valuable trending topic.
    pub async fn run_single(&self) -> Result<JobId, JobError> {
        let id = self.registry.start(JobMode::Single, None, Some(1));
        PIPELINE_METRICS.inc_jobs_started();
        self.run_trending(&id, 1).await?;
        Ok(id)
    }

    /// Generate articles for the top `count` trending topics, sequentially.
    pub async fn run_batch(&self, count: Option<u32>) -> Result<JobId, JobError> {
        let count = count.unwrap_or(self.config.batch_size).max(1);
        let id = self.registry.start(JobMode::Batch, None, Some(count));
        PIPELINE_METRICS.inc_jobs_started();
        self.run_trending(&id, count as usize).await?;
        Ok(id)
    }

    async fn run_trending(&self, id: &JobId, want: usize) -> Result<(), JobError> {
        let topics = match self.collaborators.signals.fetch_trends().await {
            Ok(topics) => topics,
            Err(e) => {
                self.registry
                    .record_error(id, format!("Trend signals unavailable: {}", e))?;
                return self.finish(id, false);
            }
        };

        self.registry.advance_stage(id, JobStage::Benchmark, None)?;
        let ranked = self.ranker.rank(&topics).await;
        if ranked.is_empty() {
            self.registry.record_error(id, "No rankable topics")?;
            return self.finish(id, false);
        }

        let selected = self.vet(id, ranked, want).await?;
        self.generate_all(id, selected).await
    }

    /// Walk ranked topics best-first, keeping up to `want` that are not
    /// duplicates of stored content.
    async fn vet(
        &self,
        id: &JobId,
        ranked: Vec<KeywordAnalysis>,
        want: usize,
    ) -> Result<Vec<Selected>, JobError> {
        let mut selected = Vec::with_capacity(want);

        for analysis in ranked {
            if selected.len() >= want {
                break;
            }
            self.registry
                .advance_stage(id, JobStage::Benchmark, Some(analysis.keyword()))?;

            let verdict = self
                .guard
                .check(analysis.keyword(), Some(&analysis.suggested_category))
                .await;

            match verdict.recommendation {
                Recommendation::Skip => {
                    PIPELINE_METRICS.inc_duplicates_skipped();
                    info!(
                        "Skipping '{}': duplicate of '{}'",
                        analysis.keyword(),
                        verdict
                            .similar_posts
                            .first()
                            .map(|p| p.title.as_str())
                            .unwrap_or_default()
                    );
                }
                Recommendation::ModifyAngle => {
                    let avoid_titles = verdict
                        .similar_posts
                        .iter()
                        .map(|p| p.title.clone())
                        .collect();
                    selected.push(Selected {
                        analysis,
                        avoid_titles,
                    });
                }
                Recommendation::Proceed => selected.push(Selected {
                    analysis,
                    avoid_titles: Vec::new(),
                }),
            }
        }

        Ok(selected)
    }

    async fn generate_all(&self, id: &JobId, selected: Vec<Selected>) -> Result<(), JobError> {
        if selected.is_empty() {
            self.registry
                .record_error(id, "Every candidate topic duplicates stored content")?;
            return self.finish(id, false);
        }

        self.registry.advance_stage(id, JobStage::Generate, None)?;

        let mut succeeded = 0usize;
        for (idx, item) in selected.iter().enumerate() {
            let position = (idx + 1) as u32;
            let progress = self
                .registry
                .report_batch_progress(id, position, item.analysis.keyword())?;
            if progress == Transition::Ignored {
                info!("Job {} was finished externally, stopping", id);
                return Ok(());
            }

            if self.generate_one(id, item).await? {
                succeeded += 1;
            }
        }

        self.finish(id, succeeded > 0)
    }

    /// Generate, enrich, and store one article. Returns whether it succeeded.
    async fn generate_one(&self, id: &JobId, item: &Selected) -> Result<bool, JobError> {
        let analysis = &item.analysis;
        let keyword = analysis.keyword();

        let request = GenerationRequest {
            prompt: build_article_prompt(analysis, &item.avoid_titles, &self.config.constraints),
            constraints: self.config.constraints.clone(),
        };

        let output = match self.collaborators.generator.generate(&request).await {
            Ok(output) => output,
            Err(e) => {
                return self.fail_item(
                    id,
                    analysis,
                    format!("{}: {} generation failed: {}", keyword, self.collaborators.generator.name(), e),
                );
            }
        };
        debug!(
            "Generated '{}' ({} in / {} out tokens, {}ms)",
            keyword, output.input_tokens, output.output_tokens, output.latency_ms
        );

        let title = extract_title(&output.text).unwrap_or_else(|| analysis.suggested_title.clone());
        let mut body = output.text;
        if self.config.inject_links {
            let link_config = self.links.config();
            let related = self
                .links
                .find_related(keyword, Some(&analysis.suggested_category), None, link_config.default_limit)
                .await;
            body = inject_links_with(&body, &related, &link_config.style);
        }

        let slug = match slugify(&title) {
            slug if slug.is_empty() => slugify(keyword),
            slug => slug,
        };
        let keywords = std::iter::once(keyword.to_string())
            .chain(analysis.long_tail_variants.iter().cloned())
            .collect();

        let content = NewContent {
            title: title.clone(),
            slug,
            body,
            keywords,
            category_id: Some(analysis.suggested_category.clone()),
            status: self.config.content_status,
        };

        match self.collaborators.store.insert_content(content).await {
            Ok(content_id) => {
                self.registry
                    .record_result(id, JobResult::succeeded(title.as_str(), keyword))?;
                PIPELINE_METRICS.record_generation(
                    output.input_tokens,
                    output.output_tokens,
                    output.cost_usd,
                );
                info!("Stored '{}' as {} (${:.4})", title, content_id, output.cost_usd);
                Ok(true)
            }
            Err(e) => self.fail_item(id, analysis, format!("{}: store failed: {}", keyword, e)),
        }
    }

    fn fail_item(
        &self,
        id: &JobId,
        analysis: &KeywordAnalysis,
        message: String,
    ) -> Result<bool, JobError> {
        warn!("{}", message);
        self.registry.record_error(id, message)?;
        self.registry.record_result(
            id,
            JobResult::failed(analysis.suggested_title.as_str(), analysis.keyword()),
        )?;
        PIPELINE_METRICS.inc_items_failed();
        Ok(false)
    }

    fn finish(&self, id: &JobId, success: bool) -> Result<(), JobError> {
        if self.registry.finish(id, success)? == Transition::Applied {
            PIPELINE_METRICS.record_job_outcome(success);
        }
        Ok(())
    }
}
