//! Integration tests for batch jobs
//!
//! Exercises the registry contract directly and the full pipeline with
//! in-memory collaborators.

use async_trait::async_trait;
use std::sync::Arc;
use trendpress_jobs::pipeline::Collaborators;
use trendpress_jobs::{
    FallbackSignals, GenerationPipeline, JobMode, JobRegistry, JobResult, JobStage, Transition,
};
use trendpress_protocol::{
    CandidateTopic, ContentStatus, GenerationOutput, GenerationProvider, GenerationRequest,
    ProviderError, ProviderResult, SignalProvider, SignalSource, StoredContentSummary,
};
use trendpress_vetting::{HeuristicEstimator, MemoryContentStore};

struct StaticSignals(Vec<CandidateTopic>);

#[async_trait]
impl SignalProvider for StaticSignals {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_trends(&self) -> ProviderResult<Vec<CandidateTopic>> {
        Ok(self.0.clone())
    }
}

struct DownSignals;

#[async_trait]
impl SignalProvider for DownSignals {
    fn name(&self) -> &str {
        "down"
    }

    async fn fetch_trends(&self) -> ProviderResult<Vec<CandidateTopic>> {
        Err(ProviderError::Unavailable("dns failure".to_string()))
    }
}

/// Writes a sectioned article; fails for keywords listed in `failing`.
struct ScriptedGenerator {
    failing: Vec<&'static str>,
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<GenerationOutput> {
        let keyword = request
            .prompt
            .lines()
            .find_map(|l| l.strip_prefix("Main keyword: "))
            .unwrap_or_default()
            .to_string();
        if self.failing.contains(&keyword.as_str()) {
            return Err(ProviderError::Timeout { after_ms: 120_000 });
        }
        Ok(GenerationOutput {
            text: format!(
                "# {kw} 가이드\n\n## 개요\n설명\n\n## 조건\n내용 1\n내용 2\n내용 3\n\n## 방법\n절차\n\n## 마무리\n끝",
                kw = keyword
            ),
            input_tokens: 100,
            output_tokens: 900,
            cost_usd: 0.01,
            latency_ms: 40,
        })
    }
}

fn topic(keyword: &str, score: f64, category: &str) -> CandidateTopic {
    CandidateTopic::new(keyword, SignalSource::Naver, score).with_category(category)
}

fn published(id: &str, title: &str, keywords: &[&str], category: &str) -> StoredContentSummary {
    StoredContentSummary {
        id: id.into(),
        title: title.to_string(),
        slug: format!("existing-{}", id),
        keywords: Some(keywords.iter().map(|s| s.to_string()).collect()),
        category_id: Some(category.to_string()),
    }
}

fn build(
    signals: Arc<dyn SignalProvider>,
    failing: Vec<&'static str>,
    store: Arc<MemoryContentStore>,
) -> GenerationPipeline {
    GenerationPipeline::new(
        JobRegistry::new(),
        Collaborators {
            signals,
            estimator: Arc::new(HeuristicEstimator::new()),
            generator: Arc::new(ScriptedGenerator { failing }),
            store,
        },
    )
}

#[test]
fn test_batch_progress_contract() {
    let registry = JobRegistry::new();
    let id = registry.start(JobMode::Batch, None, Some(3));
    registry
        .advance_stage(&id, JobStage::Generate, None)
        .unwrap();

    for (n, keyword) in ["a", "b", "c"].iter().enumerate() {
        let current = n as u32 + 1;
        registry.report_batch_progress(&id, current, keyword).unwrap();
        let job = registry.get(&id).unwrap();
        assert!(job.batch_current <= job.batch_total);
        assert_eq!(job.stage, JobStage::Generate);

        registry
            .record_result(&id, JobResult::succeeded(format!("{} 제목", keyword), *keyword))
            .unwrap();
    }
    registry.finish(&id, true).unwrap();

    let job = registry.get(&id).unwrap();
    assert_eq!(job.stage, JobStage::Done);
    assert_eq!(job.results.len(), 3);
    assert_eq!(job.batch_current, 3);
    assert!(job.batch_current <= job.batch_total);
}

#[tokio::test]
async fn test_batch_with_partial_failure_still_done() {
    let store = Arc::new(MemoryContentStore::new());
    let signals = Arc::new(StaticSignals(vec![
        topic("전세 대출 금리", 90.0, "finance"),
        topic("주말 드라마 결말", 60.0, "entertainment"),
        topic("제주 여행 코스", 70.0, "travel"),
    ]));
    let pipeline = build(signals, vec!["제주 여행 코스"], store.clone());

    let id = pipeline.run_batch(Some(3)).await.unwrap();

    let job = pipeline.registry().get(&id).unwrap();
    assert_eq!(job.stage, JobStage::Done);
    assert_eq!(job.batch_total, 3);
    assert_eq!(job.batch_current, 3);
    assert_eq!(job.results.len(), 3);
    assert_eq!(job.succeeded(), 2);
    assert_eq!(job.errors.len(), 1);
    assert!(job.errors[0].contains("제주 여행 코스"));

    // failed keyword is recorded so callers can retry it
    let failed: Vec<&str> = job
        .results
        .iter()
        .filter(|r| !r.success)
        .map(|r| r.keyword.as_str())
        .collect();
    assert_eq!(failed, vec!["제주 여행 코스"]);

    assert_eq!(store.len(), 2);
    assert!(store.rows().iter().all(|r| r.status == ContentStatus::Draft));
}

#[tokio::test]
async fn test_batch_all_failed_is_error() {
    let store = Arc::new(MemoryContentStore::new());
    let signals = Arc::new(StaticSignals(vec![topic("전세 대출 금리", 90.0, "finance")]));
    let pipeline = build(signals, vec!["전세 대출 금리"], store.clone());

    let id = pipeline.run_batch(Some(1)).await.unwrap();

    let job = pipeline.registry().get(&id).unwrap();
    assert_eq!(job.stage, JobStage::Error);
    assert_eq!(job.results, vec![JobResult::failed(job.results[0].title.clone(), "전세 대출 금리")]);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_duplicates_are_skipped_before_generation() {
    let store = Arc::new(MemoryContentStore::with_published(vec![published(
        "1",
        "정부지원금 총정리",
        &["정부지원금 신청방법"],
        "finance",
    )]));
    let signals = Arc::new(StaticSignals(vec![
        topic("정부지원금 신청방법", 95.0, "finance"),
        topic("실손보험 청구", 40.0, "finance"),
    ]));
    let pipeline = build(signals, vec![], store.clone());

    let id = pipeline.run_single().await.unwrap();

    let job = pipeline.registry().get(&id).unwrap();
    assert_eq!(job.stage, JobStage::Done);
    assert_eq!(job.results.len(), 1);
    assert_eq!(job.results[0].keyword, "실손보험 청구");
}

#[tokio::test]
async fn test_generated_draft_links_to_related_posts() {
    let store = Arc::new(MemoryContentStore::with_published(vec![
        published("1", "여행 가방 추천", &["여행 가방"], "travel"),
        published("2", "여행자 보험 비교", &["여행자 보험"], "travel"),
    ]));
    let signals = Arc::new(StaticSignals(vec![topic("제주 여행 코스", 70.0, "travel")]));
    let pipeline = build(signals, vec![], store.clone());

    pipeline.run_single().await.unwrap();

    let draft = store
        .rows()
        .into_iter()
        .find(|r| r.status == ContentStatus::Draft)
        .unwrap();
    assert!(draft.body.contains("(/posts/existing-1)"));
    assert!(draft.body.starts_with("# 제주 여행 코스 가이드"));
}

#[tokio::test]
async fn test_signal_outage_uses_fallback_dataset() {
    let store = Arc::new(MemoryContentStore::new());
    let signals = Arc::new(FallbackSignals::new(Arc::new(DownSignals)));
    let pipeline = build(signals, vec![], store.clone());

    let id = pipeline.run_batch(Some(2)).await.unwrap();

    let job = pipeline.registry().get(&id).unwrap();
    assert_eq!(job.stage, JobStage::Done);
    assert_eq!(job.succeeded(), 2);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_finished_job_stops_batch_progress() {
    let registry = JobRegistry::new();
    let id = registry.start(JobMode::Batch, None, Some(2));
    registry.finish(&id, false).unwrap();

    // later writes from a still-running worker are absorbed
    let late = registry.report_batch_progress(&id, 1, "late").unwrap();
    assert_eq!(late, Transition::Ignored);
    let job = registry.get(&id).unwrap();
    assert_eq!(job.batch_current, 0);
    assert_eq!(job.stage, JobStage::Error);
}
