//! Revenue-potential ranking of candidate topics.
//!
//! Ranking is a best-effort prioritization signal: a candidate whose estimate
//! cannot be obtained is dropped from the output instead of failing the call.

use chrono::Datelike;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use trendpress_protocol::{
    CandidateTopic, CompetitionLevel, EstimationProvider, KeywordAnalysis, KeywordSignals,
    KeywordType, SearchVolume,
};

use crate::similarity::normalize;

/// CPC at or above this counts as a full CPC score.
pub const CPC_CEILING_USD: f64 = 5.0;
pub const CPC_WEIGHT: f64 = 0.5;
pub const VOLUME_WEIGHT: f64 = 0.3;
pub const COMPETITION_WEIGHT: f64 = 0.2;

const SEASONAL_MARKERS: &[&str] = &[
    "설날", "추석", "크리스마스", "연말", "새해", "여름", "겨울", "봄", "가을", "휴가", "방학",
    "수능", "연말정산", "장마", "christmas", "holiday", "summer", "winter", "spring", "autumn",
    "halloween", "thanksgiving", "black friday", "new year",
];

const CATEGORY_HINTS: &[(&str, &[&str])] = &[
    (
        "finance",
        &["대출", "금리", "적금", "예금", "주식", "보험", "연금", "지원금", "세금", "카드", "loan", "insurance", "tax", "stock", "mortgage"],
    ),
    ("health", &["건강", "다이어트", "병원", "운동", "영양제", "health", "diet", "fitness"]),
    ("tech", &["앱", "ai", "스마트폰", "노트북", "아이폰", "갤럭시", "software", "app", "laptop"]),
    ("travel", &["여행", "항공", "호텔", "숙소", "travel", "flight", "hotel"]),
    ("lifestyle", &["인테리어", "요리", "레시피", "육아", "recipe", "parenting"]),
    ("entertainment", &["드라마", "영화", "예능", "아이돌", "movie", "drama"]),
];

const LONG_TAIL_SUFFIXES: &[&str] = &[" 신청방법", " 조건", " 후기", " 비교"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerConfig {
    /// Estimates in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Trend score at or above which an untyped topic counts as trending.
    #[serde(default = "default_trending_threshold")]
    pub trending_threshold: f64,

    #[serde(default = "default_max_long_tail")]
    pub max_long_tail: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            trending_threshold: default_trending_threshold(),
            max_long_tail: default_max_long_tail(),
        }
    }
}

fn default_max_concurrent() -> usize { 4 }
fn default_trending_threshold() -> f64 { 70.0 }
fn default_max_long_tail() -> usize { 5 }

/// Orders candidate topics by estimated commercial value.
pub struct Ranker {
    estimator: Arc<dyn EstimationProvider>,
    config: RankerConfig,
}

impl Ranker {
    pub fn new(estimator: Arc<dyn EstimationProvider>) -> Self {
        Self::with_config(estimator, RankerConfig::default())
    }

    pub fn with_config(estimator: Arc<dyn EstimationProvider>, config: RankerConfig) -> Self {
        Self { estimator, config }
    }

    /// Estimate every candidate and return analyses, best first.
    ///
    /// Output length may be shorter than the input when estimates fail. Ties
    /// keep their input order.
    pub async fn rank(&self, candidates: &[CandidateTopic]) -> Vec<KeywordAnalysis> {
        let estimator = &self.estimator;
        let estimates: Vec<_> = stream::iter(candidates)
            .map(|topic| async move { (topic, estimator.estimate(topic).await) })
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let mut dropped = 0usize;
        let mut analyses: Vec<KeywordAnalysis> = estimates
            .into_iter()
            .filter_map(|(topic, estimate)| match estimate {
                Ok(signals) => Some(analyze(topic, &signals, &self.config)),
                Err(e) => {
                    dropped += 1;
                    warn!(
                        "Dropping '{}' from ranking: {} estimate failed: {}",
                        topic.keyword,
                        estimator.name(),
                        e
                    );
                    None
                }
            })
            .collect();

        analyses.sort_by(|a, b| b.revenue_potential.total_cmp(&a.revenue_potential));

        info!(
            "Ranked {} candidates ({} dropped)",
            analyses.len(),
            dropped
        );
        if let Some(top) = analyses.first() {
            debug!("Top candidate: '{}' ({:.2})", top.keyword(), top.revenue_potential);
        }
        analyses
    }
}

/// Combine the provider's signals with the topic into an analysis.
pub fn analyze(
    topic: &CandidateTopic,
    signals: &KeywordSignals,
    config: &RankerConfig,
) -> KeywordAnalysis {
    let resolved_type = topic
        .keyword_type
        .unwrap_or_else(|| classify_keyword_type(topic, config.trending_threshold));

    KeywordAnalysis {
        topic: topic.clone(),
        resolved_type,
        estimated_cpc: signals.estimated_cpc,
        competition_level: signals.competition_level,
        search_volume: signals.search_volume,
        revenue_potential: revenue_potential(signals),
        suggested_title: suggest_title(&topic.keyword, resolved_type, topic.fetched_at.year()),
        suggested_category: suggest_category(topic),
        long_tail_variants: long_tail_variants(topic, config.max_long_tail),
    }
}

/// Weighted 0-100 score from CPC, volume, and competition. Pure.
pub fn revenue_potential(signals: &KeywordSignals) -> f64 {
    let cpc = if signals.estimated_cpc.is_finite() {
        signals.estimated_cpc.max(0.0)
    } else {
        0.0
    };
    let cpc_score = (cpc / CPC_CEILING_USD).min(1.0) * 100.0;

    let volume_score = match signals.search_volume {
        SearchVolume::Low => 25.0,
        SearchVolume::Medium => 50.0,
        SearchVolume::High => 75.0,
        SearchVolume::VeryHigh => 100.0,
    };

    let competition_score = match signals.competition_level {
        CompetitionLevel::Low => 100.0,
        CompetitionLevel::Medium => 60.0,
        CompetitionLevel::High => 25.0,
    };

    let score = cpc_score * CPC_WEIGHT
        + volume_score * VOLUME_WEIGHT
        + competition_score * COMPETITION_WEIGHT;
    (score.clamp(0.0, 100.0) * 100.0).round() / 100.0
}

pub fn classify_keyword_type(topic: &CandidateTopic, trending_threshold: f64) -> KeywordType {
    let keyword = topic.keyword.to_lowercase();
    if SEASONAL_MARKERS.iter().any(|m| keyword.contains(m)) {
        KeywordType::Seasonal
    } else if topic.trend_score >= trending_threshold {
        KeywordType::Trending
    } else {
        KeywordType::Evergreen
    }
}

pub fn suggest_title(keyword: &str, keyword_type: KeywordType, year: i32) -> String {
    let keyword = keyword.trim();
    match keyword_type {
        KeywordType::Trending => format!("{} 총정리: 지금 알아야 할 핵심 포인트", keyword),
        KeywordType::Evergreen => format!("{} 완벽 가이드 ({})", keyword, year),
        KeywordType::Seasonal => format!("{} {} 체크리스트와 준비 방법", year, keyword),
    }
}

/// The topic's own category, else one inferred from the keyword.
pub fn suggest_category(topic: &CandidateTopic) -> String {
    let category = topic.category.trim();
    if !category.is_empty() {
        return category.to_string();
    }
    infer_category(&topic.keyword).to_string()
}

pub fn infer_category(keyword: &str) -> &'static str {
    let keyword = keyword.to_lowercase();
    CATEGORY_HINTS
        .iter()
        .find(|(_, hints)| hints.iter().any(|h| keyword.contains(h)))
        .map(|(category, _)| *category)
        .unwrap_or("general")
}

/// Related keywords first, then suffix variants; deduplicated.
pub fn long_tail_variants(topic: &CandidateTopic, max: usize) -> Vec<String> {
    let keyword = topic.keyword.trim();
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(normalize(keyword));

    let suffixed = LONG_TAIL_SUFFIXES
        .iter()
        .map(|suffix| format!("{}{}", keyword, suffix));

    topic
        .related_keywords
        .iter()
        .map(|k| k.trim().to_string())
        .chain(suffixed)
        .filter(|k| {
            let key = normalize(k);
            !key.is_empty() && seen.insert(key)
        })
        .take(max)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use trendpress_protocol::{ProviderError, ProviderResult, SignalSource};

    struct TableEstimator {
        failing: Vec<&'static str>,
    }

    #[async_trait]
    impl EstimationProvider for TableEstimator {
        fn name(&self) -> &str {
            "table"
        }

        async fn estimate(&self, topic: &CandidateTopic) -> ProviderResult<KeywordSignals> {
            if self.failing.contains(&topic.keyword.as_str()) {
                return Err(ProviderError::Unavailable("quota exhausted".to_string()));
            }
            // CPC encoded in trend score so tests can steer ordering
            Ok(KeywordSignals {
                estimated_cpc: topic.trend_score / 20.0,
                competition_level: CompetitionLevel::Medium,
                search_volume: SearchVolume::High,
            })
        }
    }

    fn topic(keyword: &str, score: f64) -> CandidateTopic {
        let mut t = CandidateTopic::new(keyword, SignalSource::GoogleTrends, score);
        t.fetched_at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        t
    }

    #[test]
    fn revenue_potential_extremes() {
        let best = KeywordSignals {
            estimated_cpc: 9.0,
            competition_level: CompetitionLevel::Low,
            search_volume: SearchVolume::VeryHigh,
        };
        assert_eq!(revenue_potential(&best), 100.0);

        let worst = KeywordSignals {
            estimated_cpc: 0.0,
            competition_level: CompetitionLevel::High,
            search_volume: SearchVolume::Low,
        };
        assert_eq!(revenue_potential(&worst), 12.5);
    }

    #[test]
    fn revenue_potential_ignores_nonsense_cpc() {
        let signals = KeywordSignals {
            estimated_cpc: f64::NAN,
            competition_level: CompetitionLevel::Medium,
            search_volume: SearchVolume::Medium,
        };
        assert_eq!(revenue_potential(&signals), 27.0);
    }

    #[tokio::test]
    async fn rank_orders_by_revenue_descending() {
        let ranker = Ranker::new(Arc::new(TableEstimator { failing: vec![] }));
        let input = vec![topic("low", 10.0), topic("high", 90.0), topic("mid", 50.0)];

        let ranked = ranker.rank(&input).await;

        let order: Vec<&str> = ranked.iter().map(|a| a.keyword()).collect();
        assert_eq!(order, vec!["high", "mid", "low"]);
        assert!(ranked
            .windows(2)
            .all(|w| w[0].revenue_potential >= w[1].revenue_potential));
    }

    #[tokio::test]
    async fn rank_drops_failed_estimates_and_keeps_relative_order() {
        let ranker = Ranker::new(Arc::new(TableEstimator { failing: vec!["b"] }));
        let input = vec![
            topic("a", 40.0),
            topic("b", 40.0),
            topic("c", 40.0),
            topic("d", 40.0),
        ];

        let ranked = ranker.rank(&input).await;

        assert_eq!(ranked.len(), input.len() - 1);
        let order: Vec<&str> = ranked.iter().map(|a| a.keyword()).collect();
        assert_eq!(order, vec!["a", "c", "d"]);
    }

    #[tokio::test]
    async fn rank_keeps_topic_association_under_concurrency() {
        let config = RankerConfig {
            max_concurrent: 8,
            ..Default::default()
        };
        let ranker = Ranker::with_config(Arc::new(TableEstimator { failing: vec![] }), config);
        let input: Vec<CandidateTopic> = (0..20)
            .map(|i| topic(&format!("kw{}", i), i as f64 * 5.0))
            .collect();

        let ranked = ranker.rank(&input).await;

        for analysis in &ranked {
            assert_eq!(analysis.estimated_cpc, analysis.topic.trend_score / 20.0);
        }
    }

    #[tokio::test]
    async fn rank_does_not_mutate_input() {
        let ranker = Ranker::new(Arc::new(TableEstimator { failing: vec![] }));
        let input = vec![topic("x", 10.0)];
        let before = input.clone();
        let _ = ranker.rank(&input).await;
        assert_eq!(input, before);
    }

    #[test]
    fn keyword_type_classification() {
        assert_eq!(
            classify_keyword_type(&topic("추석 선물 세트", 20.0), 70.0),
            KeywordType::Seasonal
        );
        assert_eq!(
            classify_keyword_type(&topic("신작 스마트폰", 85.0), 70.0),
            KeywordType::Trending
        );
        assert_eq!(
            classify_keyword_type(&topic("적금 이자 계산", 30.0), 70.0),
            KeywordType::Evergreen
        );
        let typed = topic("적금 이자 계산", 30.0).with_type(KeywordType::Trending);
        let signals = KeywordSignals {
            estimated_cpc: 1.0,
            competition_level: CompetitionLevel::Low,
            search_volume: SearchVolume::Low,
        };
        assert_eq!(
            analyze(&typed, &signals, &RankerConfig::default()).resolved_type,
            KeywordType::Trending
        );
    }

    #[test]
    fn titles_follow_keyword_type() {
        assert_eq!(
            suggest_title("청년 월세 지원", KeywordType::Evergreen, 2026),
            "청년 월세 지원 완벽 가이드 (2026)"
        );
        assert!(suggest_title("x", KeywordType::Seasonal, 2026).starts_with("2026 x"));
    }

    #[test]
    fn category_prefers_topic_then_inference() {
        assert_eq!(suggest_category(&topic("주택담보대출 금리", 10.0)), "finance");
        assert_eq!(suggest_category(&topic("무언가", 10.0)), "general");
        assert_eq!(
            suggest_category(&topic("주택담보대출 금리", 10.0).with_category("housing")),
            "housing"
        );
    }

    #[test]
    fn long_tail_dedups_and_caps() {
        let t = topic("청년 월세", 10.0).with_related(["청년월세", "청년 월세 조건", "월세 환급", ""]);
        let variants = long_tail_variants(&t, 4);
        assert_eq!(
            variants,
            vec![
                "청년 월세 조건".to_string(),
                "월세 환급".to_string(),
                "청년 월세 신청방법".to_string(),
                "청년 월세 후기".to_string(),
            ]
        );
    }
}
