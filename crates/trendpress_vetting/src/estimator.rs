//! Offline estimation provider.
//!
//! Used when no keyword-planner integration is configured. The numbers are a
//! coarse category table, not market data.

use async_trait::async_trait;
use trendpress_protocol::{
    CandidateTopic, CompetitionLevel, EstimationProvider, KeywordSignals, ProviderError,
    ProviderResult, SearchVolume,
};

use crate::ranker::infer_category;

/// Baseline CPC (USD) per inferred category.
const CATEGORY_CPC: &[(&str, f64)] = &[
    ("finance", 3.2),
    ("health", 1.8),
    ("tech", 1.5),
    ("travel", 1.2),
    ("lifestyle", 0.8),
    ("entertainment", 0.4),
];
const DEFAULT_CPC: f64 = 0.6;

/// Derives signals from the topic itself: category → CPC, trend score →
/// volume, related-keyword breadth → competition.
#[derive(Debug, Default, Clone)]
pub struct HeuristicEstimator;

impl HeuristicEstimator {
    pub fn new() -> Self {
        Self
    }

    pub fn signals_for(topic: &CandidateTopic) -> KeywordSignals {
        let category = CATEGORY_CPC
            .iter()
            .map(|(name, _)| *name)
            .find(|name| topic.category.trim().eq_ignore_ascii_case(name))
            .unwrap_or_else(|| infer_category(&topic.keyword));
        let base_cpc = CATEGORY_CPC
            .iter()
            .find(|(name, _)| *name == category)
            .map(|(_, cpc)| *cpc)
            .unwrap_or(DEFAULT_CPC);
        // Hot topics draw more bidders.
        let estimated_cpc = base_cpc * (1.0 + topic.trend_score / 200.0);

        let search_volume = match topic.trend_score {
            s if s >= 85.0 => SearchVolume::VeryHigh,
            s if s >= 65.0 => SearchVolume::High,
            s if s >= 40.0 => SearchVolume::Medium,
            _ => SearchVolume::Low,
        };

        let breadth = topic.related_keywords.len();
        let mut competition_level = match breadth {
            n if n >= 8 => CompetitionLevel::High,
            n if n >= 4 => CompetitionLevel::Medium,
            _ => CompetitionLevel::Low,
        };
        if category == "finance" && competition_level == CompetitionLevel::Low {
            competition_level = CompetitionLevel::Medium;
        }

        KeywordSignals {
            estimated_cpc: (estimated_cpc * 100.0).round() / 100.0,
            competition_level,
            search_volume,
        }
    }
}

#[async_trait]
impl EstimationProvider for HeuristicEstimator {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn estimate(&self, topic: &CandidateTopic) -> ProviderResult<KeywordSignals> {
        if topic.keyword.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "cannot estimate an empty keyword".to_string(),
            ));
        }
        Ok(Self::signals_for(topic))
    }
}
