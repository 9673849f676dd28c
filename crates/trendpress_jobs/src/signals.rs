//! Signal provider with a built-in fallback dataset.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use trendpress_protocol::{CandidateTopic, KeywordType, ProviderResult, SignalProvider, SignalSource};

/// Serves the primary provider's topics, or a fallback list when it fails or
/// comes back empty. Never returns an error.
pub struct FallbackSignals {
    primary: Arc<dyn SignalProvider>,
    fallback: Vec<CandidateTopic>,
}

impl FallbackSignals {
    pub fn new(primary: Arc<dyn SignalProvider>) -> Self {
        Self::with_fallback(primary, fallback_trends())
    }

    pub fn with_fallback(primary: Arc<dyn SignalProvider>, fallback: Vec<CandidateTopic>) -> Self {
        Self { primary, fallback }
    }

    fn fallback_now(&self) -> Vec<CandidateTopic> {
        let now = Utc::now();
        self.fallback
            .iter()
            .cloned()
            .map(|mut topic| {
                topic.source = SignalSource::Fallback;
                topic.fetched_at = now;
                topic
            })
            .collect()
    }
}

#[async_trait]
impl SignalProvider for FallbackSignals {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn fetch_trends(&self) -> ProviderResult<Vec<CandidateTopic>> {
        match self.primary.fetch_trends().await {
            Ok(topics) if !topics.is_empty() => {
                info!("Fetched {} trends from {}", topics.len(), self.primary.name());
                Ok(topics)
            }
            Ok(_) => {
                warn!(
                    "{} returned no trends, serving {} fallback topics",
                    self.primary.name(),
                    self.fallback.len()
                );
                Ok(self.fallback_now())
            }
            Err(e) => {
                warn!(
                    "{} unavailable ({}), serving {} fallback topics",
                    self.primary.name(),
                    e,
                    self.fallback.len()
                );
                Ok(self.fallback_now())
            }
        }
    }
}

/// Evergreen and seasonal topics that are safe to write about any time.
pub fn fallback_trends() -> Vec<CandidateTopic> {
    let source = SignalSource::Fallback;
    vec![
        CandidateTopic::new("정부지원금 신청방법", source, 72.0)
            .with_category("finance")
            .with_related(["정부지원금 조회", "지원금 자격 조건"])
            .with_type(KeywordType::Evergreen),
        CandidateTopic::new("청년 월세 지원", source, 68.0)
            .with_category("finance")
            .with_related(["청년 월세 특별지원", "월세 지원 자격"])
            .with_type(KeywordType::Evergreen),
        CandidateTopic::new("연말정산 환급", source, 64.0)
            .with_category("finance")
            .with_related(["연말정산 공제 항목", "연말정산 기간"])
            .with_type(KeywordType::Seasonal),
        CandidateTopic::new("실손보험 청구", source, 55.0)
            .with_category("finance")
            .with_related(["실손보험 청구 서류"]),
        CandidateTopic::new("겨울 전기요금 절약", source, 48.0)
            .with_category("lifestyle")
            .with_type(KeywordType::Seasonal),
        CandidateTopic::new("해외여행 환전 팁", source, 44.0).with_category("travel"),
    ]
}
