//! Trend signals read from a JSON file
//!
//! The file holds an array of records; only `keyword` is required:
//!
//! ```json
//! [{"keyword": "전세 대출 금리", "trend_score": 88, "category": "finance",
//!   "source": "naver", "related_keywords": ["전세 대출 조건"]}]
//! ```
//!
//! A missing or unreadable file reports the provider as unavailable, which
//! lets [`FallbackSignals`](trendpress_jobs::FallbackSignals) take over.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use trendpress_protocol::{
    CandidateTopic, KeywordType, ProviderError, ProviderResult, SignalProvider, SignalSource,
};

#[derive(Debug, Deserialize)]
struct TrendRecord {
    keyword: String,
    #[serde(default = "default_source")]
    source: SignalSource,
    #[serde(default)]
    category: String,
    #[serde(default)]
    trend_score: f64,
    #[serde(default)]
    related_keywords: Vec<String>,
    #[serde(default)]
    fetched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    keyword_type: Option<KeywordType>,
}

fn default_source() -> SignalSource { SignalSource::Manual }

impl TrendRecord {
    fn into_topic(self, now: DateTime<Utc>) -> CandidateTopic {
        let mut topic = CandidateTopic::new(self.keyword.trim(), self.source, self.trend_score)
            .with_category(self.category)
            .with_related(self.related_keywords);
        topic.fetched_at = self.fetched_at.unwrap_or(now);
        topic.keyword_type = self.keyword_type;
        topic
    }
}

pub struct JsonSignalProvider {
    path: PathBuf,
}

impl JsonSignalProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> ProviderResult<Vec<CandidateTopic>> {
        if !self.path.exists() {
            return Err(ProviderError::Unavailable(format!(
                "no trend file at {}",
                self.path.display()
            )));
        }
        let json = std::fs::read_to_string(&self.path)?;
        let records: Vec<TrendRecord> = serde_json::from_str(&json)?;

        let now = Utc::now();
        let topics: Vec<CandidateTopic> = records
            .into_iter()
            .filter(|r| !r.keyword.trim().is_empty())
            .map(|r| r.into_topic(now))
            .collect();
        debug!("Read {} topics from {}", topics.len(), self.path.display());
        Ok(topics)
    }
}

#[async_trait]
impl SignalProvider for JsonSignalProvider {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn fetch_trends(&self) -> ProviderResult<Vec<CandidateTopic>> {
        self.read()
    }
}
