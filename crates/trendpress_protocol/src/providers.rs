//! External collaborator contracts.
//!
//! Every implementation must be thread-safe; the pipeline holds them as
//! `Arc<dyn Trait>` and calls them from tokio tasks. None of these calls are
//! made while a registry or rate-table lock is held.

use async_trait::async_trait;
use thiserror::Error;
use trendpress_ids::ContentId;

use crate::content::{ContentQuery, ContentStatus, NewContent, StoredContentSummary};
use crate::generation::{GenerationOutput, GenerationRequest};
use crate::topic::{CandidateTopic, KeywordSignals};

/// Failures reported by any external collaborator.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider could not be reached or refused the call
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The call did not finish in time
    #[error("Provider timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Upstream throttling
    #[error("Rate limit exceeded: retry after {retry_after_ms}ms")]
    RateLimit { retry_after_ms: u64 },

    /// The provider answered with something we could not use
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Row or resource missing
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{provider} error: {message}")]
    Provider { provider: String, message: String },
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Source of raw trend signals.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_trends(&self) -> ProviderResult<Vec<CandidateTopic>>;
}

/// Supplies CPC, competition, and volume estimates for a topic.
#[async_trait]
pub trait EstimationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn estimate(&self, topic: &CandidateTopic) -> ProviderResult<KeywordSignals>;
}

/// Turns a prompt into draft text plus token/cost accounting.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<GenerationOutput>;
}

/// Opaque content store. Only single-row atomicity is assumed.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Bounded read; never returns more than `query.limit` rows.
    async fn query(&self, query: &ContentQuery) -> ProviderResult<Vec<StoredContentSummary>>;

    async fn insert_content(&self, content: NewContent) -> ProviderResult<ContentId>;

    async fn update_status(&self, id: &ContentId, status: ContentStatus) -> ProviderResult<()>;
}
