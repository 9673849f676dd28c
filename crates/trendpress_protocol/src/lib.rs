//! Trendpress shared data model.
//!
//! Types that cross crate boundaries live here, together with the async
//! contracts of the external collaborators the pipeline talks to:
//!
//! ```text
//! SignalProvider ──► Ranker ──► DuplicateGuard ──► GenerationProvider ──► LinkInjector ──► ContentStore
//!                      ▲              ▲                                        ▲
//!              EstimationProvider  ContentStore                           ContentStore
//! ```

pub mod content;
pub mod generation;
pub mod providers;
pub mod topic;

pub use content::{
    ContentQuery, ContentStatus, DuplicateCheckResult, InternalLink, NewContent, Recommendation,
    SimilarPost, StoredContentSummary,
};
pub use generation::{GenerationConstraints, GenerationOutput, GenerationRequest};
pub use providers::{
    ContentStore, EstimationProvider, GenerationProvider, ProviderError, ProviderResult,
    SignalProvider,
};
pub use topic::{
    CandidateTopic, CompetitionLevel, KeywordAnalysis, KeywordSignals, KeywordType, SearchVolume,
    SignalSource,
};

pub use trendpress_ids::{ContentId, JobId};
