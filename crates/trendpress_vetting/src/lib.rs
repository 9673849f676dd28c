//! Vetting stages for candidate topics.
//!
//! - [`ranker`] orders candidates by revenue potential
//! - [`duplicate`] blocks topics already covered by stored content
//! - [`links`] finds related posts and places them in a draft
//!
//! All three read stored content only through the
//! [`ContentStore`](trendpress_protocol::ContentStore) trait and degrade to a
//! permissive answer when it fails.

pub mod duplicate;
pub mod estimator;
pub mod links;
pub mod ranker;
pub mod similarity;
pub mod store;

pub use duplicate::{DuplicateGuard, DuplicateGuardConfig};
pub use estimator::HeuristicEstimator;
pub use links::{inject_links, inject_links_with, LinkConfig, LinkFinder, LinkStyle};
pub use ranker::{revenue_potential, Ranker, RankerConfig};
pub use similarity::{normalize, overlap_similarity, text_similarity, tokenize};
pub use store::{MemoryContentStore, StoredContent};
