//! Duplicate-content guard.
//!
//! Decides whether a candidate keyword overlaps content already in the store.
//! The guard fails open: if the store cannot be read the answer is `proceed`,
//! never a block.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use trendpress_protocol::{
    ContentQuery, ContentStore, DuplicateCheckResult, Recommendation, SimilarPost,
    StoredContentSummary,
};

use crate::similarity::{normalize, overlap_similarity, tokenize};

/// Similarity assigned when title and keyword contain one another.
pub const TITLE_CONTAINMENT_SCORE: f64 = 0.9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGuardConfig {
    /// Rows read per check.
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,

    /// Rows below this are not reported.
    #[serde(default = "default_retain_threshold")]
    pub retain_threshold: f64,

    /// Top score at or above this blocks the topic.
    #[serde(default = "default_skip_threshold")]
    pub skip_threshold: f64,

    #[serde(default = "default_max_similar")]
    pub max_similar: usize,

    #[serde(default = "default_category_bonus")]
    pub category_bonus: f64,

    /// The category bonus only applies above this score.
    #[serde(default = "default_category_bonus_floor")]
    pub category_bonus_floor: f64,
}

impl Default for DuplicateGuardConfig {
    fn default() -> Self {
        Self {
            query_limit: default_query_limit(),
            retain_threshold: default_retain_threshold(),
            skip_threshold: default_skip_threshold(),
            max_similar: default_max_similar(),
            category_bonus: default_category_bonus(),
            category_bonus_floor: default_category_bonus_floor(),
        }
    }
}

fn default_query_limit() -> usize { 500 }
fn default_retain_threshold() -> f64 { 0.5 }
fn default_skip_threshold() -> f64 { 0.8 }
fn default_max_similar() -> usize { 5 }
fn default_category_bonus() -> f64 { 0.1 }
fn default_category_bonus_floor() -> f64 { 0.3 }

pub struct DuplicateGuard {
    store: Arc<dyn ContentStore>,
    config: DuplicateGuardConfig,
}

impl DuplicateGuard {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self::with_config(store, DuplicateGuardConfig::default())
    }

    pub fn with_config(store: Arc<dyn ContentStore>, config: DuplicateGuardConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &DuplicateGuardConfig {
        &self.config
    }

    /// Compare `keyword` against stored content and recommend skip, proceed,
    /// or a new angle.
    pub async fn check(&self, keyword: &str, category: Option<&str>) -> DuplicateCheckResult {
        if normalize(keyword).is_empty() {
            debug!("Duplicate check skipped for blank keyword");
            return DuplicateCheckResult::proceed();
        }

        let query = ContentQuery::new(self.config.query_limit)
            .keyword(keyword)
            .category(category);
        let rows = match self.store.query(&query).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Duplicate check for '{}' failed open: {}", keyword, e);
                return DuplicateCheckResult::proceed();
            }
        };

        let result = evaluate(keyword, category, &rows, &self.config);
        info!(
            "Duplicate check '{}': {} (top {:.2}, {} similar of {} rows)",
            keyword,
            result.recommendation,
            result.top_similarity(),
            result.similar_posts.len(),
            rows.len()
        );
        result
    }
}

/// Pure scoring step of [`DuplicateGuard::check`].
pub fn evaluate(
    keyword: &str,
    category: Option<&str>,
    rows: &[StoredContentSummary],
    config: &DuplicateGuardConfig,
) -> DuplicateCheckResult {
    let needle = normalize(keyword);
    if needle.is_empty() {
        return DuplicateCheckResult::proceed();
    }
    let tokens = tokenize(keyword);

    let mut similar: Vec<SimilarPost> = rows
        .iter()
        .map(|row| SimilarPost {
            id: row.id.clone(),
            title: row.title.clone(),
            slug: row.slug.clone(),
            similarity: row_similarity(&needle, &tokens, category, row, config),
        })
        .filter(|post| post.similarity >= config.retain_threshold)
        .collect();

    similar.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    similar.truncate(config.max_similar);

    let top = similar.first().map(|p| p.similarity).unwrap_or(0.0);
    let recommendation = if top >= config.skip_threshold {
        Recommendation::Skip
    } else if top >= config.retain_threshold {
        Recommendation::ModifyAngle
    } else {
        Recommendation::Proceed
    };

    DuplicateCheckResult {
        is_duplicate: recommendation == Recommendation::Skip,
        similar_posts: similar,
        recommendation,
    }
}

fn row_similarity(
    needle: &str,
    tokens: &std::collections::BTreeSet<String>,
    category: Option<&str>,
    row: &StoredContentSummary,
    config: &DuplicateGuardConfig,
) -> f64 {
    let mut best: f64 = 0.0;

    // stored keyword list
    for stored in row.keywords.iter().flatten() {
        let score = if normalize(stored) == needle {
            1.0
        } else {
            overlap_similarity(tokens, &tokenize(stored))
        };
        best = best.max(score);
    }

    // title
    let title = normalize(&row.title);
    let title_score = if !title.is_empty() && (title.contains(needle) || needle.contains(&title)) {
        TITLE_CONTAINMENT_SCORE
    } else {
        overlap_similarity(tokens, &tokenize(&row.title))
    };
    best = best.max(title_score);

    let same_category = matches!(
        (category, row.category_id.as_deref()),
        (Some(wanted), Some(have)) if wanted == have
    );
    if same_category && best > config.category_bonus_floor {
        best = (best + config.category_bonus).min(1.0);
    }

    best
}
