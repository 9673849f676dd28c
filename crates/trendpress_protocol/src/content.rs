//! Stored content projections and the results computed against them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use trendpress_ids::ContentId;

/// Publication state of a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    #[default]
    Draft,
    Review,
    Published,
    Archived,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Review => "review",
            ContentStatus::Published => "published",
            ContentStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(ContentStatus::Draft),
            "review" => Ok(ContentStatus::Review),
            "published" => Ok(ContentStatus::Published),
            "archived" => Ok(ContentStatus::Archived),
            _ => Err(format!(
                "Invalid content status: '{}'. Expected: draft, review, published, or archived",
                s
            )),
        }
    }
}

/// Read-only projection of a content row owned by the external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredContentSummary {
    pub id: ContentId,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub category_id: Option<String>,
}

/// Bounded read against the content store.
///
/// `keyword` and `category_id` are relevance hints: stores rank matching rows
/// first but are not required to exclude the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentQuery {
    pub keyword: Option<String>,
    pub category_id: Option<String>,
    pub status: Option<ContentStatus>,
    pub limit: usize,
}

impl ContentQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn category(mut self, category_id: Option<&str>) -> Self {
        self.category_id = category_id.map(str::to_string);
        self
    }

    pub fn status(mut self, status: ContentStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// A row to be written by the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContent {
    pub title: String,
    pub slug: String,
    pub body: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub status: ContentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Skip,
    Proceed,
    ModifyAngle,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Skip => "skip",
            Recommendation::Proceed => "proceed",
            Recommendation::ModifyAngle => "modify_angle",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarPost {
    pub id: ContentId,
    pub title: String,
    pub slug: String,
    /// 0.0-1.0
    pub similarity: f64,
}

/// Outcome of a duplicate check. Computed per call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheckResult {
    pub is_duplicate: bool,
    /// Descending by similarity, at most five entries.
    pub similar_posts: Vec<SimilarPost>,
    pub recommendation: Recommendation,
}

impl DuplicateCheckResult {
    /// The permissive answer used whenever the check cannot be computed.
    pub fn proceed() -> Self {
        Self {
            is_duplicate: false,
            similar_posts: Vec::new(),
            recommendation: Recommendation::Proceed,
        }
    }

    pub fn top_similarity(&self) -> f64 {
        self.similar_posts.first().map(|p| p.similarity).unwrap_or(0.0)
    }
}

/// A stored row chosen as a cross-reference target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalLink {
    pub content_id: ContentId,
    pub title: String,
    pub slug: String,
    pub relevance_score: f64,
}
