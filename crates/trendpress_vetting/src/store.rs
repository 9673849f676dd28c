//! In-memory content store.
//!
//! Backs tests and the file-based store in the CLI. Rows are kept in
//! insertion order; queries rank relevant rows first, newest first within
//! each group, then truncate to the limit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use trendpress_ids::ContentId;
use trendpress_protocol::{
    ContentQuery, ContentStatus, ContentStore, NewContent, ProviderError, ProviderResult,
    StoredContentSummary,
};

use crate::similarity::{normalize, tokenize};

/// A full content row as held by [`MemoryContentStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredContent {
    pub id: ContentId,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
}

impl StoredContent {
    pub fn summary(&self) -> StoredContentSummary {
        StoredContentSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            slug: self.slug.clone(),
            keywords: self.keywords.clone(),
            category_id: self.category_id.clone(),
        }
    }

    fn matches_hint(&self, query: &ContentQuery) -> bool {
        if let (Some(wanted), Some(have)) = (&query.category_id, &self.category_id) {
            if wanted == have {
                return true;
            }
        }
        let Some(keyword) = query.keyword.as_deref() else {
            return false;
        };
        let needle = normalize(keyword);
        if needle.is_empty() {
            return false;
        }
        let keywords = self.keywords.as_deref().unwrap_or_default();
        if normalize(&self.title).contains(&needle)
            || keywords.iter().any(|k| normalize(k).contains(&needle))
        {
            return true;
        }
        let query_tokens = tokenize(keyword);
        let mut haystack = tokenize(&self.title);
        for k in keywords {
            haystack.extend(tokenize(k));
        }
        !query_tokens.is_disjoint(&haystack)
    }
}

#[derive(Debug, Default)]
pub struct MemoryContentStore {
    rows: Mutex<Vec<StoredContent>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<StoredContent>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    /// Seed published rows from bare summaries.
    pub fn with_published(summaries: impl IntoIterator<Item = StoredContentSummary>) -> Self {
        let now = Utc::now();
        let rows = summaries
            .into_iter()
            .map(|s| StoredContent {
                id: s.id,
                title: s.title,
                slug: s.slug,
                body: String::new(),
                keywords: s.keywords,
                category_id: s.category_id,
                status: ContentStatus::Published,
                created_at: now,
            })
            .collect();
        Self::from_rows(rows)
    }

    /// Copy of every row, insertion order.
    pub fn rows(&self) -> Vec<StoredContent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains_slug(&self, slug: &str) -> bool {
        self.lock().iter().any(|r| r.slug == slug)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredContent>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn select(&self, query: &ContentQuery) -> Vec<StoredContentSummary> {
        let rows = self.lock();
        let mut matching: Vec<(bool, usize, &StoredContent)> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| query.status.map_or(true, |s| row.status == s))
            .map(|(idx, row)| (row.matches_hint(query), idx, row))
            .collect();
        // relevant first, then newest (highest insertion index) first
        matching.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        matching
            .into_iter()
            .take(query.limit)
            .map(|(_, _, row)| row.summary())
            .collect()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn query(&self, query: &ContentQuery) -> ProviderResult<Vec<StoredContentSummary>> {
        Ok(self.select(query))
    }

    async fn insert_content(&self, content: NewContent) -> ProviderResult<ContentId> {
        let mut rows = self.lock();
        if rows.iter().any(|r| r.slug == content.slug) {
            return Err(ProviderError::Provider {
                provider: "memory".to_string(),
                message: format!("slug already exists: {}", content.slug),
            });
        }
        let id = ContentId::generate();
        rows.push(StoredContent {
            id: id.clone(),
            title: content.title,
            slug: content.slug,
            body: content.body,
            keywords: Some(content.keywords),
            category_id: content.category_id,
            status: content.status,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn update_status(&self, id: &ContentId, status: ContentStatus) -> ProviderResult<()> {
        let mut rows = self.lock();
        let row = rows
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| ProviderError::NotFound(format!("content {}", id)))?;
        row.status = status;
        Ok(())
    }
}
