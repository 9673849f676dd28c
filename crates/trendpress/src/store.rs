//! File-backed content store
//!
//! Keeps every row in memory and rewrites one JSON file after each change.
//! Writes go through a temp file + rename so a crash never leaves a
//! half-written store behind.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;
use trendpress_ids::ContentId;
use trendpress_protocol::{
    ContentQuery, ContentStatus, ContentStore, NewContent, ProviderError, ProviderResult,
    StoredContentSummary,
};
use trendpress_vetting::{MemoryContentStore, StoredContent};

pub struct JsonContentStore {
    path: PathBuf,
    rows: MemoryContentStore,
    /// Serializes snapshot + write so the newest snapshot lands last.
    write_lock: Mutex<()>,
}

impl JsonContentStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows: Vec<StoredContent> = if path.exists() {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read content store: {}", path.display()))?;
            if json.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&json).with_context(|| {
                    format!("Failed to parse content store: {}", path.display())
                })?
            }
        } else {
            Vec::new()
        };

        debug!("Loaded {} content rows from {}", rows.len(), path.display());
        Ok(Self {
            path,
            rows: MemoryContentStore::from_rows(rows),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> Vec<StoredContent> {
        self.rows.rows()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn persist(&self) -> ProviderResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let json = serde_json::to_vec_pretty(&self.rows.rows())?;
        atomic_write(&self.path, &json).map_err(|e| ProviderError::Provider {
            provider: "json-store".to_string(),
            message: format!("{:#}", e),
        })
    }
}

#[async_trait]
impl ContentStore for JsonContentStore {
    async fn query(&self, query: &ContentQuery) -> ProviderResult<Vec<StoredContentSummary>> {
        self.rows.query(query).await
    }

    async fn insert_content(&self, content: NewContent) -> ProviderResult<ContentId> {
        let id = self.rows.insert_content(content).await?;
        self.persist()?;
        Ok(id)
    }

    async fn update_status(&self, id: &ContentId, status: ContentStatus) -> ProviderResult<()> {
        self.rows.update_status(id, status).await?;
        self.persist()
    }
}

/// Atomic write via temp file + rename
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let temp_path = parent.join(format!(".tmp_{}", uuid::Uuid::new_v4()));
    fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn draft(slug: &str) -> NewContent {
        NewContent {
            title: format!("{} 정리", slug),
            slug: slug.to_string(),
            body: "# 본문".to_string(),
            keywords: vec![slug.to_string()],
            category_id: Some("finance".to_string()),
            status: ContentStatus::Draft,
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let temp = TempDir::new().unwrap();
        let store = JsonContentStore::open(temp.path().join("content.json")).unwrap();
        assert!(store.is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_insert_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("content.json");

        let store = JsonContentStore::open(&path).unwrap();
        let id = store.insert_content(draft("loan-rates")).await.unwrap();
        store.update_status(&id, ContentStatus::Published).await.unwrap();

        let reopened = JsonContentStore::open(&path).unwrap();
        let rows = reopened.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].status, ContentStatus::Published);

        // no temp files left next to the store
        let leftovers = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp_"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_failed_insert_does_not_write() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("content.json");
        let store = JsonContentStore::open(&path).unwrap();
        store.insert_content(draft("same")).await.unwrap();
        let before = fs::read_to_string(&path).unwrap();

        assert!(store.insert_content(draft("same")).await.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("content.json");
        fs::write(&path, "{not json").unwrap();

        let err = JsonContentStore::open(&path).err().unwrap();
        assert!(format!("{:#}", err).contains("Failed to parse content store"));
    }
}
