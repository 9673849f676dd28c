//! Finished-job history
//!
//! The registry lives only as long as the process. The CLI appends each job
//! it ran to `~/.trendpress/jobs.json` so `trendpress jobs` can show past
//! runs. Newest last; the oldest entries drop off past the limit.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use trendpress_ids::JobId;
use trendpress_jobs::GenerationJob;

use crate::store::atomic_write;

pub struct JobHistory {
    path: PathBuf,
    limit: usize,
}

impl JobHistory {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit: limit.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<GenerationJob>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read job history: {}", self.path.display()))?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse job history: {}", self.path.display()))
    }

    /// Record a job, replacing an older entry with the same id.
    pub fn append(&self, job: &GenerationJob) -> Result<()> {
        let mut jobs = self.load()?;
        jobs.retain(|j| j.id != job.id);
        jobs.push(job.clone());
        if jobs.len() > self.limit {
            let excess = jobs.len() - self.limit;
            jobs.drain(..excess);
        }
        self.save(&jobs)
    }

    pub fn find(&self, id: &JobId) -> Result<Option<GenerationJob>> {
        Ok(self.load()?.into_iter().find(|j| &j.id == id))
    }

    /// Remove one job. Returns whether it was present.
    pub fn remove(&self, id: &JobId) -> Result<bool> {
        let mut jobs = self.load()?;
        let before = jobs.len();
        jobs.retain(|j| &j.id != id);
        if jobs.len() == before {
            return Ok(false);
        }
        self.save(&jobs)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<usize> {
        let count = self.load()?.len();
        if count > 0 {
            self.save(&[])?;
        }
        Ok(count)
    }

    fn save(&self, jobs: &[GenerationJob]) -> Result<()> {
        let json = serde_json::to_vec_pretty(jobs)?;
        atomic_write(&self.path, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use trendpress_jobs::JobMode;

    #[test]
    fn test_append_caps_and_keeps_newest() {
        let temp = TempDir::new().unwrap();
        let history = JobHistory::new(temp.path().join("jobs.json"), 2);

        let jobs: Vec<GenerationJob> = (0..3)
            .map(|_| GenerationJob::new(JobMode::Single, "", 1))
            .collect();
        for job in &jobs {
            history.append(job).unwrap();
        }

        let loaded = history.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, jobs[1].id);
        assert_eq!(loaded[1].id, jobs[2].id);
    }

    #[test]
    fn test_append_replaces_same_id() {
        let temp = TempDir::new().unwrap();
        let history = JobHistory::new(temp.path().join("jobs.json"), 10);

        let mut job = GenerationJob::new(JobMode::Batch, "", 2);
        history.append(&job).unwrap();
        job.batch_current = 2;
        history.append(&job).unwrap();

        let loaded = history.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].batch_current, 2);
        assert_eq!(history.find(&job.id).unwrap().unwrap().batch_current, 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let temp = TempDir::new().unwrap();
        let history = JobHistory::new(temp.path().join("jobs.json"), 10);
        let a = GenerationJob::new(JobMode::Single, "", 1);
        let b = GenerationJob::new(JobMode::Manual, "여행", 1);
        history.append(&a).unwrap();
        history.append(&b).unwrap();

        assert!(history.remove(&a.id).unwrap());
        assert!(!history.remove(&a.id).unwrap());
        assert_eq!(history.clear().unwrap(), 1);
        assert!(history.load().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let history = JobHistory::new(temp.path().join("none.json"), 10);
        assert!(history.load().unwrap().is_empty());
        assert_eq!(history.clear().unwrap(), 0);
    }
}
