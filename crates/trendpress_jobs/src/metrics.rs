//! Pipeline counters.
//!
//! Process-wide, lock-free. Cost is accumulated in micro-dollars so it fits
//! an integer atomic.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics instance
pub static PIPELINE_METRICS: PipelineMetrics = PipelineMetrics::new();

pub struct PipelineMetrics {
    // Job counters
    pub jobs_started: AtomicU64,
    pub jobs_completed: AtomicU64,
    pub jobs_failed: AtomicU64,

    // Item counters
    pub items_generated: AtomicU64,
    pub items_failed: AtomicU64,
    pub duplicates_skipped: AtomicU64,

    // Provider accounting
    pub input_tokens: AtomicU64,
    pub output_tokens: AtomicU64,
    pub cost_micro_usd: AtomicU64,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub const fn new() -> Self {
        Self {
            jobs_started: AtomicU64::new(0),
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            items_generated: AtomicU64::new(0),
            items_failed: AtomicU64::new(0),
            duplicates_skipped: AtomicU64::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            cost_micro_usd: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn inc_jobs_started(&self) {
        self.jobs_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a finished job by outcome.
    #[inline]
    pub fn record_job_outcome(&self, success: bool) {
        if success {
            self.jobs_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn inc_items_failed(&self) {
        self.items_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_duplicates_skipped(&self) {
        self.duplicates_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a generated item and its provider usage.
    pub fn record_generation(&self, input_tokens: u64, output_tokens: u64, cost_usd: f64) {
        self.items_generated.fetch_add(1, Ordering::Relaxed);
        self.input_tokens.fetch_add(input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(output_tokens, Ordering::Relaxed);
        let micro = if cost_usd.is_finite() && cost_usd > 0.0 {
            (cost_usd * 1_000_000.0).round() as u64
        } else {
            0
        };
        self.cost_micro_usd.fetch_add(micro, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            jobs_started: self.jobs_started.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            items_generated: self.items_generated.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
            cost_micro_usd: self.cost_micro_usd.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of metrics for reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineMetricsSnapshot {
    pub jobs_started: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub items_generated: u64,
    pub items_failed: u64,
    pub duplicates_skipped: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_micro_usd: u64,
}

impl PipelineMetricsSnapshot {
    pub fn cost_usd(&self) -> f64 {
        self.cost_micro_usd as f64 / 1_000_000.0
    }

    /// Share of attempted items that succeeded (0.0 to 1.0)
    pub fn item_success_rate(&self) -> f64 {
        let attempted = self.items_generated + self.items_failed;
        if attempted == 0 {
            0.0
        } else {
            self.items_generated as f64 / attempted as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_accounting() {
        let metrics = PipelineMetrics::new();
        metrics.record_generation(1200, 3400, 0.0125);
        metrics.record_generation(800, 1600, f64::NAN);
        metrics.inc_items_failed();

        let s = metrics.snapshot();
        assert_eq!(s.items_generated, 2);
        assert_eq!(s.input_tokens, 2000);
        assert_eq!(s.output_tokens, 5000);
        assert_eq!(s.cost_micro_usd, 12_500);
        assert!((s.item_success_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
