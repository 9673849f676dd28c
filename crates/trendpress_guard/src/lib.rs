//! Access-rate guard.
//!
//! Fixed-window counters keyed by `(endpoint, client)`. The first request in
//! a fresh window opens it; requests are admitted until the count reaches
//! `max`, then denied with a retry hint until the window elapses. Bursts at
//! window boundaries are admitted.
//!
//! A denial is an ordinary [`RateDecision`], not an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Counter state for one `(endpoint, client)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindowEntry {
    pub count: u32,
    pub reset_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    pub allowed: bool,
    /// Whole seconds until the window resets; set only on denial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl RateDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after_seconds: None,
        }
    }

    pub fn denied(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after_seconds: Some(ceil_seconds(retry_after)),
        }
    }
}

/// Per-endpoint limit as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointLimit {
    pub max: u32,
    pub window_ms: u64,
}

impl EndpointLimit {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window_ms: window.as_millis().min(u64::MAX as u128) as u64,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[derive(Debug, Default)]
pub struct RateGuard {
    windows: Mutex<HashMap<(String, String), RateWindowEntry>>,
}

impl RateGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request from `client` against `endpoint`.
    pub fn allow(&self, client: &str, endpoint: &str, max: u32, window: Duration) -> RateDecision {
        self.allow_at(client, endpoint, max, window, Instant::now())
    }

    /// [`allow`](Self::allow) with a configured limit.
    pub fn check(&self, client: &str, endpoint: &str, limit: &EndpointLimit) -> RateDecision {
        self.allow(client, endpoint, limit.max, limit.window())
    }

    /// [`allow`](Self::allow) evaluated at an explicit instant.
    pub fn allow_at(
        &self,
        client: &str,
        endpoint: &str,
        max: u32,
        window: Duration,
        now: Instant,
    ) -> RateDecision {
        if max == 0 {
            return RateDecision::denied(window);
        }

        let mut windows = self.lock();
        let key = (endpoint.to_string(), client.to_string());

        match windows.get_mut(&key) {
            Some(entry) if now < entry.reset_at => {
                if entry.count >= max {
                    let remaining = entry.reset_at - now;
                    warn!(
                        "Rate limit exceeded for {} on {} ({} in window)",
                        client, endpoint, entry.count
                    );
                    return RateDecision::denied(remaining);
                }
                entry.count += 1;
            }
            Some(entry) => {
                entry.count = 1;
                entry.reset_at = now + window;
            }
            None => {
                debug!("Opening rate window for {} on {}", client, endpoint);
                windows.insert(
                    key,
                    RateWindowEntry {
                        count: 1,
                        reset_at: now + window,
                    },
                );
            }
        }

        RateDecision::allowed()
    }

    /// Drop windows that have already reset. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, entry| now < entry.reset_at);
        before - windows.len()
    }

    pub fn entry(&self, client: &str, endpoint: &str) -> Option<RateWindowEntry> {
        self.lock()
            .get(&(endpoint.to_string(), client.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, String), RateWindowEntry>> {
        self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn ceil_seconds(d: Duration) -> u64 {
    let millis = d.as_millis().min(u64::MAX as u128) as u64;
    millis.div_ceil(1000)
}
