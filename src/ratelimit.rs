//! Sliding-window admission control for inbound API requests.
//!
//! One owned component with per-client buckets behind a mutex, not ambient
//! module state. Stale timestamps are pruned lazily on the next request from
//! the same client; a client that never returns leaves one small residual
//! entry, which is acceptable for a single-process, modest-traffic service.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window width in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Requests admitted per client per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_requests() -> usize {
    100
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,

    /// Admissions left in the current window (after this request).
    pub remaining: usize,

    /// Seconds until the oldest recorded request leaves the window. Only
    /// meaningful on denial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Point-in-time usage for one client, served by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateLimitStatus {
    pub used: usize,
    pub remaining: usize,
    pub window_secs: u64,
    pub max_requests: usize,
}

/// Sliding-window counter keyed by client identifier.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clients: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    fn window(&self) -> Duration {
        Duration::seconds(self.config.window_secs as i64)
    }

    /// Admission check against an explicit clock, so tests are deterministic.
    ///
    /// Prunes timestamps older than the window, admits if the pruned count is
    /// below the cap, and records the new timestamp on admission only.
    pub fn check_at(&self, client_id: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let cutoff = now - self.window();
        let mut clients = self.clients.lock().expect("rate limiter lock poisoned");
        let history = clients.entry(client_id.to_string()).or_default();

        while history.front().is_some_and(|t| *t <= cutoff) {
            history.pop_front();
        }

        if history.len() < self.config.max_requests {
            history.push_back(now);
            RateLimitDecision {
                allowed: true,
                remaining: self.config.max_requests - history.len(),
                retry_after_secs: None,
            }
        } else {
            let retry_after = history
                .front()
                .map(|oldest| {
                    let wait = (*oldest + self.window()) - now;
                    wait.num_seconds().max(0) as u64 + 1
                })
                .unwrap_or(self.config.window_secs);

            RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after_secs: Some(retry_after),
            }
        }
    }

    pub fn check(&self, client_id: &str) -> RateLimitDecision {
        self.check_at(client_id, Utc::now())
    }

    pub fn is_allowed(&self, client_id: &str) -> bool {
        self.check(client_id).allowed
    }

    /// Current usage without recording a request.
    pub fn status_at(&self, client_id: &str, now: DateTime<Utc>) -> RateLimitStatus {
        let cutoff = now - self.window();
        let clients = self.clients.lock().expect("rate limiter lock poisoned");
        let used = clients
            .get(client_id)
            .map(|history| history.iter().filter(|t| **t > cutoff).count())
            .unwrap_or(0);

        RateLimitStatus {
            used,
            remaining: self.config.max_requests.saturating_sub(used),
            window_secs: self.config.window_secs,
            max_requests: self.config.max_requests,
        }
    }

    pub fn status(&self, client_id: &str) -> RateLimitStatus {
        self.status_at(client_id, Utc::now())
    }
}
