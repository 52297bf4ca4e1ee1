//! Per-client rate limiting.
//!
//! Implements a sliding-window request counter keyed by client
//! identity. Timestamps older than the window are dropped lazily on
//! each admission check; there is no background sweep and no
//! persistence across restarts. This is best-effort throttling, not a
//! hard quota system.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Rate limit configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Sliding window duration
    pub window: Duration,
    /// Maximum requests per client within the window
    pub max_requests: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 60,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied { reason: String },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

/// Sliding-window rate limiter over all client identities.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether `client_id` may issue a request now.
    ///
    /// On allow, the request timestamp is recorded; on deny, state is
    /// left untouched. An unknown client has zero prior requests.
    pub fn admit(&self, client_id: &str) -> Admission {
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");
        let now = Instant::now();
        let window = windows.entry(client_id.to_string()).or_default();

        // Lazy trim: drop everything older than the window
        window.retain(|t| now.duration_since(*t) < self.config.window);

        if window.len() >= self.config.max_requests {
            return Admission::Denied {
                reason: format!(
                    "client '{}' exceeded {} requests per {}ms",
                    client_id,
                    self.config.max_requests,
                    self.config.window.as_millis()
                ),
            };
        }

        window.push(now);
        Admission::Allowed
    }

    /// Number of requests currently counted against `client_id`.
    pub fn current_count(&self, client_id: &str) -> usize {
        let windows = self.windows.lock().expect("rate limiter lock poisoned");
        let now = Instant::now();
        windows
            .get(client_id)
            .map(|w| {
                w.iter()
                    .filter(|t| now.duration_since(**t) < self.config.window)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Forget all recorded windows.
    pub fn clear(&self) {
        self.windows
            .lock()
            .expect("rate limiter lock poisoned")
            .clear();
    }
}
