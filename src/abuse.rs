//! Per-token rate limiting for inbound connections.
//!
//! Grounded on `congress/src/abuse.rs`'s `RateLimiter`/`AbuseConfig`
//! (kept verbatim in spirit: fixed-window counter per key, periodic
//! cleanup). Dropped from the teacher: user-agent/bot sniffing and the
//! browser-header heuristic — those are a live-show-specific concern
//! (§1 scopes authentication and the outer HTTP surface out of the
//! core) with no grounding in this spec. What survives is generic
//! session-level abuse resistance, which §5's "bounded outbound
//! buffers" already treats as an ambient concern this runtime should
//! carry regardless.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;

/// Rate limiter state: a fixed window counter per key.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
    max_requests: u32,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(20, Duration::from_secs(10))
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Returns true if the request for `key` should be allowed.
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        match requests.get_mut(key) {
            Some((count, window_start)) => {
                if now.duration_since(*window_start) >= self.window {
                    *count = 1;
                    *window_start = now;
                    true
                } else if *count >= self.max_requests {
                    false
                } else {
                    *count += 1;
                    true
                }
            }
            None => {
                requests.insert(key.to_string(), (1, now));
                true
            }
        }
    }

    /// Evict entries untouched for two full windows. Call periodically to
    /// bound memory.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window * 2);
    }
}

/// Anti-abuse configuration, env-driven the way
/// `congress/src/abuse.rs::AbuseConfig::from_env` is.
#[derive(Debug, Clone)]
pub struct AbuseConfig {
    pub rate_limiter: Option<RateLimiter>,
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            rate_limiter: Some(RateLimiter::default()),
        }
    }
}

impl AbuseConfig {
    pub fn from_env() -> Self {
        let rate_limit_enabled = std::env::var("ABUSE_RATE_LIMIT")
            .map(|v| v != "0" && v.to_lowercase() != "false")
            .unwrap_or(true);

        let rate_limiter = if rate_limit_enabled {
            let max_requests = std::env::var("ABUSE_RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20);
            let window_secs = std::env::var("ABUSE_RATE_LIMIT_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10);
            Some(RateLimiter::new(
                max_requests,
                Duration::from_secs(window_secs),
            ))
        } else {
            None
        };

        tracing::info!(rate_limit_enabled, "anti-abuse config loaded");
        Self { rate_limiter }
    }

    /// Returns false if `token` (when present) has exceeded its connection
    /// rate. Connections without a token are never rate limited here —
    /// unauthenticated team/watcher joins have no stable key to limit on.
    pub async fn allow(&self, token: Option<&str>) -> bool {
        let Some(limiter) = &self.rate_limiter else {
            return true;
        };
        let Some(token) = token else {
            return true;
        };
        limiter.check(&format!("token:{token}")).await
    }
}

/// Periodically evict stale rate limiter entries so long-lived processes
/// don't accumulate one entry per token forever.
pub fn spawn_rate_limiter_cleanup(abuse_config: Arc<AbuseConfig>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            if let Some(ref limiter) = abuse_config.rate_limiter {
                limiter.cleanup().await;
            }
        }
    });
}
