//! Process-local fixed-window rate limiter

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::rate_limit::{RateLimitConfig, RateLimitDecision, RateLimiter, WindowState};
use crate::domain::DomainError;

#[derive(Debug)]
struct Windows {
    by_key: HashMap<(String, String), WindowState>,
    last_cleanup: Instant,
}

/// Rate limiter keeping one window per (principal, action) behind a mutex
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    windows: Mutex<Windows>,
    cleanup_interval: Duration,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(Windows {
                by_key: HashMap::new(),
                last_cleanup: Instant::now(),
            }),
            cleanup_interval: Duration::from_secs(300),
        }
    }

    /// Admission check at an explicit instant
    pub async fn check_at(
        &self,
        principal_id: &str,
        action: &str,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        if !self.config.enabled {
            return RateLimitDecision::Allowed {
                remaining: self.config.max_requests,
            };
        }

        let mut windows = self.windows.lock().await;
        self.maybe_cleanup(&mut windows, now);

        let key = (principal_id.to_string(), action.to_string());
        let current = windows.by_key.get(&key).copied();
        let (next, decision) = WindowState::advance(current, now, &self.config);
        windows.by_key.insert(key, next);

        decision
    }

    fn maybe_cleanup(&self, windows: &mut Windows, now: DateTime<Utc>) {
        if windows.last_cleanup.elapsed() < self.cleanup_interval {
            return;
        }

        let window = self.config.window();
        windows.by_key.retain(|_, state| now < state.window_start + window);
        windows.last_cleanup = Instant::now();
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, principal_id: &str, action: &str) -> Result<RateLimitDecision, DomainError> {
        Ok(self.check_at(principal_id, action, Utc::now()).await)
    }
}
