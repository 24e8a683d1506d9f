//! Windowed admission control
//!
//! Fixed-window counting per (principal, action) key. Backends persist a
//! [`WindowState`] and must read-modify-write it atomically; the transition
//! itself is the pure [`WindowState::advance`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Limits applied to every (principal, action) key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Requests admitted per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_max_requests() -> u32 {
    30
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            enabled: true,
            max_requests,
            window_secs,
        }
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.window_secs as i64)
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Whole seconds to wait, rounded up, never zero when limited
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Allowed { .. } => None,
            Self::Limited { retry_after } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                Some(secs.max(1))
            }
        }
    }
}

/// Persisted counter for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub window_start: DateTime<Utc>,
    pub count: u32,
}

impl WindowState {
    /// Applies one request at `now` to `current`.
    ///
    /// Windows are fixed: one opens at the first request after the previous
    /// window expired and lasts `window_secs`. Returns the state to persist
    /// and the decision. A rejected request does not change the stored state.
    pub fn advance(
        current: Option<WindowState>,
        now: DateTime<Utc>,
        config: &RateLimitConfig,
    ) -> (WindowState, RateLimitDecision) {
        let window = config.window();

        match current {
            Some(state) if now < state.window_start + window => {
                if state.count < config.max_requests {
                    let next = WindowState {
                        window_start: state.window_start,
                        count: state.count + 1,
                    };
                    let remaining = config.max_requests - next.count;
                    (next, RateLimitDecision::Allowed { remaining })
                } else {
                    let retry_after = (state.window_start + window - now)
                        .to_std()
                        .unwrap_or_default();
                    (state, RateLimitDecision::Limited { retry_after })
                }
            }
            _ => {
                if config.max_requests == 0 {
                    let state = WindowState {
                        window_start: now,
                        count: 0,
                    };
                    let retry_after = window.to_std().unwrap_or_default();
                    return (state, RateLimitDecision::Limited { retry_after });
                }

                let next = WindowState {
                    window_start: now,
                    count: 1,
                };
                let remaining = config.max_requests - 1;
                (next, RateLimitDecision::Allowed { remaining })
            }
        }
    }
}

/// Admission gate consumed by the gateway
#[async_trait]
pub trait RateLimiter: Send + Sync + std::fmt::Debug {
    async fn check(&self, principal_id: &str, action: &str) -> Result<RateLimitDecision, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_first_request_opens_window() {
        let config = RateLimitConfig::new(3, 60);
        let (state, decision) = WindowState::advance(None, at(0), &config);

        assert_eq!(state.count, 1);
        assert_eq!(state.window_start, at(0));
        assert_eq!(decision, RateLimitDecision::Allowed { remaining: 2 });
    }

    #[test]
    fn test_request_over_limit_rejected_with_retry_after_within_window() {
        let config = RateLimitConfig::new(2, 60);
        let (s1, _) = WindowState::advance(None, at(0), &config);
        let (s2, d2) = WindowState::advance(Some(s1), at(5), &config);
        assert!(d2.is_allowed());

        let (s3, d3) = WindowState::advance(Some(s2), at(20), &config);

        assert!(!d3.is_allowed());
        assert_eq!(s3, s2);
        assert_eq!(d3.retry_after_secs(), Some(40));
        assert!(d3.retry_after_secs().unwrap() <= config.window_secs);
    }

    #[test]
    fn test_window_resets_after_elapsed() {
        let config = RateLimitConfig::new(1, 60);
        let (s1, _) = WindowState::advance(None, at(0), &config);
        let (_, limited) = WindowState::advance(Some(s1), at(59), &config);
        assert!(!limited.is_allowed());

        let (s2, allowed) = WindowState::advance(Some(s1), at(60), &config);
        assert!(allowed.is_allowed());
        assert_eq!(s2.window_start, at(60));
        assert_eq!(s2.count, 1);
    }

    #[test]
    fn test_window_anchors_at_first_request_after_expiry() {
        let config = RateLimitConfig::new(2, 60);
        let (s1, _) = WindowState::advance(None, at(0), &config);
        let (s2, _) = WindowState::advance(Some(s1), at(50), &config);

        // Nothing carries over from the expired window, and the new one
        // starts at the request rather than at a multiple of the window.
        let (s3, d3) = WindowState::advance(Some(s2), at(75), &config);
        assert_eq!(s3.window_start, at(75));
        assert_eq!(d3, RateLimitDecision::Allowed { remaining: 1 });

        let (s4, d4) = WindowState::advance(Some(s3), at(80), &config);
        assert!(d4.is_allowed());

        let (_, d5) = WindowState::advance(Some(s4), at(134), &config);
        assert_eq!(d5.retry_after_secs(), Some(1));
    }

    #[test]
    fn test_zero_limit_always_rejects() {
        let config = RateLimitConfig::new(0, 30);
        let (_, decision) = WindowState::advance(None, at(0), &config);
        assert_eq!(decision.retry_after_secs(), Some(30));
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let decision = RateLimitDecision::Limited {
            retry_after: Duration::from_millis(1500),
        };
        assert_eq!(decision.retry_after_secs(), Some(2));

        let tiny = RateLimitDecision::Limited {
            retry_after: Duration::ZERO,
        };
        assert_eq!(tiny.retry_after_secs(), Some(1));
    }
}
