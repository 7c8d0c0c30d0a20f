//! # Fixed-Window Rate Limiter
//!
//! §4.7: each `(project, bucket)` pair gets a counter that resets every
//! `window` seconds — classic INCR-then-EXPIRE semantics, just kept in a
//! `DashMap` instead of Redis since this workspace has no external cache
//! (§9/D4).

use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: i64 },
}

struct Window {
    count: u32,
    started_at: DateTime<Utc>,
}

/// Fixed-window limiter keyed by an arbitrary caller-chosen string (typically
/// `"{project_id}:{bucket}"`, e.g. `"proj_123:order.evaluate"`).
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    limit: u32,
    window_secs: i64,
}

impl RateLimiter {
    pub fn new(limit: u32, window_secs: i64) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window_secs,
        }
    }

    /// Record one request against `key`, returning whether it's allowed under
    /// the current window.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        let now = Utc::now();
        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            count: 0,
            started_at: now,
        });

        let elapsed = (now - entry.started_at).num_seconds();
        if elapsed >= self.window_secs {
            entry.count = 0;
            entry.started_at = now;
        }

        entry.count += 1;
        if entry.count > self.limit {
            let retry_after_secs = self.window_secs - (now - entry.started_at).num_seconds();
            RateLimitDecision::Limited {
                retry_after_secs: retry_after_secs.max(0),
            }
        } else {
            RateLimitDecision::Allowed {
                remaining: self.limit - entry.count,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_under_the_limit() {
        let limiter = RateLimiter::new(3, 60);
        for _ in 0..3 {
            assert!(matches!(limiter.check("k"), RateLimitDecision::Allowed { .. }));
        }
    }

    #[test]
    fn blocks_requests_over_the_limit() {
        let limiter = RateLimiter::new(2, 60);
        limiter.check("k");
        limiter.check("k");
        assert!(matches!(limiter.check("k"), RateLimitDecision::Limited { .. }));
    }

    #[test]
    fn remaining_decreases_with_each_call() {
        let limiter = RateLimiter::new(5, 60);
        let RateLimitDecision::Allowed { remaining: r1 } = limiter.check("k") else {
            panic!("expected allowed")
        };
        let RateLimitDecision::Allowed { remaining: r2 } = limiter.check("k") else {
            panic!("expected allowed")
        };
        assert_eq!(r1, 4);
        assert_eq!(r2, 3);
    }

    #[test]
    fn separate_keys_have_independent_windows() {
        let limiter = RateLimiter::new(1, 60);
        assert!(matches!(limiter.check("a"), RateLimitDecision::Allowed { .. }));
        assert!(matches!(limiter.check("b"), RateLimitDecision::Allowed { .. }));
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = RateLimiter::new(1, -1);
        assert!(matches!(limiter.check("k"), RateLimitDecision::Allowed { .. }));
        assert!(matches!(limiter.check("k"), RateLimitDecision::Allowed { .. }));
    }
}
