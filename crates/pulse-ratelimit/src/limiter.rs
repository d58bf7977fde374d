//! Fixed-window rate limiter keyed by identity.

use std::borrow::Borrow;
use std::hash::Hash;

use dashmap::DashMap;
use pulse_core::{SharedClock, TimestampMs};
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::RateLimitConfig;

/// Outcome of one `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Time until the window resets (ms).
    pub reset_in_ms: u64,
    pub limit: u32,
}

impl RateLimitDecision {
    /// Seconds until reset, rounded up.
    pub fn reset_in_secs(&self) -> u64 {
        self.reset_in_ms.div_ceil(1000)
    }

    /// Response headers describing this decision.
    ///
    /// `Retry-After` is only present on denial.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let reset = self.reset_in_secs().to_string();
        let mut headers = vec![
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", reset.clone()),
        ];
        if !self.allowed {
            headers.push(("Retry-After", reset));
        }
        headers
    }
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    reset_time: TimestampMs,
}

/// Fixed-window limiter.
///
/// Windows live in a `DashMap`, so concurrent checks for one identity are
/// serialised on its entry while different identities proceed in parallel.
pub struct FixedWindowRateLimiter<K = String>
where
    K: Eq + Hash,
{
    config: RateLimitConfig,
    windows: DashMap<K, RateWindow>,
    clock: SharedClock,
}

impl<K> FixedWindowRateLimiter<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(config: RateLimitConfig, clock: SharedClock) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            clock,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count one request for `identity` and decide whether it may proceed.
    pub fn check<Q>(&self, identity: &Q) -> RateLimitDecision
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        let now = self.clock.now_ms();
        let limit = self.config.max_requests;

        if self.windows.len() > self.config.gc_threshold {
            let purged = self.purge_expired_at(now);
            trace!(purged, "Rate limiter GC");
        }

        let mut window = self
            .windows
            .entry(identity.to_owned())
            .or_insert(RateWindow {
                count: 0,
                reset_time: now,
            });

        if now >= window.reset_time {
            window.count = 0;
            window.reset_time = now.saturating_add(self.config.window_ms);
        }

        // A zero limit denies every request, including the first of a window.
        let reset_in_ms = window.reset_time - now;
        if window.count >= limit {
            debug!(count = window.count, limit, reset_in_ms, "Rate limit exceeded");
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_in_ms,
                limit,
            };
        }

        window.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: limit - window.count,
            reset_in_ms,
            limit,
        }
    }

    /// Drop windows that have ended. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(self.clock.now_ms())
    }

    /// Identities with a stored window, expired or not.
    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }

    fn purge_expired_at(&self, now: TimestampMs) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| now < window.reset_time);
        before.saturating_sub(self.windows.len())
    }
}
