//! Millisecond time sources.
//!
//! Every time-based decision (TTL expiry, health windows, rate-limit
//! windows) reads the current time through [`Clock`], so tests can drive
//! time explicitly with [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unix timestamp in milliseconds.
pub type TimestampMs = u64;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current Unix time in milliseconds.
    fn now_ms(&self) -> TimestampMs;
}

/// Clock shared between components.
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    /// Shared handle to the wall clock.
    pub fn shared() -> SharedClock {
        Arc::new(SystemClock)
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> TimestampMs {
        // Pre-epoch system time is clamped to zero.
        chrono::Utc::now().timestamp_millis().max(0) as TimestampMs
    }
}

/// Manually advanced clock for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: TimestampMs) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    /// Move time forward by `delta_ms`.
    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set(&self, now_ms: TimestampMs) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> TimestampMs {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> TimestampMs {
        (**self).now_ms()
    }
}
