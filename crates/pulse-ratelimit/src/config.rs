//! Rate limiter configuration.

use serde::{Deserialize, Serialize};

/// Limits for one endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window. Default: 10.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window length (ms). Default: 60,000 (1 minute).
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// Tracked identity count above which expired windows are swept. Default: 1000.
    #[serde(default = "default_gc_threshold")]
    pub gc_threshold: usize,
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_gc_threshold() -> usize {
    1000
}

impl RateLimitConfig {
    /// `max_requests` per minute with the default GC threshold.
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            ..Self::default()
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
            gc_threshold: default_gc_threshold(),
        }
    }
}
