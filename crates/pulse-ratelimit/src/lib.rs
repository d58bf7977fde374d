//! Per-identity fixed-window rate limiting.
//!
//! Each identity gets a window of `window_ms` starting at its first request.
//! Up to `max_requests` requests are allowed inside the window; the rest are
//! denied until the window ends. Denial is a value, never an error.

pub mod config;
pub mod limiter;

pub use config::RateLimitConfig;
pub use limiter::{FixedWindowRateLimiter, RateLimitDecision};
