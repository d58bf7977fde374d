//! Prometheus metrics and structured logging for Pulse Terminal.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus metrics for cache efficiency, provider health and
//!   rate limiting, exposed in text format for the `/metrics` endpoint

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
