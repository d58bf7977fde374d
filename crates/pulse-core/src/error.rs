//! Error types for pulse-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid cache key part {part:?}: {reason}")]
    InvalidCacheKey { part: String, reason: &'static str },

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
