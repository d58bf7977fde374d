//! Feed error types.

use pulse_core::CoreError;
use thiserror::Error;

/// Failure reported by a `QuoteSource`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Upstream rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] CoreError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl FeedError {
    /// True if the upstream throttled the request.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Source(SourceError::RateLimited { .. }))
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
