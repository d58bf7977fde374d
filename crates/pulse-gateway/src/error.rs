//! Gateway error types and their HTTP mapping.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use pulse_core::CoreError;
use pulse_feed::FeedError;
use pulse_ratelimit::RateLimitDecision;
use pulse_telemetry::TelemetryError;
use thiserror::Error;
use tracing::error;

use crate::billing::BillingError;
use crate::types::ErrorBody;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing or invalid credentials")]
    Unauthorized,

    #[error("Rate limit exceeded, retry in {}s", .0.reset_in_secs())]
    RateLimited(RateLimitDecision),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] CoreError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Feed(FeedError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            Self::Feed(e) if e.is_rate_limited() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Feed(_) => StatusCode::BAD_GATEWAY,
            Self::Billing(BillingError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            Self::Billing(_) => StatusCode::BAD_GATEWAY,
            Self::Telemetry(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::RateLimited(_) => "rate_limited",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Feed(FeedError::InvalidRequest(_)) => "invalid_request",
            Self::Feed(e) if e.is_rate_limited() => "upstream_rate_limited",
            Self::Feed(_) => "upstream_error",
            Self::Billing(BillingError::InvalidRequest(_)) => "invalid_request",
            Self::Billing(_) => "billing_error",
            Self::Telemetry(_) | Self::Io(_) => "internal",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        let mut response = (status, Json(body)).into_response();

        if let Self::RateLimited(decision) = &self {
            apply_rate_limit_headers(response.headers_mut(), decision);
        }
        response
    }
}

/// Write the limiter headers for `decision` into `headers`.
pub fn apply_rate_limit_headers(
    headers: &mut axum::http::HeaderMap,
    decision: &RateLimitDecision,
) {
    for (name, value) in decision.headers() {
        // from_bytes lowercases the mixed-case names
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            headers.insert(name, value);
        }
    }
}
