//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed error: {0}")]
    Feed(#[from] pulse_feed::FeedError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] pulse_gateway::GatewayError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] pulse_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
