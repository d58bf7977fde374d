//! Health status levels and their derivation.

use pulse_core::TimestampMs;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::HealthConfig;

/// Provider health level, ordered by severity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Numeric level for metrics (0 = healthy, 2 = unhealthy).
    pub fn level(&self) -> u8 {
        match self {
            Self::Healthy => 0,
            Self::Degraded => 1,
            Self::Unhealthy => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status from error history alone.
///
/// Errors only count while the most recent one is inside the error window.
pub fn derive_status(
    error_count: u32,
    last_error_time: Option<TimestampMs>,
    now: TimestampMs,
    config: &HealthConfig,
) -> HealthStatus {
    let Some(last_error) = last_error_time else {
        return HealthStatus::Healthy;
    };
    if now.saturating_sub(last_error) > config.error_window_ms {
        return HealthStatus::Healthy;
    }

    if error_count >= config.error_threshold_unhealthy {
        HealthStatus::Unhealthy
    } else if error_count >= config.error_threshold_degraded {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// Most severe status, `Healthy` for an empty input.
pub fn worst_status<I>(statuses: I) -> HealthStatus
where
    I: IntoIterator<Item = HealthStatus>,
{
    statuses.into_iter().max().unwrap_or_default()
}
