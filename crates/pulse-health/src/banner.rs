//! Degraded-service banner view model.

use pulse_core::ProviderId;
use serde::Serialize;

use crate::status::HealthStatus;
use crate::tracker::HealthSnapshot;

/// Which copy the banner shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    Degraded,
    Unhealthy,
    RateLimited,
}

/// What a client should render for the current health state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBanner {
    pub visible: bool,
    pub kind: Option<BannerKind>,
    pub title: String,
    pub message: String,
    /// Affected providers (not healthy).
    pub providers: Vec<ProviderId>,
}

impl StatusBanner {
    pub fn hidden() -> Self {
        Self {
            visible: false,
            kind: None,
            title: String::new(),
            message: String::new(),
            providers: Vec::new(),
        }
    }

    /// Build the banner for a snapshot.
    ///
    /// Hidden while the global status is healthy. Any unhealthy provider
    /// wins over rate limiting; rate-limited copy is used only when every
    /// affected provider is rate limited.
    pub fn from_snapshot(snapshot: &HealthSnapshot) -> Self {
        if snapshot.global_status == HealthStatus::Healthy {
            return Self::hidden();
        }

        let affected: Vec<_> = snapshot
            .providers
            .iter()
            .filter(|p| !p.is_healthy())
            .collect();
        let providers: Vec<ProviderId> = affected.iter().map(|p| p.provider).collect();
        let names = providers
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let any_unhealthy = affected
            .iter()
            .any(|p| p.status == HealthStatus::Unhealthy);
        let all_rate_limited = !affected.is_empty() && affected.iter().all(|p| p.rate_limited);

        let (kind, title, message) = if any_unhealthy {
            (
                BannerKind::Unhealthy,
                "Service disruption",
                format!("Data from {names} is currently unavailable. Displayed values may be stale."),
            )
        } else if all_rate_limited {
            (
                BannerKind::RateLimited,
                "Rate limit reached",
                format!("Requests to {names} are temporarily throttled. Data will refresh automatically."),
            )
        } else {
            (
                BannerKind::Degraded,
                "Degraded performance",
                format!("{names} is experiencing errors. Some data may be delayed."),
            )
        };

        Self {
            visible: true,
            kind: Some(kind),
            title: title.to_string(),
            message,
            providers,
        }
    }
}
