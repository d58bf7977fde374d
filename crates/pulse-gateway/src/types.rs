//! Gateway API types.

use pulse_cache::CacheStats;
use pulse_health::{HealthSnapshot, StatusBanner};
use serde::{Deserialize, Serialize};

/// Health state plus the banner a client should render for it.
#[derive(Debug, Clone, Serialize)]
pub struct HealthView {
    pub snapshot: HealthSnapshot,
    pub banner: StatusBanner,
}

impl From<HealthSnapshot> for HealthView {
    fn from(snapshot: HealthSnapshot) -> Self {
        let banner = StatusBanner::from_snapshot(&snapshot);
        Self { snapshot, banner }
    }
}

/// Messages pushed to WebSocket health observers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HealthMessage {
    /// Full state (sent on connect).
    Snapshot(HealthView),
    /// State after one mutation.
    Update(HealthView),
}

#[derive(Debug, Deserialize)]
pub struct QuotesQuery {
    /// Comma-separated symbols.
    pub symbols: String,
}

impl QuotesQuery {
    pub fn symbols(&self) -> Vec<&str> {
        self.symbols
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct CandlesQuery {
    pub timeframe: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub symbol: String,
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub cleared: CacheStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}
