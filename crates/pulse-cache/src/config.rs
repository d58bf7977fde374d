//! Cache configuration.

use serde::{Deserialize, Serialize};

/// TTLs for each market-data category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Live quotes TTL (ms). Default: 30,000 (30 seconds).
    #[serde(default = "default_quote_ttl_ms")]
    pub quote_ttl_ms: u64,
    /// Historical candle series TTL (ms). Default: 300,000 (5 minutes).
    #[serde(default = "default_candle_ttl_ms")]
    pub candle_ttl_ms: u64,
    /// Technical indicator series TTL (ms). Default: 300,000 (5 minutes).
    #[serde(default = "default_technical_ttl_ms")]
    pub technical_ttl_ms: u64,
}

fn default_quote_ttl_ms() -> u64 {
    30_000
}

fn default_candle_ttl_ms() -> u64 {
    300_000
}

fn default_technical_ttl_ms() -> u64 {
    300_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            quote_ttl_ms: default_quote_ttl_ms(),
            candle_ttl_ms: default_candle_ttl_ms(),
            technical_ttl_ms: default_technical_ttl_ms(),
        }
    }
}
