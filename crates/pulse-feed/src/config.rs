//! Upstream market data configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Upstream market data API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout (ms). Default: 10,000.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Sent as a bearer token when set.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Used when a 429 response carries no usable `Retry-After` (ms). Default: 60,000.
    #[serde(default = "default_retry_after_ms")]
    pub default_retry_after_ms: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8090".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_retry_after_ms() -> u64 {
    60_000
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            api_key: None,
            default_retry_after_ms: default_retry_after_ms(),
        }
    }
}
