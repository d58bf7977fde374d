//! Gateway configuration.

use pulse_ratelimit::RateLimitConfig;
use serde::{Deserialize, Serialize};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum concurrent WebSocket health observers.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Subscription status checks per identity. Default: 10 per minute.
    #[serde(default = "default_check_subscription_limit")]
    pub check_subscription_limit: RateLimitConfig,
    /// Checkout session creations per identity. Default: 5 per minute.
    #[serde(default = "default_create_checkout_limit")]
    pub create_checkout_limit: RateLimitConfig,
    /// Allow cross-origin requests from any origin.
    #[serde(default = "default_cors_permissive")]
    pub cors_permissive: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> usize {
    100
}

fn default_check_subscription_limit() -> RateLimitConfig {
    RateLimitConfig::per_minute(10)
}

fn default_create_checkout_limit() -> RateLimitConfig {
    RateLimitConfig::per_minute(5)
}

fn default_cors_permissive() -> bool {
    true
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
            check_subscription_limit: default_check_subscription_limit(),
            create_checkout_limit: default_create_checkout_limit(),
            cors_permissive: default_cors_permissive(),
        }
    }
}

impl GatewayConfig {
    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
