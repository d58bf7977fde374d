//! Application configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults (every field has one)
//! 2. TOML file (optional; missing file logs a warning)
//! 3. Environment: `PULSE__<SECTION>__<KEY>`, e.g. `PULSE__SERVER__PORT=9000`

use std::path::Path;

use pulse_cache::CacheConfig;
use pulse_feed::FeedConfig;
use pulse_gateway::{BillingConfig, GatewayConfig};
use pulse_health::HealthConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, AppResult};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "PULSE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: GatewayConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub billing: BillingConfig,
}

impl AppConfig {
    /// Load `path` (if present) layered under environment overrides.
    pub fn load(path: &str) -> AppResult<Self> {
        let mut builder = config::Config::builder();
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::new(path, config::FileFormat::Toml));
        } else {
            warn!(path = %path, "Config file not found, using defaults");
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without environment overrides.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.health.error_threshold_degraded > self.health.error_threshold_unhealthy {
            return Err(AppError::Config(format!(
                "health.error_threshold_degraded ({}) exceeds error_threshold_unhealthy ({})",
                self.health.error_threshold_degraded, self.health.error_threshold_unhealthy
            )));
        }
        for (name, limit) in [
            ("check_subscription_limit", &self.server.check_subscription_limit),
            ("create_checkout_limit", &self.server.create_checkout_limit),
        ] {
            if limit.max_requests == 0 || limit.window_ms == 0 {
                return Err(AppError::Config(format!(
                    "server.{name} needs max_requests > 0 and window_ms > 0"
                )));
            }
        }
        Ok(())
    }
}
