//! Health tracker configuration.

use serde::{Deserialize, Serialize};

/// Thresholds and windows for provider health derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Error count at which a provider becomes degraded. Default: 2.
    #[serde(default = "default_error_threshold_degraded")]
    pub error_threshold_degraded: u32,
    /// Error count at which a provider becomes unhealthy. Default: 5.
    #[serde(default = "default_error_threshold_unhealthy")]
    pub error_threshold_unhealthy: u32,
    /// Errors older than this no longer affect status (ms). Default: 300,000 (5 minutes).
    #[serde(default = "default_error_window_ms")]
    pub error_window_ms: u64,
    /// Quiet time after a success before errors are forgiven (ms). Default: 120,000 (2 minutes).
    #[serde(default = "default_recovery_time_ms")]
    pub recovery_time_ms: u64,
    /// Background sweep interval (ms). Default: 30,000 (30 seconds).
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// Buffered change notifications per observer. Default: 64.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_error_threshold_degraded() -> u32 {
    2
}

fn default_error_threshold_unhealthy() -> u32 {
    5
}

fn default_error_window_ms() -> u64 {
    300_000
}

fn default_recovery_time_ms() -> u64 {
    120_000
}

fn default_sweep_interval_ms() -> u64 {
    30_000
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            error_threshold_degraded: default_error_threshold_degraded(),
            error_threshold_unhealthy: default_error_threshold_unhealthy(),
            error_window_ms: default_error_window_ms(),
            recovery_time_ms: default_recovery_time_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}
