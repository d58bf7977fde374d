//! Prometheus metrics for Pulse Terminal.
//!
//! Covers:
//! - Cache lookups per category (hit/miss)
//! - Provider health (per-provider status, global status, recorded outcomes)
//! - Rate limiter decisions per endpoint
//! - Upstream fetch latency
//! - Live health observers (WebSocket connections)
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, a fatal configuration error that should
//! crash at startup. These panics only occur during static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, register_int_gauge,
    CounterVec, Encoder, GaugeVec, HistogramVec, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Cache lookups.
/// Labels: category (quotes/candles/technicals), result (hit/miss)
pub static CACHE_LOOKUPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pulse_cache_lookups_total",
        "Total market data cache lookups",
        &["category", "result"]
    )
    .unwrap()
});

/// Provider status (0 = healthy, 1 = degraded, 2 = unhealthy).
pub static PROVIDER_STATUS: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "pulse_provider_status",
        "Provider health status (0=healthy, 1=degraded, 2=unhealthy)",
        &["provider"]
    )
    .unwrap()
});

/// Worst status across all providers.
pub static GLOBAL_STATUS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "pulse_global_status",
        "Worst provider health status (0=healthy, 1=degraded, 2=unhealthy)"
    )
    .unwrap()
});

/// Outcomes recorded by the health tracker.
/// Labels: provider, outcome (success/error/rate_limited)
pub static PROVIDER_OUTCOMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pulse_provider_outcomes_total",
        "Upstream call outcomes recorded per provider",
        &["provider", "outcome"]
    )
    .unwrap()
});

/// Rate limiter decisions.
/// Labels: endpoint, outcome (allowed/denied)
pub static RATE_LIMIT_DECISIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pulse_rate_limit_decisions_total",
        "Per-identity rate limiter decisions",
        &["endpoint", "outcome"]
    )
    .unwrap()
});

/// Upstream fetch latency in milliseconds.
pub static UPSTREAM_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "pulse_upstream_latency_ms",
        "Upstream provider request latency in milliseconds",
        &["provider", "operation"],
        vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Live health observers (WebSocket connections).
pub static HEALTH_OBSERVERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "pulse_health_observers",
        "Connected health status observers"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a cache hit.
    pub fn cache_hit(category: &str) {
        CACHE_LOOKUPS_TOTAL
            .with_label_values(&[category, "hit"])
            .inc();
    }

    /// Record a cache miss.
    pub fn cache_miss(category: &str) {
        CACHE_LOOKUPS_TOTAL
            .with_label_values(&[category, "miss"])
            .inc();
    }

    /// Set a provider's status level.
    pub fn provider_status(provider: &str, level: u8) {
        PROVIDER_STATUS
            .with_label_values(&[provider])
            .set(f64::from(level));
    }

    /// Set the global status level.
    pub fn global_status(level: u8) {
        GLOBAL_STATUS.set(i64::from(level));
    }

    /// Record an outcome reported to the health tracker.
    pub fn provider_outcome(provider: &str, outcome: &str) {
        PROVIDER_OUTCOMES_TOTAL
            .with_label_values(&[provider, outcome])
            .inc();
    }

    /// Record a rate limiter decision.
    pub fn rate_limit_decision(endpoint: &str, allowed: bool) {
        let outcome = if allowed { "allowed" } else { "denied" };
        RATE_LIMIT_DECISIONS_TOTAL
            .with_label_values(&[endpoint, outcome])
            .inc();
    }

    /// Record upstream request latency.
    pub fn upstream_latency(provider: &str, operation: &str, latency_ms: f64) {
        UPSTREAM_LATENCY_MS
            .with_label_values(&[provider, operation])
            .observe(latency_ms);
    }

    /// Health observer connected.
    pub fn observer_connected() {
        HEALTH_OBSERVERS.inc();
    }

    /// Health observer disconnected.
    pub fn observer_disconnected() {
        HEALTH_OBSERVERS.dec();
    }

    /// Encode every registered metric in Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
