//! Provider Health Tracker.
//!
//! Tracks success/error/rate-limit outcomes per provider and derives a
//! three-level status with hysteresis:
//! - Errors accumulate; status is derived from the count while the last
//!   error is inside the error window
//! - Each success forgives exactly one error
//! - A rate limit forces `degraded` until its reset time passes
//! - The periodic sweep decays stale errors, resets providers that have
//!   been quiet since a success, and clears expired rate limits
//!
//! Every mutation publishes one `HealthSnapshot` to subscribers. The
//! snapshot is built and sent while the state lock is held, so observers
//! see mutations in order and never a partially-applied update.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use pulse_core::{ProviderId, SharedClock, TimestampMs};
use pulse_telemetry::Metrics;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::HealthConfig;
use crate::status::{derive_status, worst_status, HealthStatus};

/// Health record for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub provider: ProviderId,
    pub status: HealthStatus,
    pub error_count: u32,
    pub last_error: Option<String>,
    pub last_error_time: Option<TimestampMs>,
    pub last_success_time: Option<TimestampMs>,
    pub rate_limited: bool,
    pub rate_limit_reset_time: Option<TimestampMs>,
}

impl ProviderHealth {
    fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            status: HealthStatus::Healthy,
            error_count: 0,
            last_error: None,
            last_error_time: None,
            last_success_time: None,
            rate_limited: false,
            rate_limit_reset_time: None,
        }
    }

    /// Status from stored fields at `now`. Rate limiting forces `Degraded`.
    pub fn effective_status(&self, now: TimestampMs, config: &HealthConfig) -> HealthStatus {
        if self.rate_limited {
            return HealthStatus::Degraded;
        }
        derive_status(self.error_count, self.last_error_time, now, config)
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    /// The record as a sweep at `now` would leave it.
    fn swept(&self, now: TimestampMs, config: &HealthConfig) -> Self {
        let mut next = self.clone();

        if let (Some(success), Some(error)) = (next.last_success_time, next.last_error_time) {
            if success > error && now.saturating_sub(success) > config.recovery_time_ms {
                next.error_count = 0;
            }
        }

        if let Some(error) = next.last_error_time {
            if now.saturating_sub(error) > config.error_window_ms && next.error_count > 0 {
                next.error_count -= 1;
            }
        }

        if next.rate_limited && next.rate_limit_reset_time.is_some_and(|t| now >= t) {
            next.rate_limited = false;
            next.rate_limit_reset_time = None;
        }

        next.status = next.effective_status(now, config);
        next
    }
}

/// Consistent view of every provider at one point in time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    /// Increases by one with every published mutation.
    pub sequence: u64,
    pub timestamp_ms: TimestampMs,
    pub global_status: HealthStatus,
    pub providers: Vec<ProviderHealth>,
}

impl HealthSnapshot {
    pub fn provider(&self, provider: ProviderId) -> Option<&ProviderHealth> {
        self.providers.iter().find(|p| p.provider == provider)
    }

    /// Providers whose status is not healthy.
    pub fn degraded_providers(&self) -> Vec<ProviderId> {
        self.providers
            .iter()
            .filter(|p| !p.is_healthy())
            .map(|p| p.provider)
            .collect()
    }

    pub fn rate_limited_providers(&self) -> Vec<ProviderId> {
        self.providers
            .iter()
            .filter(|p| p.rate_limited)
            .map(|p| p.provider)
            .collect()
    }
}

struct TrackerState {
    providers: BTreeMap<ProviderId, ProviderHealth>,
    global_status: HealthStatus,
    sequence: u64,
}

impl TrackerState {
    fn record_mut(&mut self, provider: ProviderId) -> &mut ProviderHealth {
        self.providers
            .entry(provider)
            .or_insert_with(|| ProviderHealth::new(provider))
    }

    /// Recompute the global status. Returns true if it changed.
    fn recompute_global(&mut self) -> bool {
        let global = worst_status(self.providers.values().map(|p| p.status));
        if global == self.global_status {
            return false;
        }
        info!(from = %self.global_status, to = %global, "Global health status changed");
        self.global_status = global;
        Metrics::global_status(global.level());
        true
    }
}

/// Process-wide aggregator of provider outcomes.
///
/// Construct once at startup and share via `Arc`. Thread-safe: every
/// operation, including queries, takes the state mutex.
pub struct ProviderHealthTracker {
    config: HealthConfig,
    clock: SharedClock,
    state: Mutex<TrackerState>,
    events: broadcast::Sender<HealthSnapshot>,
}

impl ProviderHealthTracker {
    /// Create a tracker with every known provider healthy.
    pub fn new(config: HealthConfig, clock: SharedClock) -> Self {
        let providers = ProviderId::ALL
            .iter()
            .map(|&p| (p, ProviderHealth::new(p)))
            .collect();
        let (events, _) = broadcast::channel(config.channel_capacity.max(1));

        for provider in ProviderId::ALL {
            Metrics::provider_status(provider.as_str(), HealthStatus::Healthy.level());
        }
        Metrics::global_status(HealthStatus::Healthy.level());

        Self {
            config,
            clock,
            state: Mutex::new(TrackerState {
                providers,
                global_status: HealthStatus::Healthy,
                sequence: 0,
            }),
            events,
        }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Inbound events
    // ------------------------------------------------------------------

    /// Record a failed upstream call.
    pub fn record_error(&self, provider: ProviderId, message: impl Into<String>) {
        let message = message.into();
        let now = self.clock.now_ms();
        Metrics::provider_outcome(provider.as_str(), "error");

        let mut state = self.state.lock();
        let health = state.record_mut(provider);
        health.error_count = health.error_count.saturating_add(1);
        health.last_error_time = Some(now);
        let previous = health.status;
        health.status = health.effective_status(now, &self.config);
        let error_count = health.error_count;
        let status = health.status;
        health.last_error = Some(message);

        debug!(%provider, error_count, "Provider error recorded");
        self.log_transition(provider, previous, status);

        state.recompute_global();
        self.publish(&mut state, now);
    }

    /// Record a successful upstream call. One success forgives one error.
    pub fn record_success(&self, provider: ProviderId) {
        let now = self.clock.now_ms();
        Metrics::provider_outcome(provider.as_str(), "success");

        let mut state = self.state.lock();
        let health = state.record_mut(provider);
        health.last_success_time = Some(now);

        if health.error_count == 0 {
            return;
        }

        health.error_count -= 1;
        let previous = health.status;
        health.status = health.effective_status(now, &self.config);
        let status = health.status;
        debug!(%provider, error_count = health.error_count, "Provider success forgave one error");
        self.log_transition(provider, previous, status);

        state.recompute_global();
        self.publish(&mut state, now);
    }

    /// Record that a provider throttled us for `reset_in_ms`.
    pub fn record_rate_limit(&self, provider: ProviderId, reset_in_ms: u64) {
        let now = self.clock.now_ms();
        Metrics::provider_outcome(provider.as_str(), "rate_limited");

        let mut state = self.state.lock();
        let health = state.record_mut(provider);
        health.rate_limited = true;
        health.rate_limit_reset_time = Some(now.saturating_add(reset_in_ms));
        let previous = health.status;
        health.status = HealthStatus::Degraded;

        warn!(%provider, reset_in_ms, "Provider rate limited");
        self.log_transition(provider, previous, HealthStatus::Degraded);

        state.recompute_global();
        self.publish(&mut state, now);
    }

    // ------------------------------------------------------------------
    // Decay and recovery
    // ------------------------------------------------------------------

    /// Apply time-based decay, recovery and rate-limit expiry.
    ///
    /// For each provider:
    /// 1. A success strictly after the last error, followed by more than
    ///    `recovery_time_ms` of quiet, resets the error count
    /// 2. A last error older than `error_window_ms` decays the count by one
    /// 3. An elapsed rate-limit reset time clears the rate-limit flag
    ///
    /// Returns true if any provider changed (one snapshot is published).
    pub fn sweep(&self) -> bool {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        let mut any_changed = false;

        for health in state.providers.values_mut() {
            let before = health.clone();
            *health = before.swept(now, &self.config);

            if before.rate_limited && !health.rate_limited {
                info!(provider = %health.provider, "Provider rate limit expired");
            }

            if *health != before {
                any_changed = true;
                self.log_transition(health.provider, before.status, health.status);
            }
        }

        if any_changed {
            state.recompute_global();
            self.publish(&mut state, now);
        }
        any_changed
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    // Status queries evaluate each record at the current time, as if a
    // sweep had just run, so they never report an expired error window or
    // rate limit. `provider_status` and `snapshot` return the stored state.

    pub fn is_provider_healthy(&self, provider: ProviderId) -> bool {
        let now = self.clock.now_ms();
        self.state
            .lock()
            .providers
            .get(&provider)
            .map_or(true, |p| p.swept(now, &self.config).is_healthy())
    }

    /// Copy of a provider's stored record.
    pub fn provider_status(&self, provider: ProviderId) -> ProviderHealth {
        self.state
            .lock()
            .providers
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| ProviderHealth::new(provider))
    }

    /// Providers whose current status is not healthy.
    pub fn degraded_providers(&self) -> Vec<ProviderId> {
        self.current_records()
            .into_iter()
            .filter(|p| !p.is_healthy())
            .map(|p| p.provider)
            .collect()
    }

    pub fn rate_limited_providers(&self) -> Vec<ProviderId> {
        self.current_records()
            .into_iter()
            .filter(|p| p.rate_limited)
            .map(|p| p.provider)
            .collect()
    }

    /// Worst current status across providers.
    pub fn global_status(&self) -> HealthStatus {
        worst_status(self.current_records().iter().map(|p| p.status))
    }

    fn current_records(&self) -> Vec<ProviderHealth> {
        let now = self.clock.now_ms();
        self.state
            .lock()
            .providers
            .values()
            .map(|p| p.swept(now, &self.config))
            .collect()
    }

    /// All records and the global status in one atomic read.
    pub fn snapshot(&self) -> HealthSnapshot {
        let now = self.clock.now_ms();
        let state = self.state.lock();
        Self::build_snapshot(&state, now)
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Receive a snapshot after every mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<HealthSnapshot> {
        self.events.subscribe()
    }

    /// Number of live subscribers.
    pub fn observer_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn publish(&self, state: &mut TrackerState, now: TimestampMs) {
        state.sequence += 1;
        let snapshot = Self::build_snapshot(state, now);
        // Err only means nobody is subscribed.
        let _ = self.events.send(snapshot);
    }

    fn build_snapshot(state: &TrackerState, now: TimestampMs) -> HealthSnapshot {
        HealthSnapshot {
            sequence: state.sequence,
            timestamp_ms: now,
            global_status: state.global_status,
            providers: state.providers.values().cloned().collect(),
        }
    }

    fn log_transition(&self, provider: ProviderId, from: HealthStatus, to: HealthStatus) {
        if from == to {
            return;
        }
        Metrics::provider_status(provider.as_str(), to.level());
        if to > from {
            warn!(%provider, %from, %to, "Provider health worsened");
        } else {
            info!(%provider, %from, %to, "Provider health improved");
        }
    }
}
