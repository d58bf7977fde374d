//! Background sweep task.
//!
//! Ticks every `sweep_interval_ms` and runs `ProviderHealthTracker::sweep`
//! while at least one observer is subscribed. With no observers nothing
//! sweeps; the HTTP health endpoint sweeps on demand instead.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::tracker::ProviderHealthTracker;

/// Run the sweeper until `shutdown` is cancelled.
pub async fn run_sweeper(tracker: Arc<ProviderHealthTracker>, shutdown: CancellationToken) {
    let interval_ms = tracker.config().sweep_interval_ms.max(1);
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately.
    ticker.tick().await;

    info!(interval_ms, "Health sweeper started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Health sweeper stopped");
                return;
            }
            _ = ticker.tick() => {
                let observers = tracker.observer_count();
                if observers == 0 {
                    trace!("No health observers, skipping sweep");
                    continue;
                }
                if tracker.sweep() {
                    debug!(observers, "Sweep changed provider health");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HealthConfig;
    use crate::status::HealthStatus;
    use pulse_core::{ManualClock, ProviderId};

    fn tracker(clock: Arc<ManualClock>) -> Arc<ProviderHealthTracker> {
        let config = HealthConfig {
            sweep_interval_ms: 1_000,
            ..HealthConfig::default()
        };
        Arc::new(ProviderHealthTracker::new(config, clock))
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_clears_rate_limit_when_observed() {
        let clock = Arc::new(ManualClock::new(0));
        let tracker = tracker(clock.clone());
        let mut rx = tracker.subscribe();

        tracker.record_rate_limit(ProviderId::News, 500);
        assert_eq!(rx.recv().await.unwrap().sequence, 1);

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_sweeper(tracker.clone(), shutdown.clone()));

        clock.advance(500);
        tokio::time::sleep(Duration::from_millis(1_100)).await;

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.sequence, 2);
        assert_eq!(snapshot.global_status, HealthStatus::Healthy);
        assert!(!tracker.provider_status(ProviderId::News).rate_limited);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_idle_without_observers() {
        let clock = Arc::new(ManualClock::new(0));
        let tracker = tracker(clock.clone());
        tracker.record_rate_limit(ProviderId::News, 500);

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_sweeper(tracker.clone(), shutdown.clone()));

        clock.advance(10_000);
        tokio::time::sleep(Duration::from_millis(5_000)).await;

        // Nobody observing: the flag stays until someone sweeps.
        assert!(tracker.provider_status(ProviderId::News).rate_limited);
        assert!(tracker.sweep());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_on_cancel() {
        let clock = Arc::new(ManualClock::new(0));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_sweeper(tracker(clock), shutdown.clone()));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper should stop")
            .unwrap();
    }
}
