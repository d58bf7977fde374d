//! Application orchestration.

use std::sync::Arc;

use pulse_cache::MarketDataCache;
use pulse_core::{SharedClock, SystemClock};
use pulse_feed::{HttpQuoteSource, MarketDataService};
use pulse_gateway::{run_server, AppState, GatewayResult, StaticBilling};
use pulse_health::{run_sweeper, ProviderHealthTracker};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Owns every long-lived component of the server process.
pub struct Application {
    config: AppConfig,
    health: Arc<ProviderHealthTracker>,
    state: AppState,
    shutdown: CancellationToken,
}

impl Application {
    /// Build with the wall clock.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        Self::with_clock(config, SystemClock::shared())
    }

    /// Build with an explicit clock.
    pub fn with_clock(config: AppConfig, clock: SharedClock) -> AppResult<Self> {
        let health = Arc::new(ProviderHealthTracker::new(
            config.health.clone(),
            clock.clone(),
        ));
        let cache = Arc::new(MarketDataCache::new(&config.cache, clock.clone()));
        let source = Arc::new(HttpQuoteSource::new(&config.feed)?);
        let market = Arc::new(MarketDataService::new(cache, health.clone(), source));
        let billing = Arc::new(StaticBilling::new(config.billing.clone(), clock.clone()));

        let state = AppState::new(
            config.server.clone(),
            clock,
            health.clone(),
            market,
            billing,
        );

        Ok(Self {
            config,
            health,
            state,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn health(&self) -> &Arc<ProviderHealthTracker> {
        &self.health
    }

    /// Token that stops the server and sweeper when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serve until Ctrl-C, the shutdown token, or a server failure.
    pub async fn run(self) -> AppResult<()> {
        info!(
            addr = %self.config.server.bind_addr(),
            sweep_interval_ms = self.config.health.sweep_interval_ms,
            "Starting application"
        );

        let sweeper = tokio::spawn(run_sweeper(self.health.clone(), self.shutdown.clone()));
        let mut server = tokio::spawn(run_server(self.state.clone(), self.shutdown.clone()));

        let result = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                Ok(())
            }
            _ = self.shutdown.cancelled() => {
                info!("Shutdown requested");
                Ok(())
            }
            joined = &mut server => server_exit(joined),
        };

        self.shutdown.cancel();
        if !server.is_finished() {
            if let Ok(Err(e)) = server.await {
                error!(error = %e, "Gateway server failed during shutdown");
            }
        }
        if let Err(e) = sweeper.await {
            error!(error = %e, "Health sweeper task panicked");
        }

        info!("Shutdown complete");
        result
    }
}

/// Outcome of a gateway task that ended before shutdown was requested.
/// A panic is an error so the process exits non-zero.
fn server_exit(joined: Result<GatewayResult<()>, JoinError>) -> AppResult<()> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(error = %e, "Gateway server failed");
            Err(e.into())
        }
        Err(e) => {
            error!(error = %e, "Gateway server task panicked");
            Err(e.into())
        }
    }
}
