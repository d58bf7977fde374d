//! Shared fixtures for gateway integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use pulse_cache::{CacheConfig, MarketDataCache};
use pulse_core::{Candle, ManualClock, Quote, Timeframe};
use pulse_feed::{BoxFuture, MarketDataService, QuoteSource, SourceError, SourceResult};
use pulse_gateway::{create_router, AppState, BillingConfig, GatewayConfig, StaticBilling};
use pulse_health::{HealthConfig, ProviderHealthTracker};
use rust_decimal_macros::dec;
use tower::ServiceExt;

pub const START_MS: u64 = 1_700_000_000_000;

/// Scripted upstream: answers every call with the configured outcome.
#[derive(Default)]
pub struct StubSource {
    calls: AtomicUsize,
    failure: Mutex<Option<SourceError>>,
}

impl StubSource {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, error: SourceError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn succeed(&self) {
        *self.failure.lock().unwrap() = None;
    }

    fn outcome(&self) -> Option<SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.failure.lock().unwrap().clone()
    }
}

impl QuoteSource for StubSource {
    fn fetch_quotes(&self, symbols: Vec<String>) -> BoxFuture<'static, SourceResult<Vec<Quote>>> {
        let outcome = self.outcome();
        Box::pin(async move {
            if let Some(error) = outcome {
                return Err(error);
            }
            Ok(symbols
                .into_iter()
                .map(|symbol| Quote {
                    symbol,
                    price: dec!(101.25),
                    change: dec!(0.75),
                    change_percent: dec!(0.75),
                    volume: Some(1_000),
                    timestamp_ms: START_MS,
                })
                .collect())
        })
    }

    fn fetch_candles(
        &self,
        _symbol: String,
        _timeframe: Timeframe,
    ) -> BoxFuture<'static, SourceResult<Vec<Candle>>> {
        let outcome = self.outcome();
        Box::pin(async move {
            if let Some(error) = outcome {
                return Err(error);
            }
            Ok(vec![Candle {
                time_ms: START_MS,
                open: dec!(100),
                high: dec!(102),
                low: dec!(99),
                close: dec!(101),
                volume: 5_000,
            }])
        })
    }
}

pub struct Harness {
    pub state: AppState,
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub source: Arc<StubSource>,
    pub health: Arc<ProviderHealthTracker>,
}

impl Harness {
    pub fn new(config: GatewayConfig) -> Self {
        let clock = Arc::new(ManualClock::new(START_MS));
        let source = Arc::new(StubSource::default());
        let health = Arc::new(ProviderHealthTracker::new(
            HealthConfig::default(),
            clock.clone(),
        ));
        let cache = Arc::new(MarketDataCache::new(&CacheConfig::default(), clock.clone()));
        let market = Arc::new(MarketDataService::new(
            cache,
            health.clone(),
            source.clone(),
        ));
        let billing = Arc::new(StaticBilling::new(
            BillingConfig {
                subscribed_identities: vec!["subscriber".to_string()],
                ..BillingConfig::default()
            },
            clock.clone(),
        ));

        let state = AppState::new(config, clock.clone(), health.clone(), market, billing);
        let router = create_router(state.clone());
        Self {
            state,
            router,
            clock,
            source,
            health,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_as(&self, uri: &str, identity: &str) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header("x-user-id", identity)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(GatewayConfig::default())
    }
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("JSON body")
}

pub async fn text_body(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("UTF-8 body")
}
