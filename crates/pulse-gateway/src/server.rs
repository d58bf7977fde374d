//! HTTP server implementation using axum.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use pulse_core::{SharedClock, Timeframe};
use pulse_feed::MarketDataService;
use pulse_health::ProviderHealthTracker;
use pulse_ratelimit::{FixedWindowRateLimiter, RateLimitDecision};
use pulse_telemetry::Metrics;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::billing::{BillingError, CheckoutRequest, DynBillingBackend};
use crate::config::GatewayConfig;
use crate::error::{apply_rate_limit_headers, GatewayError, GatewayResult};
use crate::identity::extract_identity;
use crate::types::{
    CandlesQuery, HealthMessage, HealthView, InvalidateResponse, QuotesQuery, RefreshResponse,
};

const CHECK_SUBSCRIPTION: &str = "check-subscription";
const CREATE_CHECKOUT: &str = "create-checkout";

/// Caps concurrent WebSocket observers.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    /// Take a slot. The guard releases it on drop and can move into the
    /// upgraded connection task.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard {
                    limiter: Arc::clone(self),
                });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    health: Arc<ProviderHealthTracker>,
    market: Arc<MarketDataService>,
    billing: DynBillingBackend,
    subscription_limiter: Arc<FixedWindowRateLimiter>,
    checkout_limiter: Arc<FixedWindowRateLimiter>,
    connections: Arc<ConnectionLimiter>,
    config: GatewayConfig,
}

impl AppState {
    pub fn new(
        config: GatewayConfig,
        clock: SharedClock,
        health: Arc<ProviderHealthTracker>,
        market: Arc<MarketDataService>,
        billing: DynBillingBackend,
    ) -> Self {
        Self {
            subscription_limiter: Arc::new(FixedWindowRateLimiter::new(
                config.check_subscription_limit.clone(),
                clock.clone(),
            )),
            checkout_limiter: Arc::new(FixedWindowRateLimiter::new(
                config.create_checkout_limit.clone(),
                clock,
            )),
            connections: Arc::new(ConnectionLimiter::new(config.max_connections)),
            health,
            market,
            billing,
            config,
        }
    }

    pub fn health(&self) -> &Arc<ProviderHealthTracker> {
        &self.health
    }

    pub fn connection_count(&self) -> usize {
        self.connections.current_count()
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/api/health", get(get_health))
        .route("/ws", get(ws_handler))
        .route("/api/quotes", get(get_quotes))
        .route("/api/candles/{symbol}", get(get_candles))
        .route("/api/cache/refresh", post(refresh_cache))
        .route("/api/cache/{symbol}", delete(invalidate_cache))
        .route("/functions/check-subscription", post(check_subscription))
        .route("/functions/create-checkout", post(create_checkout))
        .route("/metrics", get(get_metrics))
        .layer(TraceLayer::new_for_http());

    let router = if state.config.cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };
    router.with_state(state)
}

// ----------------------------------------------------------------------
// Health
// ----------------------------------------------------------------------

/// Sweep so time-based recovery shows up without a live observer, then
/// report.
async fn get_health(State(state): State<AppState>) -> Json<HealthView> {
    state.health.sweep();
    Json(HealthView::from(state.health.snapshot()))
}

/// WebSocket upgrade handler.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let Some(guard) = state.connections.try_acquire() else {
        warn!(
            current = state.connections.current_count(),
            max = state.config.max_connections,
            "WebSocket connection limit reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };

    info!(
        connections = state.connections.current_count(),
        "New health observer"
    );
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, guard))
}

/// Push the current health, then one update per tracker mutation.
async fn handle_ws_connection(socket: WebSocket, state: AppState, _guard: ConnectionGuard) {
    Metrics::observer_connected();
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading the snapshot so no mutation falls between.
    let mut updates = state.health.subscribe();
    state.health.sweep();
    let initial = state.health.snapshot();
    let mut last_sequence = initial.sequence;

    if send_message(&mut sender, HealthMessage::Snapshot(initial.into()))
        .await
        .is_err()
    {
        debug!("Failed to send initial snapshot, client disconnected");
        Metrics::observer_disconnected();
        return;
    }

    // Drain client frames so close and ping are processed.
    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            result = updates.recv() => {
                let message = match result {
                    Ok(snapshot) if snapshot.sequence <= last_sequence => continue,
                    Ok(snapshot) => {
                        last_sequence = snapshot.sequence;
                        HealthMessage::Update(snapshot.into())
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "Health observer lagged, resending snapshot");
                        let snapshot = state.health.snapshot();
                        last_sequence = snapshot.sequence;
                        HealthMessage::Snapshot(snapshot.into())
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Health channel closed");
                        break;
                    }
                };
                if send_message(&mut sender, message).await.is_err() {
                    debug!("Failed to send health update, client disconnected");
                    break;
                }
            }
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing connection");
                break;
            }
        }
    }

    incoming_task.abort();
    Metrics::observer_disconnected();
    info!(
        connections = state.connections.current_count().saturating_sub(1),
        "Health observer disconnected"
    );
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: HealthMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(&message) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            debug!(error = %e, "Failed to serialize health message");
            Ok(())
        }
    }
}

// ----------------------------------------------------------------------
// Market data
// ----------------------------------------------------------------------

async fn get_quotes(
    State(state): State<AppState>,
    Query(query): Query<QuotesQuery>,
) -> GatewayResult<Response> {
    let quotes = state.market.get_quotes(&query.symbols()).await?;
    Ok(Json(quotes).into_response())
}

async fn get_candles(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<CandlesQuery>,
) -> GatewayResult<Response> {
    let timeframe = match query.timeframe.as_deref() {
        Some(raw) => raw.parse::<Timeframe>()?,
        None => Timeframe::default(),
    };
    let candles = state.market.get_candles(&symbol, timeframe).await?;
    Ok(Json(candles).into_response())
}

async fn invalidate_cache(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> GatewayResult<Json<InvalidateResponse>> {
    let removed = state.market.invalidate_symbol(&symbol)?;
    Ok(Json(InvalidateResponse { symbol, removed }))
}

async fn refresh_cache(State(state): State<AppState>) -> Json<RefreshResponse> {
    let cleared = state.market.cache().stats();
    state.market.force_refresh();
    Json(RefreshResponse { cleared })
}

// ----------------------------------------------------------------------
// Subscription functions
// ----------------------------------------------------------------------

/// Resolve the caller and count the request against `limiter`.
fn admit(
    headers: &HeaderMap,
    limiter: &FixedWindowRateLimiter,
    endpoint: &str,
) -> GatewayResult<(String, RateLimitDecision)> {
    let identity = extract_identity(headers).ok_or(GatewayError::Unauthorized)?;
    let decision = limiter.check(identity.as_str());
    Metrics::rate_limit_decision(endpoint, decision.allowed);

    if !decision.allowed {
        warn!(endpoint, reset_in_ms = decision.reset_in_ms, "Request rate limited");
        return Err(GatewayError::RateLimited(decision));
    }
    Ok((identity, decision))
}

fn with_rate_limit_headers(mut response: Response, decision: &RateLimitDecision) -> Response {
    apply_rate_limit_headers(response.headers_mut(), decision);
    response
}

async fn check_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> GatewayResult<Response> {
    let (identity, decision) = admit(&headers, &state.subscription_limiter, CHECK_SUBSCRIPTION)?;
    let status = state.billing.check_subscription(&identity).await?;
    Ok(with_rate_limit_headers(Json(status).into_response(), &decision))
}

async fn create_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> GatewayResult<Response> {
    let (identity, decision) = admit(&headers, &state.checkout_limiter, CREATE_CHECKOUT)?;

    let request = if body.is_empty() {
        CheckoutRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| BillingError::InvalidRequest(e.to_string()))?
    };
    let session = state.billing.create_checkout(&identity, request).await?;
    Ok(with_rate_limit_headers(Json(session).into_response(), &decision))
}

// ----------------------------------------------------------------------
// Metrics
// ----------------------------------------------------------------------

async fn get_metrics() -> GatewayResult<Response> {
    let text = Metrics::gather_text()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    )
        .into_response())
}

// ----------------------------------------------------------------------
// Serving
// ----------------------------------------------------------------------

/// Serve on an already bound listener until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> GatewayResult<()> {
    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

/// Bind the configured address and serve until `shutdown` is cancelled.
pub async fn run_server(state: AppState, shutdown: CancellationToken) -> GatewayResult<()> {
    let addr = state.config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Starting gateway server");
    serve(listener, state, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_limiter_caps_and_releases() {
        let limiter = Arc::new(ConnectionLimiter::new(2));
        let a = limiter.try_acquire().unwrap();
        let _b = limiter.try_acquire().unwrap();
        assert!(limiter.try_acquire().is_none());
        assert_eq!(limiter.current_count(), 2);

        drop(a);
        assert_eq!(limiter.current_count(), 1);
        assert!(limiter.try_acquire().is_some());
    }
}
