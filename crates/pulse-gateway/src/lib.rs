//! pulse-gateway - HTTP and WebSocket surface for Pulse Terminal.
//!
//! - REST endpoints for provider health, cached market data and cache control
//! - WebSocket push of health snapshots, one message per tracker mutation
//! - Per-identity rate limiting in front of the subscription functions
//! - Prometheus exposition at `/metrics`
//!
//! # Routes
//!
//! ```text
//! GET    /api/health                    sweep, then snapshot + banner
//! GET    /ws                            health observer WebSocket
//! GET    /api/quotes?symbols=A,B        cached quotes
//! GET    /api/candles/{symbol}          cached candles (?timeframe=1d)
//! DELETE /api/cache/{symbol}            invalidate one symbol
//! POST   /api/cache/refresh             clear all market data caches
//! POST   /functions/check-subscription  10/min per identity
//! POST   /functions/create-checkout     5/min per identity
//! GET    /metrics                       Prometheus text format
//! ```

pub mod billing;
pub mod config;
pub mod error;
pub mod identity;
pub mod server;
pub mod types;

pub use billing::{
    BillingBackend, BillingConfig, BillingError, BillingResult, CheckoutRequest, CheckoutSession,
    DynBillingBackend, StaticBilling, SubscriptionStatus,
};
pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use identity::extract_identity;
pub use server::{create_router, run_server, serve, AppState, ConnectionLimiter};
pub use types::{HealthMessage, HealthView};
