//! Pulse Terminal server.
//!
//! Wires the shared components into one process:
//! - `ProviderHealthTracker` with its background sweeper
//! - `MarketDataCache` and `MarketDataService` over the HTTP quote source
//! - The gateway HTTP/WebSocket server with per-identity rate limits
//!
//! Every component is constructed once here and shared through `Arc`.

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
