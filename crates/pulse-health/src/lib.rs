//! Provider health tracking.
//!
//! Converts a stream of per-call outcomes (success, error, rate limit) into
//! a hysteretic three-level status per provider and a global worst-of
//! status, suitable for driving a degraded-service banner without flapping
//! on single transient errors.
//!
//! # Architecture
//!
//! ```text
//!  data fetchers ──record_*──►  ProviderHealthTracker  ──broadcast──► observers
//!                                     ▲      │                       (WebSocket,
//!                 run_sweeper ──sweep─┘      └──snapshot()──►         banner)
//! ```
//!
//! One tracker is constructed at startup and shared through `Arc`.

pub mod banner;
pub mod config;
pub mod status;
pub mod sweeper;
pub mod tracker;

pub use banner::{BannerKind, StatusBanner};
pub use config::HealthConfig;
pub use status::{derive_status, worst_status, HealthStatus};
pub use sweeper::run_sweeper;
pub use tracker::{HealthSnapshot, ProviderHealth, ProviderHealthTracker};
