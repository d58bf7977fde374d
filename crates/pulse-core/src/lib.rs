//! Core domain types for the Pulse Terminal backend.
//!
//! This crate provides the types shared by every other crate:
//! - `ProviderId`: The fixed set of external providers whose health is tracked
//! - `CacheKey`: Deterministic, collision-free cache key construction
//! - `Clock`: Millisecond time source (system or manually driven)
//! - `Quote`, `Candle`, `TechnicalPoint`: Market data payloads

pub mod cache_key;
pub mod clock;
pub mod error;
pub mod market;
pub mod provider;

pub use cache_key::{key_has_segment, CacheKey, CACHE_KEY_SEPARATOR};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock, TimestampMs};
pub use error::{CoreError, Result};
pub use market::{normalize_symbol, Candle, Quote, TechnicalPoint, Timeframe};
pub use provider::ProviderId;
