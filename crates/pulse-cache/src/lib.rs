//! In-memory TTL caches for market data.
//!
//! - `TtlCache`: generic key/value store with a fixed per-instance TTL
//! - `MarketDataCache`: quotes, candles and technical series partitioned
//!   into independently configured `TtlCache` instances
//!
//! Entries are never persisted and nothing is evicted except on TTL expiry
//! or explicit invalidation.

pub mod config;
pub mod market_cache;
pub mod ttl_cache;

pub use config::CacheConfig;
pub use market_cache::{CacheCategory, CacheStats, MarketDataCache};
pub use ttl_cache::TtlCache;
