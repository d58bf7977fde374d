//! Market data access for Pulse Terminal.
//!
//! `MarketDataService` answers quote and candle requests from the
//! `MarketDataCache` when fresh, and otherwise fetches through a
//! `QuoteSource`, storing the result and reporting the outcome to the
//! `ProviderHealthTracker` under `ProviderId::MarketData`.
//!
//! Retries are the caller's concern; one request makes at most one
//! upstream call.

pub mod config;
pub mod error;
pub mod http_source;
pub mod service;
pub mod source;

pub use config::FeedConfig;
pub use error::{FeedError, FeedResult, SourceError, SourceResult};
pub use http_source::HttpQuoteSource;
pub use service::MarketDataService;
pub use source::{BoxFuture, DynQuoteSource, QuoteSource};
