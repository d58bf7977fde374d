//! Upstream quote source abstraction.
//!
//! The service talks to the upstream through this trait so tests can
//! substitute a mock and the HTTP transport stays swappable.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use pulse_core::{Candle, Quote, Timeframe};

use crate::error::SourceResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Fetches market data from an upstream provider.
///
/// Returned futures own their inputs so they can be spawned or held
/// across awaits without borrowing the source.
#[cfg_attr(test, mockall::automock)]
pub trait QuoteSource: Send + Sync {
    /// Latest quotes for normalized, deduplicated symbols.
    fn fetch_quotes(&self, symbols: Vec<String>) -> BoxFuture<'static, SourceResult<Vec<Quote>>>;

    /// Candle series for one normalized symbol.
    fn fetch_candles(
        &self,
        symbol: String,
        timeframe: Timeframe,
    ) -> BoxFuture<'static, SourceResult<Vec<Candle>>>;
}

/// Arc wrapper for QuoteSource trait objects.
pub type DynQuoteSource = Arc<dyn QuoteSource>;
