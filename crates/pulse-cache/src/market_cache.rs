//! Market-data cache façade.
//!
//! Partitions cached data into three `TtlCache` instances with their own
//! TTLs. Keys are built with `CacheKey`, category first:
//!
//! - quotes: `quotes:{SYMBOL}[:{SYMBOL}...]` (symbols sorted)
//! - candles: `candles:{SYMBOL}:{timeframe}`
//! - technicals: `technicals:{SYMBOL}:{indicator}:{timeframe}`
//!
//! Symbols are uppercase and categories, indicators and timeframes are
//! lowercase, so a symbol segment can never be confused with another part.

use pulse_core::{
    normalize_symbol, CacheKey, Candle, CoreError, Quote, Result, SharedClock, TechnicalPoint,
    Timeframe,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::ttl_cache::TtlCache;

/// Cached data category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheCategory {
    Quotes,
    Candles,
    Technicals,
}

impl CacheCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quotes => "quotes",
            Self::Candles => "candles",
            Self::Technicals => "technicals",
        }
    }
}

/// Entry counts per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub quotes: usize,
    pub candles: usize,
    pub technicals: usize,
}

/// Quotes, candles and technical series caches behind one interface.
pub struct MarketDataCache {
    quotes: TtlCache<Vec<Quote>>,
    candles: TtlCache<Vec<Candle>>,
    technicals: TtlCache<Vec<TechnicalPoint>>,
}

impl MarketDataCache {
    /// Create the three caches with TTLs from `config`.
    pub fn new(config: &CacheConfig, clock: SharedClock) -> Self {
        Self {
            quotes: TtlCache::new(config.quote_ttl_ms, clock.clone()),
            candles: TtlCache::new(config.candle_ttl_ms, clock.clone()),
            technicals: TtlCache::new(config.technical_ttl_ms, clock),
        }
    }

    // ------------------------------------------------------------------
    // Key construction
    // ------------------------------------------------------------------

    /// Key for a batch of quotes. Order of `symbols` does not matter.
    pub fn quotes_key<S: AsRef<str>>(symbols: &[S]) -> Result<CacheKey> {
        if symbols.is_empty() {
            return Err(CoreError::InvalidSymbol(String::new()));
        }
        let mut normalized = symbols
            .iter()
            .map(|s| normalize_symbol(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        normalized.sort();
        normalized.dedup();
        CacheKey::new(CacheCategory::Quotes.as_str(), normalized)
    }

    pub fn candles_key(symbol: &str, timeframe: Timeframe) -> Result<CacheKey> {
        let symbol = normalize_symbol(symbol)?;
        CacheKey::new(
            CacheCategory::Candles.as_str(),
            [symbol.as_str(), timeframe.as_str()],
        )
    }

    pub fn technicals_key(symbol: &str, indicator: &str, timeframe: Timeframe) -> Result<CacheKey> {
        let symbol = normalize_symbol(symbol)?;
        let indicator = indicator.trim().to_ascii_lowercase();
        CacheKey::new(
            CacheCategory::Technicals.as_str(),
            [symbol.as_str(), indicator.as_str(), timeframe.as_str()],
        )
    }

    // ------------------------------------------------------------------
    // Quotes
    // ------------------------------------------------------------------

    pub fn get_quotes<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Option<Vec<Quote>>> {
        let key = Self::quotes_key(symbols)?;
        Ok(self.quotes.get(key.as_str()))
    }

    pub fn set_quotes<S: AsRef<str>>(&self, symbols: &[S], quotes: Vec<Quote>) -> Result<()> {
        let key = Self::quotes_key(symbols)?;
        self.quotes.set(key.as_str(), quotes);
        Ok(())
    }

    pub fn is_quotes_fresh<S: AsRef<str>>(&self, symbols: &[S]) -> Result<bool> {
        let key = Self::quotes_key(symbols)?;
        Ok(self.quotes.is_fresh(key.as_str()))
    }

    // ------------------------------------------------------------------
    // Candles
    // ------------------------------------------------------------------

    pub fn get_candles(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<Vec<Candle>>> {
        let key = Self::candles_key(symbol, timeframe)?;
        Ok(self.candles.get(key.as_str()))
    }

    pub fn set_candles(&self, symbol: &str, timeframe: Timeframe, candles: Vec<Candle>) -> Result<()> {
        let key = Self::candles_key(symbol, timeframe)?;
        self.candles.set(key.as_str(), candles);
        Ok(())
    }

    pub fn is_candles_fresh(&self, symbol: &str, timeframe: Timeframe) -> Result<bool> {
        let key = Self::candles_key(symbol, timeframe)?;
        Ok(self.candles.is_fresh(key.as_str()))
    }

    // ------------------------------------------------------------------
    // Technicals
    // ------------------------------------------------------------------

    pub fn get_technicals(
        &self,
        symbol: &str,
        indicator: &str,
        timeframe: Timeframe,
    ) -> Result<Option<Vec<TechnicalPoint>>> {
        let key = Self::technicals_key(symbol, indicator, timeframe)?;
        Ok(self.technicals.get(key.as_str()))
    }

    pub fn set_technicals(
        &self,
        symbol: &str,
        indicator: &str,
        timeframe: Timeframe,
        series: Vec<TechnicalPoint>,
    ) -> Result<()> {
        let key = Self::technicals_key(symbol, indicator, timeframe)?;
        self.technicals.set(key.as_str(), series);
        Ok(())
    }

    pub fn is_technicals_fresh(
        &self,
        symbol: &str,
        indicator: &str,
        timeframe: Timeframe,
    ) -> Result<bool> {
        let key = Self::technicals_key(symbol, indicator, timeframe)?;
        Ok(self.technicals.is_fresh(key.as_str()))
    }

    // ------------------------------------------------------------------
    // Composite operations
    // ------------------------------------------------------------------

    /// Drop every cached entry mentioning `symbol`, across all categories.
    ///
    /// Matches whole key segments, so invalidating `A` leaves `BA` cached.
    /// Returns the number of removed entries.
    pub fn invalidate_symbol(&self, symbol: &str) -> Result<usize> {
        let symbol = normalize_symbol(symbol)?;
        let removed = self.quotes.invalidate_segment(&symbol)
            + self.candles.invalidate_segment(&symbol)
            + self.technicals.invalidate_segment(&symbol);
        debug!(%symbol, removed, "Invalidated cached symbol");
        Ok(removed)
    }

    /// Clear all three caches.
    pub fn force_refresh(&self) {
        self.quotes.clear();
        self.candles.clear();
        self.technicals.clear();
        info!("Market data cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            quotes: self.quotes.len(),
            candles: self.candles.len(),
            technicals: self.technicals.len(),
        }
    }
}
