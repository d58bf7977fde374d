//! Cache-first market data service.

use std::sync::Arc;
use std::time::Instant;

use pulse_cache::{CacheCategory, MarketDataCache};
use pulse_core::{normalize_symbol, Candle, CoreError, ProviderId, Quote, Timeframe};
use pulse_health::ProviderHealthTracker;
use pulse_telemetry::Metrics;
use tracing::{debug, warn};

use crate::error::{FeedResult, SourceError, SourceResult};
use crate::source::DynQuoteSource;

const PROVIDER: ProviderId = ProviderId::MarketData;

/// Serves market data from cache, falling back to the upstream source.
pub struct MarketDataService {
    cache: Arc<MarketDataCache>,
    health: Arc<ProviderHealthTracker>,
    source: DynQuoteSource,
}

impl MarketDataService {
    pub fn new(
        cache: Arc<MarketDataCache>,
        health: Arc<ProviderHealthTracker>,
        source: DynQuoteSource,
    ) -> Self {
        Self {
            cache,
            health,
            source,
        }
    }

    pub fn cache(&self) -> &Arc<MarketDataCache> {
        &self.cache
    }

    /// Quotes for `symbols`, from cache when fresh.
    ///
    /// Symbols are trimmed, uppercased and deduplicated; request order does
    /// not affect caching.
    pub async fn get_quotes<S: AsRef<str>>(&self, symbols: &[S]) -> FeedResult<Vec<Quote>> {
        let symbols = normalize_batch(symbols)?;

        if let Some(quotes) = self.cache.get_quotes(&symbols)? {
            Metrics::cache_hit(CacheCategory::Quotes.as_str());
            return Ok(quotes);
        }
        Metrics::cache_miss(CacheCategory::Quotes.as_str());

        let started = Instant::now();
        let result = self.source.fetch_quotes(symbols.clone()).await;
        Metrics::upstream_latency(PROVIDER.as_str(), "quotes", elapsed_ms(started));

        let quotes = self.report(result, "quotes")?;
        self.cache.set_quotes(&symbols, quotes.clone())?;
        debug!(count = quotes.len(), "Quotes fetched and cached");
        Ok(quotes)
    }

    /// Candle series for one symbol, from cache when fresh.
    pub async fn get_candles(&self, symbol: &str, timeframe: Timeframe) -> FeedResult<Vec<Candle>> {
        let symbol = normalize_symbol(symbol)?;

        if let Some(candles) = self.cache.get_candles(&symbol, timeframe)? {
            Metrics::cache_hit(CacheCategory::Candles.as_str());
            return Ok(candles);
        }
        Metrics::cache_miss(CacheCategory::Candles.as_str());

        let started = Instant::now();
        let result = self.source.fetch_candles(symbol.clone(), timeframe).await;
        Metrics::upstream_latency(PROVIDER.as_str(), "candles", elapsed_ms(started));

        let candles = self.report(result, "candles")?;
        self.cache.set_candles(&symbol, timeframe, candles.clone())?;
        debug!(%symbol, %timeframe, count = candles.len(), "Candles fetched and cached");
        Ok(candles)
    }

    pub fn invalidate_symbol(&self, symbol: &str) -> FeedResult<usize> {
        Ok(self.cache.invalidate_symbol(symbol)?)
    }

    pub fn force_refresh(&self) {
        self.cache.force_refresh();
    }

    /// Report an upstream outcome to the health tracker.
    fn report<T>(&self, result: SourceResult<T>, operation: &str) -> FeedResult<T> {
        match result {
            Ok(value) => {
                self.health.record_success(PROVIDER);
                Ok(value)
            }
            Err(SourceError::RateLimited { retry_after_ms }) => {
                self.health.record_rate_limit(PROVIDER, retry_after_ms);
                Err(SourceError::RateLimited { retry_after_ms }.into())
            }
            Err(e) => {
                warn!(operation, error = %e, "Upstream fetch failed");
                self.health.record_error(PROVIDER, e.to_string());
                Err(e.into())
            }
        }
    }
}

fn normalize_batch<S: AsRef<str>>(symbols: &[S]) -> FeedResult<Vec<String>> {
    if symbols.is_empty() {
        return Err(CoreError::InvalidSymbol(String::new()).into());
    }
    let mut normalized = symbols
        .iter()
        .map(|s| normalize_symbol(s.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    normalized.sort();
    normalized.dedup();
    Ok(normalized)
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use crate::source::MockQuoteSource;
    use mockall::predicate::eq;
    use pulse_cache::CacheConfig;
    use pulse_core::ManualClock;
    use pulse_health::{HealthConfig, HealthStatus};
    use rust_decimal_macros::dec;
    use tokio_test::{assert_err, assert_ok};

    fn quote(symbol: &str) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            price: dec!(187.44),
            change: dec!(-1.2),
            change_percent: dec!(-0.64),
            volume: Some(51_234_000),
            timestamp_ms: 0,
        }
    }

    struct Fixture {
        service: MarketDataService,
        health: Arc<ProviderHealthTracker>,
        clock: Arc<ManualClock>,
    }

    fn fixture(source: MockQuoteSource) -> Fixture {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = Arc::new(MarketDataCache::new(&CacheConfig::default(), clock.clone()));
        let health = Arc::new(ProviderHealthTracker::new(
            HealthConfig::default(),
            clock.clone(),
        ));
        Fixture {
            service: MarketDataService::new(cache, health.clone(), Arc::new(source)),
            health,
            clock,
        }
    }

    #[tokio::test]
    async fn test_quotes_fetched_once_then_served_from_cache() {
        let mut source = MockQuoteSource::new();
        source
            .expect_fetch_quotes()
            .with(eq(vec!["AAPL".to_string(), "MSFT".to_string()]))
            .times(1)
            .returning(|symbols| {
                let quotes = symbols.iter().map(|s| quote(s)).collect();
                Box::pin(async move { Ok(quotes) })
            });
        let f = fixture(source);

        let first = assert_ok!(f.service.get_quotes(&["msft", " aapl", "MSFT"]).await);
        assert_eq!(first.len(), 2);

        let second = assert_ok!(f.service.get_quotes(&["AAPL", "MSFT"]).await);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_quotes_refetched_after_ttl() {
        let mut source = MockQuoteSource::new();
        source
            .expect_fetch_quotes()
            .times(2)
            .returning(|_| Box::pin(async { Ok(vec![quote("AAPL")]) }));
        let f = fixture(source);

        assert_ok!(f.service.get_quotes(&["AAPL"]).await);
        f.clock.advance(CacheConfig::default().quote_ttl_ms);
        assert_ok!(f.service.get_quotes(&["AAPL"]).await);
    }

    #[tokio::test]
    async fn test_upstream_errors_feed_health_tracker() {
        let mut source = MockQuoteSource::new();
        source
            .expect_fetch_candles()
            .returning(|_, _| Box::pin(async { Err(SourceError::Upstream("HTTP 502".into())) }));
        let f = fixture(source);

        for _ in 0..2 {
            let err = assert_err!(f.service.get_candles("AAPL", Timeframe::OneDay).await);
            assert!(matches!(err, FeedError::Source(SourceError::Upstream(_))));
        }

        let record = f.health.provider_status(ProviderId::MarketData);
        assert_eq!(record.error_count, 2);
        assert_eq!(record.status, HealthStatus::Degraded);
        assert!(record.last_error.unwrap().contains("502"));
        assert_eq!(f.service.cache().stats().candles, 0, "errors are not cached");
    }

    #[tokio::test]
    async fn test_success_forgives_previous_error() {
        let mut source = MockQuoteSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_fetch_candles()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Box::pin(async { Err(SourceError::Decode("bad json".into())) }));
        source
            .expect_fetch_candles()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Box::pin(async { Ok(vec![]) }));
        let f = fixture(source);

        assert_err!(f.service.get_candles("AAPL", Timeframe::OneHour).await);
        assert_eq!(f.health.provider_status(ProviderId::MarketData).error_count, 1);

        assert_ok!(f.service.get_candles("AAPL", Timeframe::OneHour).await);
        let record = f.health.provider_status(ProviderId::MarketData);
        assert_eq!(record.error_count, 0);
        assert_eq!(record.last_success_time, Some(1_000_000));
    }

    #[tokio::test]
    async fn test_rate_limited_upstream_marks_provider() {
        let mut source = MockQuoteSource::new();
        source.expect_fetch_quotes().returning(|_| {
            Box::pin(async {
                Err(SourceError::RateLimited {
                    retry_after_ms: 30_000,
                })
            })
        });
        let f = fixture(source);

        let err = assert_err!(f.service.get_quotes(&["AAPL"]).await);
        assert!(err.is_rate_limited());

        let record = f.health.provider_status(ProviderId::MarketData);
        assert!(record.rate_limited);
        assert_eq!(record.error_count, 0);
        assert_eq!(record.rate_limit_reset_time, Some(1_030_000));
        assert_eq!(f.health.global_status(), HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_invalid_symbol_never_reaches_upstream() {
        let source = MockQuoteSource::new();
        let f = fixture(source);

        let err = assert_err!(f.service.get_quotes(&["AA PL"]).await);
        assert!(matches!(err, FeedError::InvalidRequest(_)));

        let empty: [&str; 0] = [];
        assert_err!(f.service.get_quotes(&empty).await);
    }

    #[tokio::test]
    async fn test_invalidate_symbol_forces_refetch() {
        let mut source = MockQuoteSource::new();
        source
            .expect_fetch_candles()
            .with(eq("AAPL".to_string()), eq(Timeframe::OneDay))
            .times(2)
            .returning(|_, _| Box::pin(async { Ok(vec![]) }));
        let f = fixture(source);

        assert_ok!(f.service.get_candles("aapl", Timeframe::OneDay).await);
        assert_eq!(assert_ok!(f.service.invalidate_symbol("AAPL")), 1);
        assert_ok!(f.service.get_candles("AAPL", Timeframe::OneDay).await);
    }
}
