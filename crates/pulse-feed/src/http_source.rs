//! HTTP quote source.
//!
//! Talks to a JSON market data API:
//! - `GET {base_url}/quotes?symbols=AAPL,MSFT` -> `[Quote]`
//! - `GET {base_url}/candles/{symbol}?timeframe=1d` -> `[Candle]`
//!
//! Symbols are pushed as single percent-encoded path segments.
//!
//! HTTP 429 becomes `SourceError::RateLimited` using the `Retry-After`
//! header (seconds) when present.

use std::time::Duration;

use pulse_core::{Candle, Quote, Timeframe};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::FeedConfig;
use crate::error::{FeedError, FeedResult, SourceError, SourceResult};
use crate::source::{BoxFuture, QuoteSource};

/// `QuoteSource` backed by `reqwest`.
#[derive(Clone)]
pub struct HttpQuoteSource {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    default_retry_after_ms: u64,
}

impl HttpQuoteSource {
    pub fn new(config: &FeedConfig) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| FeedError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| FeedError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(FeedError::InvalidBaseUrl(config.base_url.clone()));
        }

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            default_retry_after_ms: config.default_retry_after_ms,
        })
    }

    /// Base URL with `segments` appended, each percent-encoded as one
    /// path segment.
    fn endpoint(&self, segments: &[&str]) -> SourceResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SourceError::Upstream(format!("Unusable base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, segments: &[&str]) -> SourceResult<RequestBuilder> {
        let request = self.client.get(self.endpoint(segments)?);
        Ok(match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        })
    }
}

impl QuoteSource for HttpQuoteSource {
    fn fetch_quotes(&self, symbols: Vec<String>) -> BoxFuture<'static, SourceResult<Vec<Quote>>> {
        let request = self
            .get(&["quotes"])
            .map(|r| r.query(&[("symbols", symbols.join(","))]));
        let default_retry_after_ms = self.default_retry_after_ms;
        Box::pin(async move { send_json(request?, default_retry_after_ms).await })
    }

    fn fetch_candles(
        &self,
        symbol: String,
        timeframe: Timeframe,
    ) -> BoxFuture<'static, SourceResult<Vec<Candle>>> {
        let request = self
            .get(&["candles", &symbol])
            .map(|r| r.query(&[("timeframe", timeframe.as_str())]));
        let default_retry_after_ms = self.default_retry_after_ms;
        Box::pin(async move { send_json(request?, default_retry_after_ms).await })
    }
}

async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    default_retry_after_ms: u64,
) -> SourceResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| SourceError::Upstream(format!("HTTP request failed: {e}")))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_ms =
            retry_after_ms(response.headers()).unwrap_or(default_retry_after_ms);
        warn!(retry_after_ms, "Upstream returned 429");
        return Err(SourceError::RateLimited { retry_after_ms });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Upstream(format!("HTTP {status}: {body}")));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| SourceError::Upstream(format!("Failed to read response: {e}")))?;
    debug!(bytes = body.len(), "Upstream response received");
    serde_json::from_slice(&body).map_err(|e| SourceError::Decode(e.to_string()))
}

/// `Retry-After` in milliseconds. Only the delta-seconds form is accepted.
fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    let secs: u64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Some(secs.saturating_mul(1000))
}
