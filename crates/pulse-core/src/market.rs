//! Market data payloads served by the dashboard.

use crate::clock::TimestampMs;
use crate::error::{CoreError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Live quote for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    /// Absolute change since previous close.
    #[serde(default)]
    pub change: Decimal,
    /// Percent change since previous close.
    #[serde(default)]
    pub change_percent: Decimal,
    #[serde(default)]
    pub volume: Option<u64>,
    pub timestamp_ms: TimestampMs,
}

/// OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    /// Bar open time.
    pub time_ms: TimestampMs,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: u64,
}

/// One point of a technical-indicator series (RSI, SMA, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalPoint {
    pub time_ms: TimestampMs,
    pub value: f64,
}

/// Candle resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::FourHours => "4h",
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            "15m" => Ok(Self::FifteenMinutes),
            "1h" => Ok(Self::OneHour),
            "4h" => Ok(Self::FourHours),
            "1d" => Ok(Self::OneDay),
            "1w" => Ok(Self::OneWeek),
            other => Err(CoreError::InvalidTimeframe(other.to_string())),
        }
    }
}

/// Normalize a ticker symbol: trimmed, uppercase, non-empty.
///
/// Accepted characters are `A-Z`, `0-9` and `.-^=` (class shares, indices,
/// futures and FX tickers). Consecutive dots are rejected, so a symbol is
/// always a single opaque path segment and cache key part.
pub fn normalize_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim().to_ascii_uppercase();
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol.chars().all(is_symbol_char)
        && !symbol.contains("..");
    if !valid {
        return Err(CoreError::InvalidSymbol(raw.to_string()));
    }
    Ok(symbol)
}

const MAX_SYMBOL_LEN: usize = 32;

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '^' | '=')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_timeframe_round_trips_through_str() {
        for tf in [
            Timeframe::OneMinute,
            Timeframe::FiveMinutes,
            Timeframe::FifteenMinutes,
            Timeframe::OneHour,
            Timeframe::FourHours,
            Timeframe::OneDay,
            Timeframe::OneWeek,
        ] {
            assert_eq!(tf.as_str().parse::<Timeframe>().unwrap(), tf);
        }
        assert!("2d".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_symbol("brk.b").unwrap(), "BRK.B");
        assert!(normalize_symbol("").is_err());
        assert!(normalize_symbol("A:B").is_err());
        assert!(normalize_symbol("A B").is_err());
        assert_eq!(normalize_symbol("^gspc").unwrap(), "^GSPC");
        assert_eq!(normalize_symbol("eurusd=x").unwrap(), "EURUSD=X");
        assert_eq!(normalize_symbol("rds-a").unwrap(), "RDS-A");
    }

    #[test]
    fn test_normalize_symbol_rejects_url_syntax() {
        for raw in ["../admin", "A/B", "A?B=1", "A#B", "A%2F", "A..B", "A,B", "A&B"] {
            assert!(
                matches!(normalize_symbol(raw), Err(CoreError::InvalidSymbol(_))),
                "{raw} should be rejected"
            );
        }
        assert!(normalize_symbol(&"A".repeat(33)).is_err());
    }

    #[test]
    fn test_quote_deserializes_camel_case() {
        let json = r#"{"symbol":"AAPL","price":"189.5","changePercent":"1.2","timestampMs":1700000000000}"#;
        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.price, dec!(189.5));
        assert_eq!(quote.change_percent, dec!(1.2));
        assert_eq!(quote.change, Decimal::ZERO);
        assert_eq!(quote.volume, None);
    }
}
