//! External provider identification.
//!
//! The set of providers is fixed at compile time. String names only enter
//! the system at boundaries (config, HTTP paths) and are parsed with
//! `FromStr`, which rejects unknown names.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named external data/service dependency whose health is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    /// Quotes and candle series feed.
    MarketData,
    /// AI chat completion service.
    AiChat,
    /// News feed.
    News,
    /// Company fundamentals feed.
    Fundamentals,
}

impl ProviderId {
    /// Every known provider, in display order.
    pub const ALL: [ProviderId; 4] = [
        ProviderId::MarketData,
        ProviderId::AiChat,
        ProviderId::News,
        ProviderId::Fundamentals,
    ];

    /// Canonical kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketData => "market-data",
            Self::AiChat => "ai-chat",
            Self::News => "news",
            Self::Fundamentals => "fundamentals",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::UnknownProvider(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_providers() {
        for provider in ProviderId::ALL {
            let parsed: ProviderId = provider.as_str().parse().unwrap();
            assert_eq!(parsed, provider);
        }
    }

    #[test]
    fn test_parse_unknown_provider_fails() {
        let err = "market_data".parse::<ProviderId>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownProvider(ref name) if name == "market_data"));
        assert_eq!(err.to_string(), "Unknown provider: market_data");
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&ProviderId::AiChat).unwrap();
        assert_eq!(json, "\"ai-chat\"");
        let back: ProviderId = serde_json::from_str("\"market-data\"").unwrap();
        assert_eq!(back, ProviderId::MarketData);
    }
}
