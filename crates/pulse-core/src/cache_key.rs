//! Cache key construction.
//!
//! A key is a category followed by ordered parts, joined with
//! [`CACHE_KEY_SEPARATOR`]. Parts may not be empty or contain the
//! separator, so two different part lists never produce the same key.

use crate::error::{CoreError, Result};
use std::fmt;

/// Separator between key parts.
pub const CACHE_KEY_SEPARATOR: char = ':';

/// Deterministic cache key, e.g. `candles:AAPL:1d`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from a category and ordered parts.
    pub fn new<I, S>(category: &str, parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        validate_part(category)?;
        let mut key = String::from(category);
        for part in parts {
            let part = part.as_ref();
            validate_part(part)?;
            key.push(CACHE_KEY_SEPARATOR);
            key.push_str(part);
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// True if any part of a rendered key equals `segment` exactly.
pub fn key_has_segment(key: &str, segment: &str) -> bool {
    key.split(CACHE_KEY_SEPARATOR).any(|part| part == segment)
}

fn validate_part(part: &str) -> Result<()> {
    if part.is_empty() {
        return Err(CoreError::InvalidCacheKey {
            part: part.to_string(),
            reason: "empty part",
        });
    }
    if part.contains(CACHE_KEY_SEPARATOR) {
        return Err(CoreError::InvalidCacheKey {
            part: part.to_string(),
            reason: "part contains separator",
        });
    }
    Ok(())
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_joins_parts_in_order() {
        let key = CacheKey::new("candles", ["AAPL", "1d"]).unwrap();
        assert_eq!(key.as_str(), "candles:AAPL:1d");
    }

    #[test]
    fn test_key_rejects_separator_in_part() {
        let err = CacheKey::new("quotes", ["BRK:B"]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCacheKey { .. }));
    }

    #[test]
    fn test_key_rejects_empty_part() {
        assert!(CacheKey::new("quotes", [""]).is_err());
        assert!(CacheKey::new("", ["AAPL"]).is_err());
    }

    #[test]
    fn test_has_segment_is_exact() {
        let key = CacheKey::new("quotes", ["BA", "1d"]).unwrap();
        assert!(key_has_segment(key.as_str(), "quotes"));
        assert!(key_has_segment(key.as_str(), "BA"));
        assert!(!key_has_segment(key.as_str(), "A"));
        // Plain containment would match here.
        assert!(key.as_str().contains('A'));
    }
}
