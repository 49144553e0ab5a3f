//! Instrument identifiers.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest identifier accepted from the feed or configuration.
const MAX_SYMBOL_LEN: usize = 20;

/// Uppercase instrument identifier (e.g., "BTCUSDT").
///
/// Normalized to uppercase on construction so that feed payloads,
/// configuration and stored rows always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.len() > MAX_SYMBOL_LEN
            || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(CoreError::InvalidSymbol(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stream name used by the upstream trade feed (e.g., "btcusdt@trade").
    pub fn trade_stream(&self) -> String {
        format!("{}@trade", self.0.to_ascii_lowercase())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalizes_case() {
        let symbol = Symbol::new("btcUsdt").unwrap();
        assert_eq!(symbol.as_str(), "BTCUSDT");
        assert_eq!(symbol, Symbol::new("BTCUSDT").unwrap());
    }

    #[test]
    fn test_symbol_rejects_invalid() {
        assert!(Symbol::new("").is_err());
        assert!(Symbol::new("   ").is_err());
        assert!(Symbol::new("BTC/USDT").is_err());
        assert!(Symbol::new("xyz:SILVER").is_err());
        assert!(Symbol::new(&"A".repeat(21)).is_err());
    }

    #[test]
    fn test_trade_stream_name() {
        let symbol = Symbol::new("ETHUSDT").unwrap();
        assert_eq!(symbol.trade_stream(), "ethusdt@trade");
    }

    #[test]
    fn test_symbol_serde_validates() {
        let symbol: Symbol = serde_json::from_str("\"ethusdt\"").unwrap();
        assert_eq!(symbol.as_str(), "ETHUSDT");
        assert!(serde_json::from_str::<Symbol>("\"ETH-USDT\"").is_err());
        assert_eq!(serde_json::to_string(&symbol).unwrap(), "\"ETHUSDT\"");
    }
}
