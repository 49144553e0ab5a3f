//! Trade message parsing.
//!
//! Accepts both the combined-stream envelope
//! `{"stream":"btcusdt@trade","data":{...}}` and a bare trade object.
//! Prices and quantities arrive as decimal strings; the trade time `T` is
//! used as the tick timestamp.

use crate::error::{FeedError, FeedResult};
use serde::Deserialize;
use statarb_core::{Symbol, Tick};
use std::collections::HashSet;

/// Raw trade event.
#[derive(Debug, Deserialize)]
struct TradeEvent {
    #[serde(rename = "e", default)]
    event_type: Option<String>,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    quantity: String,
    #[serde(rename = "T")]
    trade_time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TradeFrame {
    Combined { data: TradeEvent },
    Raw(TradeEvent),
}

impl TradeFrame {
    fn into_event(self) -> TradeEvent {
        match self {
            Self::Combined { data } => data,
            Self::Raw(event) => event,
        }
    }
}

/// Decodes trade frames for a fixed symbol universe.
#[derive(Debug, Clone)]
pub struct TradeParser {
    universe: HashSet<Symbol>,
}

impl TradeParser {
    pub fn new(universe: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            universe: universe.into_iter().collect(),
        }
    }

    pub fn universe(&self) -> &HashSet<Symbol> {
        &self.universe
    }

    /// Decode one text frame into a tick.
    pub fn parse(&self, text: &str) -> FeedResult<Tick> {
        let event = serde_json::from_str::<TradeFrame>(text)
            .map_err(|e| FeedError::Decode(format!("not a trade message: {e}")))?
            .into_event();

        if let Some(event_type) = event.event_type.as_deref() {
            if event_type != "trade" {
                return Err(FeedError::Decode(format!(
                    "unexpected event type: {event_type}"
                )));
            }
        }

        let symbol = Symbol::new(&event.symbol)?;
        if !self.universe.contains(&symbol) {
            return Err(FeedError::UnknownSymbol(symbol));
        }

        let price = parse_decimal("price", &event.price)?;
        let quantity = parse_decimal("quantity", &event.quantity)?;

        Ok(Tick::new(event.trade_time, symbol, price, quantity)?)
    }
}

fn parse_decimal(field: &str, raw: &str) -> FeedResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| FeedError::Decode(format!("invalid {field}: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> TradeParser {
        TradeParser::new([
            Symbol::new("BTCUSDT").unwrap(),
            Symbol::new("ETHUSDT").unwrap(),
        ])
    }

    #[test]
    fn test_parse_combined_envelope() {
        let text = r#"{"stream":"btcusdt@trade","data":{"e":"trade","E":1700000000123,"s":"BTCUSDT","t":42,"p":"43250.10","q":"0.015","T":1700000000120,"m":true,"M":true}}"#;
        let tick = parser().parse(text).unwrap();
        assert_eq!(tick.symbol().as_str(), "BTCUSDT");
        assert_eq!(tick.timestamp_ms(), 1_700_000_000_120);
        assert_eq!(tick.price(), 43250.10);
        assert_eq!(tick.quantity(), 0.015);
    }

    #[test]
    fn test_parse_raw_trade() {
        let text = r#"{"e":"trade","E":2,"s":"ETHUSDT","t":7,"p":"2250.5","q":"1.2","T":1,"m":false}"#;
        let tick = parser().parse(text).unwrap();
        assert_eq!(tick.symbol().as_str(), "ETHUSDT");
        assert_eq!(tick.timestamp_ms(), 1);
    }

    #[test]
    fn test_unknown_symbol_rejected() {
        let text = r#"{"e":"trade","s":"SOLUSDT","p":"100","q":"1","T":1}"#;
        assert!(matches!(
            parser().parse(text),
            Err(FeedError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_malformed_messages_rejected() {
        let p = parser();
        assert!(matches!(p.parse("not json"), Err(FeedError::Decode(_))));
        // Missing trade time
        assert!(p
            .parse(r#"{"e":"trade","s":"BTCUSDT","p":"1","q":"1"}"#)
            .is_err());
        // Non-numeric price
        assert!(matches!(
            p.parse(r#"{"e":"trade","s":"BTCUSDT","p":"abc","q":"1","T":1}"#),
            Err(FeedError::Decode(_))
        ));
        // Zero price
        assert!(matches!(
            p.parse(r#"{"e":"trade","s":"BTCUSDT","p":"0","q":"1","T":1}"#),
            Err(FeedError::InvalidTick(_))
        ));
        // Wrong event type
        assert!(matches!(
            p.parse(r#"{"e":"aggTrade","s":"BTCUSDT","p":"1","q":"1","T":1}"#),
            Err(FeedError::Decode(_))
        ));
    }
}
