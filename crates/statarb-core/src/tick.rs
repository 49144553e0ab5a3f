//! Executed trade records.

use crate::error::{CoreError, Result};
use crate::series::PricePoint;
use crate::symbol::Symbol;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One executed trade for one instrument.
///
/// Fields are private: a `Tick` is validated once at construction and never
/// mutated afterwards. The serialized form is the persisted row layout
/// (`timestamp`, `symbol`, `price`, `quantity`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TickRow", into = "TickRow")]
pub struct Tick {
    timestamp_ms: i64,
    symbol: Symbol,
    price: f64,
    quantity: f64,
}

impl Tick {
    /// Create a tick, rejecting non-positive or non-finite price and quantity.
    pub fn new(timestamp_ms: i64, symbol: Symbol, price: f64, quantity: f64) -> Result<Self> {
        if !price.is_finite() || price <= 0.0 {
            return Err(CoreError::InvalidPrice(price));
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(CoreError::InvalidQuantity(quantity));
        }
        Ok(Self {
            timestamp_ms,
            symbol,
            price,
            quantity,
        })
    }

    /// Trade time in milliseconds since epoch, as reported by the feed.
    #[inline]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    #[inline]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    #[inline]
    pub fn price(&self) -> f64 {
        self.price
    }

    #[inline]
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Trade time as a UTC datetime (None if out of chrono's range).
    pub fn traded_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms).single()
    }

    pub fn price_point(&self) -> PricePoint {
        PricePoint::new(self.timestamp_ms, self.price)
    }
}

/// Persisted row layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TickRow {
    timestamp: i64,
    symbol: Symbol,
    price: f64,
    quantity: f64,
}

impl TryFrom<TickRow> for Tick {
    type Error = CoreError;

    fn try_from(row: TickRow) -> Result<Self> {
        Self::new(row.timestamp, row.symbol, row.price, row.quantity)
    }
}

impl From<Tick> for TickRow {
    fn from(tick: Tick) -> Self {
        Self {
            timestamp: tick.timestamp_ms,
            symbol: tick.symbol,
            price: tick.price,
            quantity: tick.quantity,
        }
    }
}
