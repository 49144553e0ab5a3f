//! Price series consumed by the analytics engine.

use crate::symbol::Symbol;
use crate::tick::Tick;
use serde::{Deserialize, Serialize};

/// A single (timestamp, price) observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp_ms: i64,
    pub price: f64,
}

impl PricePoint {
    #[inline]
    pub fn new(timestamp_ms: i64, price: f64) -> Self {
        Self {
            timestamp_ms,
            price,
        }
    }
}

/// Time-ordered price observations for one symbol.
///
/// Built fresh from the tick store on every load and discarded after use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: Symbol,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, sorting points by timestamp (stable for equal keys).
    pub fn new(symbol: Symbol, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.timestamp_ms);
        Self { symbol, points }
    }

    /// Build a series from ticks; ticks for other symbols are ignored.
    pub fn from_ticks(symbol: Symbol, ticks: &[Tick]) -> Self {
        let points = ticks
            .iter()
            .filter(|t| t.symbol() == &symbol)
            .map(Tick::price_point)
            .collect();
        Self::new(symbol, points)
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}
