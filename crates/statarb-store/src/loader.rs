//! Price series loading for analytics.

use crate::error::{StoreError, StoreResult};
use crate::store::TickStore;
use statarb_core::{PriceSeries, Symbol};
use tracing::debug;

/// Reads recent ticks from a store and shapes them into a price series.
pub struct SeriesLoader<S> {
    store: S,
}

impl<S: TickStore> SeriesLoader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load up to `limit` recent prices for `symbol`.
    ///
    /// Fails with `InsufficientData` when fewer than `min_points` are stored;
    /// callers pass their rolling window size so that no rolling statistic is
    /// computed over an under-filled series.
    pub fn load(&self, symbol: &Symbol, limit: usize, min_points: usize) -> StoreResult<PriceSeries> {
        let ticks = self.store.recent(symbol, limit)?;

        if ticks.len() < min_points {
            debug!(
                symbol = %symbol,
                available = ticks.len(),
                required = min_points,
                "Not enough ticks for series"
            );
            return Err(StoreError::InsufficientData {
                symbol: symbol.clone(),
                available: ticks.len(),
                required: min_points,
            });
        }

        Ok(PriceSeries::from_ticks(symbol.clone(), &ticks))
    }
}
