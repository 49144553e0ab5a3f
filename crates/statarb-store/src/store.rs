//! Tick store contract.

use crate::error::StoreResult;
use statarb_core::{Symbol, Tick};
use std::sync::Arc;

/// Append-only, per-symbol queryable store of ticks.
///
/// One writer appends; any number of readers call `recent` concurrently.
/// Implementations must guarantee that a reader never observes a partially
/// written tick.
pub trait TickStore: Send + Sync {
    /// Ensure the persistent schema exists. Safe to call on every start.
    fn initialize(&self) -> StoreResult<()>;

    /// Durably append one tick. Returns once the write is on stable storage
    /// and visible to subsequent reads.
    fn append(&self, tick: &Tick) -> StoreResult<()>;

    /// Up to `limit` ticks for `symbol` with the latest timestamps, ascending
    /// by timestamp. Empty (not an error) when nothing is stored yet.
    fn recent(&self, symbol: &Symbol, limit: usize) -> StoreResult<Vec<Tick>>;
}

impl<T: TickStore + ?Sized> TickStore for Arc<T> {
    fn initialize(&self) -> StoreResult<()> {
        (**self).initialize()
    }

    fn append(&self, tick: &Tick) -> StoreResult<()> {
        (**self).append(tick)
    }

    fn recent(&self, symbol: &Symbol, limit: usize) -> StoreResult<Vec<Tick>> {
        (**self).recent(symbol, limit)
    }
}
