//! Durable tick storage for statarb.
//!
//! Ticks are appended to a JSON Lines file (one row per line) by a single
//! writer and read back by any number of readers, each query using its own
//! short-lived file handle. The `SeriesLoader` turns stored ticks into price
//! series for the analytics engine.

pub mod error;
pub mod jsonl;
pub mod loader;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use jsonl::JsonLinesTickStore;
pub use loader::SeriesLoader;
pub use store::TickStore;
