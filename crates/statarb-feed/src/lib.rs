//! Trade feed processing.
//!
//! Decodes upstream trade messages into ticks and appends them to the tick
//! store with bounded retry. `TickIngestor` is the `FrameHandler` plugged
//! into the WebSocket connector.

pub mod error;
pub mod ingest;
pub mod parser;

pub use error::{FeedError, FeedResult};
pub use ingest::{IngestStats, RetryPolicy, TickIngestor};
pub use parser::TradeParser;
