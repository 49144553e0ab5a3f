//! Feed error types.

use statarb_core::Symbol;
use thiserror::Error;

/// Per-message decode faults. Never fatal: the message is skipped.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Symbol not in universe: {0}")]
    UnknownSymbol(Symbol),

    #[error("Invalid tick: {0}")]
    InvalidTick(#[from] statarb_core::CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;
