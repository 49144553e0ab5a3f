//! Store error types.

use statarb_core::Symbol;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage initialization failed: {0}")]
    Init(String),

    #[error("Store not initialized: {0}")]
    NotInitialized(String),

    #[error("Storage busy: {0}")]
    Busy(String),

    #[error("Storage write failed: {0}")]
    Write(String),

    #[error("Storage read failed: {0}")]
    Read(String),

    #[error("Insufficient data for {symbol}: {available} of {required} points")]
    InsufficientData {
        symbol: Symbol,
        available: usize,
        required: usize,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Classify an I/O failure on the write path.
    ///
    /// Would-block, interrupted and timed-out conditions mean the medium is
    /// momentarily busy; anything else is a hard write failure.
    pub fn from_write_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut => {
                Self::Busy(err.to_string())
            }
            _ => Self::Write(err.to_string()),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    /// Whether the caller should show a "waiting for data" state instead of an error.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_io_classification() {
        let busy = StoreError::from_write_io(io::Error::from(io::ErrorKind::WouldBlock));
        assert!(busy.is_busy());

        let busy = StoreError::from_write_io(io::Error::from(io::ErrorKind::TimedOut));
        assert!(busy.is_busy());

        let hard = StoreError::from_write_io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(hard, StoreError::Write(_)));
    }
}
