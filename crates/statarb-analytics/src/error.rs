//! Analytics error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Invalid window: {0} (must be at least 2)")]
    InvalidWindow(usize),

    #[error("Invalid z-score threshold: {0} (must be finite and positive)")]
    InvalidThreshold(f64),

    #[error("Insufficient aligned data: {aligned} aligned rows, window {window}")]
    InsufficientAlignedData { aligned: usize, window: usize },

    #[error("No defined z-score: spread has no variance in any window")]
    NoDefinedZScore,
}

impl AnalyticsError {
    /// Whether more data (or a different window) could resolve this.
    pub fn is_waiting_for_data(&self) -> bool {
        matches!(
            self,
            Self::InsufficientAlignedData { .. } | Self::NoDefinedZScore
        )
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
