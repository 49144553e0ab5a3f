//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<statarb_ws::WsError>),

    #[error("Store error: {0}")]
    Store(#[from] statarb_store::StoreError),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] statarb_dashboard::DashboardError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] statarb_telemetry::TelemetryError),

    #[error("Task error: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<statarb_ws::WsError> for AppError {
    fn from(err: statarb_ws::WsError) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
