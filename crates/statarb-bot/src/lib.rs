//! Statistical arbitrage pairs monitor.
//!
//! Main application that wires the components together:
//! - WebSocket trade feed connector
//! - Durable tick ingestion
//! - On-demand pairs analytics (CLI, HTTP API)
//! - Periodic spread alert monitor

pub mod app;
pub mod config;
pub mod error;
pub mod monitor;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use monitor::AlertMonitor;
