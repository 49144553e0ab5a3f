//! Prometheus metrics and structured logging for statarb.
//!
//! - Prometheus metrics for the connector, ingestion and pair analytics
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
