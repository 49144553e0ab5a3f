//! statarb-dashboard - pair reports for presentation layers.
//!
//! - `PairService`: loads both legs from the tick store, runs the analytics
//!   engine and maps "not enough data yet" to a waiting state
//! - axum HTTP server exposing the reports, connector health and metrics
//!
//! ```text
//! GET /api/pair?a=BTCUSDT&b=ETHUSDT&window=60&z=2.0&limit=1000 → PairReport
//! GET /api/health                                          → HealthResponse
//! GET /metrics                                             → Prometheus text
//! ```

mod config;
mod error;
mod query;
mod server;

pub use config::DashboardConfig;
pub use error::{DashboardError, DashboardResult};
pub use query::{PairQuery, PairReport, PairService, PairStatus};
pub use server::{create_router, run_server, AppState, HealthResponse, QueryDefaults};
