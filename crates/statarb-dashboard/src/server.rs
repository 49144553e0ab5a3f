//! HTTP server implementation using axum.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statarb_core::Symbol;
use statarb_store::TickStore;
use statarb_telemetry::Metrics;
use statarb_ws::ConnectionStatus;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::query::{PairQuery, PairService};

/// Values used for query parameters the client leaves out.
#[derive(Debug, Clone)]
pub struct QueryDefaults {
    pub symbol_a: Symbol,
    pub symbol_b: Symbol,
    pub window: usize,
    pub z_threshold: f64,
    pub limit: usize,
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<PairService<Arc<dyn TickStore>>>,
    connection: ConnectionStatus,
    defaults: QueryDefaults,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TickStore>,
        connection: ConnectionStatus,
        defaults: QueryDefaults,
    ) -> Self {
        Self {
            service: Arc::new(PairService::new(store)),
            connection,
            defaults,
        }
    }
}

/// `/api/pair` query string.
#[derive(Debug, Default, Deserialize)]
pub struct PairParams {
    pub a: Option<String>,
    pub b: Option<String>,
    pub window: Option<usize>,
    pub z: Option<f64>,
    pub limit: Option<usize>,
}

impl PairParams {
    fn into_query(self, defaults: &QueryDefaults) -> DashboardResult<PairQuery> {
        let parse = |raw: Option<String>, fallback: &Symbol| -> DashboardResult<Symbol> {
            match raw {
                Some(raw) => {
                    Symbol::new(&raw).map_err(|e| DashboardError::InvalidQuery(e.to_string()))
                }
                None => Ok(fallback.clone()),
            }
        };
        Ok(PairQuery {
            symbol_a: parse(self.a, &defaults.symbol_a)?,
            symbol_b: parse(self.b, &defaults.symbol_b)?,
            window: self.window.unwrap_or(defaults.window),
            z_threshold: self.z.unwrap_or(defaults.z_threshold),
            limit: self.limit.unwrap_or(defaults.limit),
        })
    }
}

/// `/api/health` body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub connection: String,
    /// True whenever the connector is not streaming.
    pub stale: bool,
    pub reconnects: u32,
    pub last_message_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/pair", get(get_pair))
        .route("/api/health", get(get_health))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

/// Evaluate a pair. Store reads run on the blocking pool.
async fn get_pair(
    State(state): State<AppState>,
    Query(params): Query<PairParams>,
) -> Result<Response, DashboardError> {
    let query = params.into_query(&state.defaults)?;
    let service = state.service.clone();

    let report = tokio::task::spawn_blocking(move || service.report(&query))
        .await
        .map_err(|e| DashboardError::Server(e.to_string()))??;

    Ok(Json(report).into_response())
}

async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let connection = state.connection.state();
    Json(HealthResponse {
        connection: connection.to_string(),
        stale: !state.connection.is_streaming(),
        reconnects: state.connection.reconnect_count(),
        last_message_at: state.connection.idle_stats().last_message_at,
    })
}

async fn get_metrics() -> Response {
    match Metrics::gather_text() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Run the HTTP server until `shutdown` is cancelled.
pub async fn run_server(
    state: AppState,
    config: DashboardConfig,
    shutdown: CancellationToken,
) -> DashboardResult<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(addr = %listener.local_addr()?, "Starting dashboard server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Dashboard server stopped");
    Ok(())
}
