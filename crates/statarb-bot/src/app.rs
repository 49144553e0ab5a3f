//! Main application orchestration.
//!
//! Coordinates all components:
//! - Tick store lifecycle
//! - WebSocket connector feeding the tick ingestor
//! - HTTP API (optional)
//! - Periodic spread alert monitor

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::monitor::AlertMonitor;
use statarb_dashboard::{run_server, AppState, PairQuery, PairReport, PairService};
use statarb_feed::{IngestStats, TickIngestor, TradeParser};
use statarb_store::{JsonLinesTickStore, TickStore};
use statarb_ws::{ConnectionManager, WsResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Main application.
pub struct Application {
    config: AppConfig,
    store: Arc<JsonLinesTickStore>,
}

impl Application {
    /// Create a new application instance.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let store = Arc::new(JsonLinesTickStore::new(config.storage.data_dir.clone()));
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<JsonLinesTickStore> {
        &self.store
    }

    /// Evaluate one pair against the stored ticks.
    pub async fn analyze(&self, query: PairQuery) -> AppResult<PairReport> {
        let service = PairService::new(self.store.clone());
        let report = tokio::task::spawn_blocking(move || service.report(&query))
            .await
            .map_err(|e| AppError::Task(e.to_string()))??;
        Ok(report)
    }

    /// Ingest until ctrl-c or a fatal connector error.
    pub async fn run(&self) -> AppResult<IngestStats> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal");
        })
        .await
    }

    /// Ingest until `shutdown` resolves or the connector stops on its own.
    pub async fn run_until<F>(&self, shutdown: F) -> AppResult<IngestStats>
    where
        F: std::future::Future<Output = ()>,
    {
        // Storage must be usable before anything connects
        self.store.initialize()?;

        let connection = Arc::new(ConnectionManager::new(self.config.connection_config()?));
        let ingestor = TickIngestor::new(
            TradeParser::new(self.config.universe()?),
            self.store.clone(),
            self.config.storage.retry_policy(),
        );

        info!(
            symbols = ?self.config.symbols,
            url = %self.config.websocket.url,
            data_dir = %self.config.storage.data_dir.display(),
            "Starting ingestion"
        );

        let mut connector = spawn_connector(connection.clone(), ingestor);

        let server_token = CancellationToken::new();
        let server = self.spawn_dashboard(&connection, &server_token)?;

        let mut monitor = AlertMonitor::new(self.store.clone(), self.config.pair_query()?);
        let monitor_enabled = self.config.analytics.monitor_interval_ms > 0;
        let mut monitor_interval = tokio::time::interval(Duration::from_millis(
            self.config.analytics.monitor_interval_ms.max(1),
        ));
        monitor_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tokio::pin!(shutdown);

        let mut finished = None;
        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => break,

                joined = &mut connector => {
                    finished = Some(joined);
                    break;
                }

                _ = monitor_interval.tick(), if monitor_enabled => {
                    monitor.evaluate().await;
                }
            }
        }

        connection.shutdown();
        let joined = match finished {
            Some(joined) => joined,
            None => connector.await,
        };

        server_token.cancel();
        if let Some(server) = server {
            match server.await {
                Ok(Err(e)) => warn!(error = %e, "Dashboard server failed"),
                Err(e) => warn!(error = %e, "Dashboard server task failed"),
                Ok(Ok(())) => {}
            }
        }

        self.store.close()?;

        let (result, stats) = joined.map_err(|e| AppError::Task(e.to_string()))?;
        info!(
            frames = stats.frames,
            appended = stats.appended,
            retries = stats.retries,
            dropped = stats.dropped,
            decode_failures = stats.decode_failures,
            "Ingestion stopped"
        );

        if let Err(e) = result {
            error!(error = %e, "Connector stopped with error");
            return Err(e.into());
        }
        Ok(stats)
    }

    fn spawn_dashboard(
        &self,
        connection: &ConnectionManager,
        token: &CancellationToken,
    ) -> AppResult<Option<JoinHandle<statarb_dashboard::DashboardResult<()>>>> {
        if !self.config.dashboard.enabled {
            return Ok(None);
        }
        let store: Arc<dyn TickStore> = self.store.clone();
        let state = AppState::new(store, connection.status(), self.config.query_defaults()?);
        let config = self.config.dashboard.clone();
        let token = token.clone();
        Ok(Some(tokio::spawn(run_server(state, config, token))))
    }
}

type ConnectorHandle = JoinHandle<(WsResult<()>, IngestStats)>;

fn spawn_connector(
    connection: Arc<ConnectionManager>,
    mut ingestor: TickIngestor<Arc<JsonLinesTickStore>>,
) -> ConnectorHandle {
    tokio::spawn(async move {
        let result = connection.run(&mut ingestor).await;
        (result, ingestor.stats().clone())
    })
}
