//! Periodic spread alert monitor.
//!
//! Re-evaluates the configured pair on a timer while ingesting and logs
//! status transitions once per change.

use statarb_dashboard::{DashboardResult, PairQuery, PairReport, PairService, PairStatus};
use statarb_store::TickStore;
use statarb_telemetry::Metrics;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tracks the last observed status of one pair.
pub struct AlertMonitor<S> {
    service: Arc<PairService<S>>,
    query: PairQuery,
    last_status: Option<PairStatus>,
}

impl<S: TickStore + 'static> AlertMonitor<S> {
    pub fn new(store: S, query: PairQuery) -> Self {
        Self {
            service: Arc::new(PairService::new(store)),
            query,
            last_status: None,
        }
    }

    pub fn query(&self) -> &PairQuery {
        &self.query
    }

    pub fn last_status(&self) -> Option<PairStatus> {
        self.last_status
    }

    /// Evaluate once. Store reads run on the blocking pool.
    pub async fn evaluate(&mut self) -> Option<PairReport> {
        let service = self.service.clone();
        let query = self.query.clone();
        let result = match tokio::task::spawn_blocking(move || service.report(&query)).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Alert monitor task failed");
                Metrics::analytics_pass("error");
                return None;
            }
        };
        self.observe(result)
    }

    /// Record a report, updating metrics and logging status changes.
    pub fn observe(&mut self, result: DashboardResult<PairReport>) -> Option<PairReport> {
        let pair = self.query.pair_label();
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                warn!(pair = %pair, error = %e, "Pair evaluation failed");
                Metrics::analytics_pass("error");
                return None;
            }
        };

        Metrics::analytics_pass(report.status.as_str());
        match report.latest_z() {
            Some(z) => Metrics::pair_signal(&pair, z, report.is_alert()),
            None => Metrics::pair_alert_cleared(&pair),
        }

        let previous = self.last_status.replace(report.status);
        if previous == Some(report.status) {
            debug!(pair = %pair, status = report.status.as_str(), "Pair status unchanged");
            return Some(report);
        }

        match report.status {
            PairStatus::Alert => warn!(
                pair = %pair,
                z = ?report.latest_z(),
                threshold = self.query.z_threshold,
                "Spread alert raised"
            ),
            PairStatus::Signal if previous == Some(PairStatus::Alert) => info!(
                pair = %pair,
                z = ?report.latest_z(),
                "Spread alert cleared"
            ),
            PairStatus::Signal => info!(pair = %pair, z = ?report.latest_z(), "Pair signal available"),
            PairStatus::WaitingForData => info!(
                pair = %pair,
                reason = report.reason.as_deref().unwrap_or_default(),
                "Pair waiting for data"
            ),
        }

        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statarb_core::{Symbol, Tick};
    use statarb_store::JsonLinesTickStore;
    use tempfile::TempDir;

    fn query() -> PairQuery {
        PairQuery::new(
            Symbol::new("BTCUSDT").unwrap(),
            Symbol::new("ETHUSDT").unwrap(),
            20,
            2.0,
        )
    }

    fn append_pair(store: &JsonLinesTickStore, i: i64, spike: bool) {
        let b = 100.0 + 5.0 * (i as f64 * 0.3).sin();
        let mut a = 2.0 * b + if i % 2 == 0 { 0.05 } else { -0.05 };
        if spike {
            a += 10.0;
        }
        let btc = Symbol::new("BTCUSDT").unwrap();
        let eth = Symbol::new("ETHUSDT").unwrap();
        store.append(&Tick::new(1_000 + i, btc, a, 1.0).unwrap()).unwrap();
        store.append(&Tick::new(1_000 + i, eth, b, 1.0).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonLinesTickStore::new(dir.path()));
        store.initialize().unwrap();
        let mut monitor = AlertMonitor::new(store.clone(), query());

        let report = monitor.evaluate().await.unwrap();
        assert_eq!(report.status, PairStatus::WaitingForData);

        for i in 0..70 {
            append_pair(&store, i, false);
        }
        let report = monitor.evaluate().await.unwrap();
        assert_eq!(report.status, PairStatus::Signal);

        append_pair(&store, 70, true);
        let report = monitor.evaluate().await.unwrap();
        assert_eq!(report.status, PairStatus::Alert);
        assert_eq!(monitor.last_status(), Some(PairStatus::Alert));

        append_pair(&store, 71, false);
        let report = monitor.evaluate().await.unwrap();
        assert_eq!(report.status, PairStatus::Signal);
    }

    #[test]
    fn test_failed_evaluation_keeps_last_status() {
        let dir = TempDir::new().unwrap();
        let mut monitor = AlertMonitor::new(JsonLinesTickStore::new(dir.path()), query());

        let err = statarb_dashboard::DashboardError::Server("boom".to_string());
        assert!(monitor.observe(Err(err)).is_none());
        assert_eq!(monitor.last_status(), None);
    }
}
