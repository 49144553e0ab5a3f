//! Pair report queries.

use crate::error::{DashboardError, DashboardResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statarb_analytics::{AnalyticsError, PairAnalytics, PairsEngine};
use statarb_core::Symbol;
use statarb_store::{SeriesLoader, StoreError, TickStore};
use tracing::debug;

/// What to analyze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairQuery {
    pub symbol_a: Symbol,
    pub symbol_b: Symbol,
    pub window: usize,
    pub z_threshold: f64,
    /// Most recent ticks loaded per leg.
    pub limit: usize,
}

impl PairQuery {
    pub const DEFAULT_LIMIT: usize = 1000;
    pub const MIN_WINDOW: usize = 2;
    pub const MAX_WINDOW: usize = 5000;

    pub fn new(symbol_a: Symbol, symbol_b: Symbol, window: usize, z_threshold: f64) -> Self {
        Self {
            symbol_a,
            symbol_b,
            window,
            z_threshold,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn validate(&self) -> DashboardResult<()> {
        if self.symbol_a == self.symbol_b {
            return Err(DashboardError::InvalidQuery(format!(
                "pair legs must differ, got {} twice",
                self.symbol_a
            )));
        }
        if !(Self::MIN_WINDOW..=Self::MAX_WINDOW).contains(&self.window) {
            return Err(DashboardError::InvalidQuery(format!(
                "window {} outside {}..={}",
                self.window,
                Self::MIN_WINDOW,
                Self::MAX_WINDOW
            )));
        }
        if !self.z_threshold.is_finite() || self.z_threshold <= 0.0 {
            return Err(DashboardError::InvalidQuery(format!(
                "z threshold must be positive, got {}",
                self.z_threshold
            )));
        }
        if self.limit < self.window {
            return Err(DashboardError::InvalidQuery(format!(
                "limit {} is smaller than window {}",
                self.limit, self.window
            )));
        }
        Ok(())
    }

    pub fn pair_label(&self) -> String {
        format!("{}/{}", self.symbol_a, self.symbol_b)
    }
}

/// Report status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    /// Not enough data of some kind; see `reason`.
    WaitingForData,
    Signal,
    Alert,
}

impl PairStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingForData => "waiting_for_data",
            Self::Signal => "signal",
            Self::Alert => "alert",
        }
    }
}

/// Answer to a `PairQuery`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairReport {
    pub pair: String,
    pub status: PairStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub generated_at: DateTime<Utc>,
    /// Present whenever the aligned frame covered the window, including the
    /// waiting case where no z-score is defined yet.
    pub analytics: Option<PairAnalytics>,
}

impl PairReport {
    fn waiting(query: &PairQuery, reason: String, analytics: Option<PairAnalytics>) -> Self {
        Self {
            pair: query.pair_label(),
            status: PairStatus::WaitingForData,
            reason: Some(reason),
            generated_at: Utc::now(),
            analytics,
        }
    }

    pub fn latest_z(&self) -> Option<f64> {
        self.analytics.as_ref().and_then(|a| a.latest_z)
    }

    pub fn is_alert(&self) -> bool {
        self.status == PairStatus::Alert
    }
}

/// Loads pair legs from the store and evaluates them.
pub struct PairService<S> {
    loader: SeriesLoader<S>,
}

impl<S: TickStore> PairService<S> {
    pub fn new(store: S) -> Self {
        Self {
            loader: SeriesLoader::new(store),
        }
    }

    /// Produce a report. Missing data yields `WaitingForData`, not an error;
    /// errors are invalid queries and store failures.
    pub fn report(&self, query: &PairQuery) -> DashboardResult<PairReport> {
        query.validate()?;
        let engine = PairsEngine::new(query.window, query.z_threshold)
            .map_err(|e| DashboardError::InvalidQuery(e.to_string()))?;

        let series_a = match self.load_leg(&query.symbol_a, query)? {
            Ok(series) => series,
            Err(reason) => return Ok(PairReport::waiting(query, reason, None)),
        };
        let series_b = match self.load_leg(&query.symbol_b, query)? {
            Ok(series) => series,
            Err(reason) => return Ok(PairReport::waiting(query, reason, None)),
        };

        let analytics = match engine.compute(&series_a, &series_b) {
            Ok(analytics) => analytics,
            Err(e) if e.is_waiting_for_data() => {
                debug!(pair = %query.pair_label(), reason = %e, "Pair waiting for data");
                return Ok(PairReport::waiting(query, e.to_string(), None));
            }
            Err(e) => return Err(DashboardError::InvalidQuery(e.to_string())),
        };

        if analytics.latest_z.is_none() {
            let reason = AnalyticsError::NoDefinedZScore.to_string();
            return Ok(PairReport::waiting(query, reason, Some(analytics)));
        }

        let status = if analytics.alert_active {
            PairStatus::Alert
        } else {
            PairStatus::Signal
        };

        Ok(PairReport {
            pair: query.pair_label(),
            status,
            reason: None,
            generated_at: Utc::now(),
            analytics: Some(analytics),
        })
    }

    /// Outer error is a store failure; inner error is a waiting reason.
    fn load_leg(
        &self,
        symbol: &Symbol,
        query: &PairQuery,
    ) -> DashboardResult<Result<statarb_core::PriceSeries, String>> {
        match self.loader.load(symbol, query.limit, query.window) {
            Ok(series) => Ok(Ok(series)),
            Err(e @ StoreError::InsufficientData { .. }) => Ok(Err(e.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statarb_core::Tick;
    use statarb_store::JsonLinesTickStore;
    use tempfile::TempDir;

    fn btc() -> Symbol {
        Symbol::new("BTCUSDT").unwrap()
    }

    fn eth() -> Symbol {
        Symbol::new("ETHUSDT").unwrap()
    }

    fn seeded_store(dir: &TempDir, n: i64, spike_at: Option<i64>) -> JsonLinesTickStore {
        let store = JsonLinesTickStore::new(dir.path());
        store.initialize().unwrap();
        for i in 0..n {
            let b = 100.0 + 5.0 * (i as f64 * 0.3).sin();
            let mut a = 2.0 * b + if i % 2 == 0 { 0.05 } else { -0.05 };
            if spike_at == Some(i) {
                a += 10.0;
            }
            store.append(&Tick::new(1_000 + i, btc(), a, 1.0).unwrap()).unwrap();
            store.append(&Tick::new(1_000 + i, eth(), b, 1.0).unwrap()).unwrap();
        }
        store
    }

    #[test]
    fn test_query_validation() {
        let same = PairQuery::new(btc(), btc(), 20, 2.0);
        assert!(matches!(same.validate(), Err(DashboardError::InvalidQuery(_))));

        let too_big = PairQuery::new(btc(), eth(), 5001, 2.0);
        assert!(too_big.validate().is_err());

        let bad_z = PairQuery::new(btc(), eth(), 20, -1.0);
        assert!(bad_z.validate().is_err());

        let small_limit = PairQuery::new(btc(), eth(), 20, 2.0).with_limit(10);
        assert!(small_limit.validate().is_err());

        assert!(PairQuery::new(btc(), eth(), 60, 2.0).validate().is_ok());
    }

    #[test]
    fn test_empty_store_is_waiting() {
        let dir = TempDir::new().unwrap();
        let store = JsonLinesTickStore::new(dir.path());
        store.initialize().unwrap();
        let service = PairService::new(store);

        let report = service
            .report(&PairQuery::new(btc(), eth(), 20, 2.0))
            .unwrap();
        assert_eq!(report.status, PairStatus::WaitingForData);
        assert!(report.reason.unwrap().contains("BTCUSDT"));
        assert!(report.analytics.is_none());
    }

    #[test]
    fn test_signal_report() {
        let dir = TempDir::new().unwrap();
        let service = PairService::new(seeded_store(&dir, 100, None));

        let report = service
            .report(&PairQuery::new(btc(), eth(), 20, 2.0))
            .unwrap();
        assert_eq!(report.status, PairStatus::Signal);
        assert_eq!(report.pair, "BTCUSDT/ETHUSDT");
        let analytics = report.analytics.unwrap();
        assert_eq!(analytics.len(), 100);
        assert!((analytics.hedge_ratio - 2.0).abs() < 1e-2);
    }

    #[test]
    fn test_alert_report_when_spike_is_latest() {
        let dir = TempDir::new().unwrap();
        let service = PairService::new(seeded_store(&dir, 71, Some(70)));

        let report = service
            .report(&PairQuery::new(btc(), eth(), 20, 2.0))
            .unwrap();
        assert_eq!(report.status, PairStatus::Alert);
        assert!(report.is_alert());
        assert!(report.latest_z().unwrap() > 2.0);
    }

    #[test]
    fn test_serialized_status_is_snake_case() {
        let dir = TempDir::new().unwrap();
        let store = JsonLinesTickStore::new(dir.path());
        store.initialize().unwrap();
        let report = PairService::new(store)
            .report(&PairQuery::new(btc(), eth(), 20, 2.0))
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "waiting_for_data");
        assert!(json["analytics"].is_null());
    }
}
