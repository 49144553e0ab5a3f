//! Prometheus metrics for statarb.
//!
//! Covers:
//! - Connector state and reconnects
//! - Tick ingestion (appends, retries, drops, decode failures, latency)
//! - Pair analytics (latest z-score, alert state, pass outcomes)
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, which is a programming error that should
//! crash at startup. These panics only occur during static initialization.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge_vec, register_histogram,
    Counter, CounterVec, Encoder, GaugeVec, Histogram, TextEncoder,
};

/// Connector state machine current state.
/// Labels: state (disconnected/connecting/streaming/reconnecting/closed)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "statarb_ws_state",
        "Connector state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Total reconnection attempts.
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "statarb_ws_reconnect_total",
        "Total connector reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Ticks durably appended to the store.
pub static TICKS_APPENDED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "statarb_ticks_appended_total",
        "Total ticks appended to the store",
        &["symbol"]
    )
    .unwrap()
});

/// Ticks dropped after append retries were exhausted.
pub static TICKS_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "statarb_ticks_dropped_total",
        "Total ticks dropped after exhausting append retries",
        &["symbol"]
    )
    .unwrap()
});

/// Append attempts that failed with a transient error and were retried.
pub static APPEND_RETRIES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "statarb_append_retries_total",
        "Total append retries after transient store errors"
    )
    .unwrap()
});

/// Frames that could not be decoded into a tick.
pub static DECODE_FAILURES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "statarb_decode_failures_total",
        "Total frames that failed to decode"
    )
    .unwrap()
});

/// Append latency including retries.
pub static APPEND_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "statarb_append_latency_ms",
        "Tick append latency in milliseconds",
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 500.0]
    )
    .unwrap()
});

/// Latest defined z-score per pair.
pub static PAIR_ZSCORE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "statarb_pair_zscore",
        "Latest rolling z-score of the pair spread",
        &["pair"]
    )
    .unwrap()
});

/// Alert state per pair (1 = active).
pub static PAIR_ALERT: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "statarb_pair_alert",
        "Pair z-score alert state (1=active)",
        &["pair"]
    )
    .unwrap()
});

/// Analytics passes by outcome.
pub static ANALYTICS_PASSES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "statarb_analytics_passes_total",
        "Total analytics passes",
        &["outcome"]
    )
    .unwrap()
});

const WS_STATES: [&str; 5] = [
    "disconnected",
    "connecting",
    "streaming",
    "reconnecting",
    "closed",
];

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    /// Set connector state. Only the active state is 1.
    pub fn ws_state_set(state: &str) {
        for s in &WS_STATES {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
    }

    /// Record a reconnection.
    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a durable append.
    pub fn tick_appended(symbol: &str, latency_ms: f64) {
        TICKS_APPENDED_TOTAL.with_label_values(&[symbol]).inc();
        APPEND_LATENCY_MS.observe(latency_ms);
    }

    /// Record a dropped tick.
    pub fn tick_dropped(symbol: &str) {
        TICKS_DROPPED_TOTAL.with_label_values(&[symbol]).inc();
    }

    pub fn append_retry() {
        APPEND_RETRIES_TOTAL.inc();
    }

    pub fn decode_failure() {
        DECODE_FAILURES_TOTAL.inc();
    }

    /// Record the latest z-score and alert state for a pair.
    pub fn pair_signal(pair: &str, z_score: f64, alert_active: bool) {
        PAIR_ZSCORE.with_label_values(&[pair]).set(z_score);
        PAIR_ALERT
            .with_label_values(&[pair])
            .set(if alert_active { 1.0 } else { 0.0 });
    }

    /// Clear the alert for a pair that has no defined z-score.
    pub fn pair_alert_cleared(pair: &str) {
        PAIR_ALERT.with_label_values(&[pair]).set(0.0);
    }

    /// Record an analytics pass outcome (signal/alert/waiting/error).
    pub fn analytics_pass(outcome: &str) {
        ANALYTICS_PASSES_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
