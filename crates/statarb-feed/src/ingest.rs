//! Tick ingestion: decode, then append with bounded retry.

use crate::parser::TradeParser;
use statarb_core::Tick;
use statarb_store::TickStore;
use statarb_telemetry::Metrics;
use statarb_ws::{BackoffConfig, FrameHandler, FrameOutcome};
use std::time::Instant;
use tracing::{error, trace, warn};

/// Append retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per tick, including the first (at least 1).
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: BackoffConfig,
    /// Consecutive dropped ticks that mean storage is gone (0 = never fatal).
    pub max_consecutive_drops: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: BackoffConfig::fixed(50, 2.0, 2_000),
            max_consecutive_drops: 100,
        }
    }
}

/// Ingestion counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub frames: u64,
    pub appended: u64,
    pub retries: u64,
    pub dropped: u64,
    pub decode_failures: u64,
    pub consecutive_drops: u32,
}

/// Turns trade frames into durably stored ticks.
///
/// Ticks are appended in receive order. A frame that fails to decode is
/// logged, counted and skipped.
pub struct TickIngestor<S> {
    parser: TradeParser,
    store: S,
    policy: RetryPolicy,
    stats: IngestStats,
}

impl<S: TickStore> TickIngestor<S> {
    pub fn new(parser: TradeParser, store: S, policy: RetryPolicy) -> Self {
        Self {
            parser,
            store,
            policy,
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle one text frame.
    pub async fn ingest(&mut self, payload: &str) -> FrameOutcome {
        self.stats.frames += 1;

        let tick = match self.parser.parse(payload) {
            Ok(tick) => tick,
            Err(e) => {
                self.stats.decode_failures += 1;
                Metrics::decode_failure();
                warn!(error = %e, "Skipping undecodable frame");
                return FrameOutcome::Continue;
            }
        };

        if self.append_with_retry(&tick).await {
            self.stats.consecutive_drops = 0;
            return FrameOutcome::Continue;
        }

        self.stats.dropped += 1;
        self.stats.consecutive_drops += 1;
        Metrics::tick_dropped(tick.symbol().as_str());

        let limit = self.policy.max_consecutive_drops;
        if limit > 0 && self.stats.consecutive_drops >= limit {
            error!(
                consecutive_drops = self.stats.consecutive_drops,
                "Tick store persistently unavailable"
            );
            return FrameOutcome::Fatal(format!(
                "tick store unavailable: {} consecutive ticks dropped",
                self.stats.consecutive_drops
            ));
        }

        FrameOutcome::Continue
    }

    /// Returns false when the tick was dropped.
    async fn append_with_retry(&mut self, tick: &Tick) -> bool {
        let started = Instant::now();
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.store.append(tick) {
                Ok(()) => {
                    self.stats.appended += 1;
                    Metrics::tick_appended(
                        tick.symbol().as_str(),
                        started.elapsed().as_secs_f64() * 1_000.0,
                    );
                    trace!(symbol = %tick.symbol(), ts = tick.timestamp_ms(), "Tick appended");
                    return true;
                }
                Err(e) if attempt < max_attempts => {
                    self.stats.retries += 1;
                    Metrics::append_retry();
                    let delay = self.policy.backoff.delay(attempt);
                    warn!(
                        symbol = %tick.symbol(),
                        attempt,
                        busy = e.is_busy(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Append failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        symbol = %tick.symbol(),
                        ts = tick.timestamp_ms(),
                        attempts = attempt,
                        error = %e,
                        "Dropping tick after exhausting append retries"
                    );
                }
            }
        }

        false
    }
}

impl<S: TickStore> FrameHandler for TickIngestor<S> {
    async fn on_frame(&mut self, payload: &str) -> FrameOutcome {
        self.ingest(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::{mock, predicate::always, Sequence};
    use statarb_core::Symbol;
    use statarb_store::{JsonLinesTickStore, StoreError, StoreResult};
    use tempfile::TempDir;

    mock! {
        pub Store {}

        impl TickStore for Store {
            fn initialize(&self) -> StoreResult<()>;
            fn append(&self, tick: &Tick) -> StoreResult<()>;
            fn recent(&self, symbol: &Symbol, limit: usize) -> StoreResult<Vec<Tick>>;
        }
    }

    const BTC_TRADE: &str =
        r#"{"stream":"btcusdt@trade","data":{"e":"trade","s":"BTCUSDT","p":"43000.5","q":"0.1","T":1000}}"#;

    fn parser() -> TradeParser {
        TradeParser::new([
            Symbol::new("BTCUSDT").unwrap(),
            Symbol::new("ETHUSDT").unwrap(),
        ])
    }

    fn policy(max_attempts: u32, max_consecutive_drops: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: BackoffConfig::fixed(10, 2.0, 100),
            max_consecutive_drops,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_store_retried_until_success() {
        let mut store = MockStore::new();
        let mut seq = Sequence::new();
        store
            .expect_append()
            .with(always())
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(StoreError::Busy("locked".into())));
        store
            .expect_append()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mut ingestor = TickIngestor::new(parser(), store, policy(5, 3));
        assert_eq!(ingestor.ingest(BTC_TRADE).await, FrameOutcome::Continue);

        let stats = ingestor.stats();
        assert_eq!(stats.appended, 1);
        assert_eq!(stats.retries, 2);
        assert_eq!(stats.dropped, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_drop_tick_and_continue() {
        let mut store = MockStore::new();
        store
            .expect_append()
            .times(3)
            .returning(|_| Err(StoreError::Write("disk full".into())));

        let mut ingestor = TickIngestor::new(parser(), store, policy(3, 0));
        assert_eq!(ingestor.ingest(BTC_TRADE).await, FrameOutcome::Continue);
        assert_eq!(ingestor.stats().dropped, 1);
        assert_eq!(ingestor.stats().retries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_is_fatal() {
        let mut store = MockStore::new();
        store
            .expect_append()
            .returning(|_| Err(StoreError::Write("io".into())));

        let mut ingestor = TickIngestor::new(parser(), store, policy(2, 2));
        assert_eq!(ingestor.ingest(BTC_TRADE).await, FrameOutcome::Continue);
        match ingestor.ingest(BTC_TRADE).await {
            FrameOutcome::Fatal(reason) => assert!(reason.contains("2 consecutive")),
            other => panic!("expected fatal outcome, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_append_resets_drop_streak() {
        let mut store = MockStore::new();
        let mut seq = Sequence::new();
        store
            .expect_append()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(StoreError::Write("io".into())));
        store
            .expect_append()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        store
            .expect_append()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(StoreError::Write("io".into())));

        let mut ingestor = TickIngestor::new(parser(), store, policy(1, 2));
        assert_eq!(ingestor.ingest(BTC_TRADE).await, FrameOutcome::Continue);
        assert_eq!(ingestor.ingest(BTC_TRADE).await, FrameOutcome::Continue);
        assert_eq!(ingestor.ingest(BTC_TRADE).await, FrameOutcome::Continue);
        assert_eq!(ingestor.stats().consecutive_drops, 1);
        assert_eq!(ingestor.stats().dropped, 2);
    }

    #[tokio::test]
    async fn test_decode_failures_skipped_without_append() {
        let mut store = MockStore::new();
        store.expect_append().never();

        let mut ingestor = TickIngestor::new(parser(), store, policy(3, 1));
        assert_eq!(ingestor.ingest("garbage").await, FrameOutcome::Continue);
        assert_eq!(
            ingestor
                .ingest(r#"{"e":"trade","s":"DOGEUSDT","p":"0.1","q":"5","T":1}"#)
                .await,
            FrameOutcome::Continue
        );
        assert_eq!(ingestor.stats().decode_failures, 2);
        assert_eq!(ingestor.stats().frames, 2);
    }

    #[tokio::test]
    async fn test_decoded_frames_persisted_to_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonLinesTickStore::new(temp_dir.path());
        store.initialize().unwrap();

        let mut ingestor = TickIngestor::new(parser(), store, RetryPolicy::default());
        for (ts, price) in [(3, "10.0"), (1, "11.0"), (2, "12.0")] {
            let frame = format!(
                r#"{{"e":"trade","s":"ETHUSDT","p":"{price}","q":"1","T":{ts}}}"#
            );
            assert_eq!(ingestor.ingest(&frame).await, FrameOutcome::Continue);
        }

        let eth = Symbol::new("ETHUSDT").unwrap();
        let ticks = ingestor.store().recent(&eth, 10).unwrap();
        let prices: Vec<f64> = ticks.iter().map(|t| t.price()).collect();
        // recent() sorts by timestamp
        assert_eq!(prices, vec![11.0, 12.0, 10.0]);
        assert_eq!(ingestor.stats().appended, 3);
    }
}
