//! Shared test fixtures.

#![allow(dead_code)]

pub mod mock_ws;

use std::time::Duration;

/// Combined-stream trade frame.
pub fn trade_frame(symbol: &str, price: f64, trade_time: i64) -> String {
    serde_json::json!({
        "stream": format!("{}@trade", symbol.to_ascii_lowercase()),
        "data": {
            "e": "trade",
            "E": trade_time,
            "s": symbol,
            "t": trade_time,
            "p": price.to_string(),
            "q": "1.0",
            "T": trade_time,
            "m": false
        }
    })
    .to_string()
}

/// Poll `condition` every 20ms until it holds or `limit` passes.
pub async fn wait_until<F>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(limit, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .is_ok()
}
