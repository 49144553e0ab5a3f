//! Application configuration.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use statarb_core::Symbol;
use statarb_dashboard::{DashboardConfig, PairQuery, QueryDefaults};
use statarb_feed::RetryPolicy;
use statarb_ws::{BackoffConfig, ConnectionConfig};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "STATARB_CONFIG";

/// Config file used when neither the CLI nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Instrument universe to ingest.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub websocket: WsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

fn default_symbols() -> Vec<String> {
    vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            websocket: WsConfig::default(),
            storage: StorageConfig::default(),
            analytics: AnalyticsConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

/// WebSocket configuration subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// Combined-stream endpoint.
    #[serde(default = "default_ws_url")]
    pub url: String,
    /// Maximum consecutive reconnect attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_initial_delay_ms")]
    pub reconnect_initial_delay_ms: u64,
    #[serde(default = "default_reconnect_multiplier")]
    pub reconnect_multiplier: f64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Upper bound of random jitter added to each reconnect delay (ms).
    #[serde(default = "default_reconnect_jitter_ms")]
    pub reconnect_jitter_ms: u64,
    /// Silence on an established stream that counts as a fault (ms).
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// Consecutive subscription rejections before giving up (0 = never).
    #[serde(default = "default_max_handshake_rejections")]
    pub max_handshake_rejections: u32,
}

fn default_ws_url() -> String {
    "wss://stream.binance.com:9443/stream".to_string()
}

fn default_reconnect_initial_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_multiplier() -> f64 {
    2.0
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

fn default_reconnect_jitter_ms() -> u64 {
    1_000
}

fn default_idle_timeout_ms() -> u64 {
    30_000
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

fn default_max_handshake_rejections() -> u32 {
    3
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: default_ws_url(),
            max_reconnect_attempts: 0,
            reconnect_initial_delay_ms: default_reconnect_initial_delay_ms(),
            reconnect_multiplier: default_reconnect_multiplier(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            reconnect_jitter_ms: default_reconnect_jitter_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            max_handshake_rejections: default_max_handshake_rejections(),
        }
    }
}

impl From<&WsConfig> for ConnectionConfig {
    fn from(cfg: &WsConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            streams: Vec::new(), // Set separately from the symbol universe
            max_reconnect_attempts: cfg.max_reconnect_attempts,
            backoff: BackoffConfig {
                initial_delay_ms: cfg.reconnect_initial_delay_ms,
                multiplier: cfg.reconnect_multiplier,
                max_delay_ms: cfg.reconnect_max_delay_ms,
                jitter_ms: cfg.reconnect_jitter_ms,
            },
            idle_timeout_ms: cfg.idle_timeout_ms,
            handshake_timeout_ms: cfg.handshake_timeout_ms,
            max_handshake_rejections: cfg.max_handshake_rejections,
        }
    }
}

/// Tick store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Attempts per tick, including the first.
    #[serde(default = "default_max_append_attempts")]
    pub max_append_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// Consecutive dropped ticks before the connector stops (0 = never).
    #[serde(default = "default_max_consecutive_drops")]
    pub max_consecutive_drops: u32,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/ticks")
}

fn default_max_append_attempts() -> u32 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    50
}

fn default_retry_max_delay_ms() -> u64 {
    2_000
}

fn default_max_consecutive_drops() -> u32 {
    100
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_append_attempts: default_max_append_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            max_consecutive_drops: default_max_consecutive_drops(),
        }
    }
}

impl StorageConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_append_attempts,
            backoff: BackoffConfig::fixed(self.retry_base_delay_ms, 2.0, self.retry_max_delay_ms),
            max_consecutive_drops: self.max_consecutive_drops,
        }
    }
}

/// Default pair and parameters for the monitor, CLI and HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_symbol_a")]
    pub symbol_a: String,
    #[serde(default = "default_symbol_b")]
    pub symbol_b: String,
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,
    /// Most recent ticks loaded per leg.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Alert monitor period during ingestion (0 = disabled).
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,
}

fn default_symbol_a() -> String {
    "BTCUSDT".to_string()
}

fn default_symbol_b() -> String {
    "ETHUSDT".to_string()
}

fn default_window() -> usize {
    60
}

fn default_z_threshold() -> f64 {
    2.0
}

fn default_limit() -> usize {
    PairQuery::DEFAULT_LIMIT
}

fn default_monitor_interval_ms() -> u64 {
    5_000
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            symbol_a: default_symbol_a(),
            symbol_b: default_symbol_b(),
            window: default_window(),
            z_threshold: default_z_threshold(),
            limit: default_limit(),
            monitor_interval_ms: default_monitor_interval_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration. Path precedence: `cli_path` > `STATARB_CONFIG` >
    /// `config/default.toml`. A missing file yields defaults.
    pub fn load(cli_path: Option<&str>) -> AppResult<Self> {
        let config_path = cli_path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let config = if Path::new(&config_path).exists() {
            tracing::info!(path = %config_path, "Loading configuration");
            Self::from_file(&config_path)?
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn validate(&self) -> AppResult<()> {
        let universe = self.universe()?;
        if universe.is_empty() {
            return Err(AppError::Config("symbol universe is empty".to_string()));
        }

        let ws = &self.websocket;
        if !ws.reconnect_multiplier.is_finite() || ws.reconnect_multiplier < 1.0 {
            return Err(AppError::Config(format!(
                "reconnect multiplier must be >= 1, got {}",
                ws.reconnect_multiplier
            )));
        }
        if ws.reconnect_initial_delay_ms > ws.reconnect_max_delay_ms {
            return Err(AppError::Config(format!(
                "reconnect initial delay {}ms exceeds cap {}ms",
                ws.reconnect_initial_delay_ms, ws.reconnect_max_delay_ms
            )));
        }
        if self.storage.max_append_attempts == 0 {
            return Err(AppError::Config(
                "max_append_attempts must be at least 1".to_string(),
            ));
        }

        let query = self.pair_query()?;
        query
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        for leg in [&query.symbol_a, &query.symbol_b] {
            if !universe.contains(leg) {
                return Err(AppError::Config(format!(
                    "analytics symbol {leg} is not in the symbol universe"
                )));
            }
        }
        Ok(())
    }

    /// Parsed symbol universe, duplicates removed.
    pub fn universe(&self) -> AppResult<Vec<Symbol>> {
        let mut symbols = Vec::with_capacity(self.symbols.len());
        for raw in &self.symbols {
            let symbol = parse_symbol(raw)?;
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        Ok(symbols)
    }

    /// Connector configuration subscribed to every symbol's trade stream.
    pub fn connection_config(&self) -> AppResult<ConnectionConfig> {
        let mut config = ConnectionConfig::from(&self.websocket);
        config.streams = self
            .universe()?
            .iter()
            .map(Symbol::trade_stream)
            .collect();
        Ok(config)
    }

    /// The configured default pair query.
    pub fn pair_query(&self) -> AppResult<PairQuery> {
        let a = &self.analytics;
        Ok(
            PairQuery::new(
                parse_symbol(&a.symbol_a)?,
                parse_symbol(&a.symbol_b)?,
                a.window,
                a.z_threshold,
            )
            .with_limit(a.limit),
        )
    }

    pub fn query_defaults(&self) -> AppResult<QueryDefaults> {
        let query = self.pair_query()?;
        Ok(QueryDefaults {
            symbol_a: query.symbol_a,
            symbol_b: query.symbol_b,
            window: query.window,
            z_threshold: query.z_threshold,
            limit: query.limit,
        })
    }
}

fn parse_symbol(raw: &str) -> AppResult<Symbol> {
    Symbol::new(raw).map_err(|e| AppError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analytics.window, 60);
        assert_eq!(config.analytics.limit, 1000);
        assert!(!config.dashboard.enabled);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            symbols = ["solusdt", "ETHUSDT", "SOLUSDT"]

            [websocket]
            url = "ws://127.0.0.1:9000/stream"
            idle_timeout_ms = 5000

            [analytics]
            symbol_a = "SOLUSDT"
            window = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.websocket.idle_timeout_ms, 5_000);
        assert_eq!(config.websocket.reconnect_max_delay_ms, 60_000);
        assert_eq!(config.storage.max_append_attempts, 5);
        assert_eq!(config.universe().unwrap().len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connection_config_streams() {
        let config = AppConfig::default();
        let connection = config.connection_config().unwrap();
        assert_eq!(connection.streams, vec!["btcusdt@trade", "ethusdt@trade"]);
        assert_eq!(connection.backoff.initial_delay_ms, 1_000);
        assert_eq!(connection.max_handshake_rejections, 3);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.symbols.clear();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let mut config = AppConfig::default();
        config.symbols = vec!["BTC-USDT".to_string()];
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.websocket.reconnect_multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.websocket.reconnect_initial_delay_ms = 120_000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.storage.max_append_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.analytics.window = 1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.analytics.z_threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.analytics.symbol_b = "SOLUSDT".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load(Some("does/not/exist.toml")).unwrap();
        assert_eq!(config.symbols, default_symbols());
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config: AppConfig = toml::from_str(include_str!("../../../config/default.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.websocket.max_handshake_rejections, 3);
        assert_eq!(config.analytics.monitor_interval_ms, 5_000);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("symbols"));
        assert!(toml_str.contains("[websocket]"));
        assert!(toml_str.contains("monitor_interval_ms"));
    }
}
