//! WebSocket error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("No message received for {idle_ms}ms")]
    IdleTimeout { idle_ms: u64 },

    #[error("Subscription rejected: {0}")]
    HandshakeRejected(String),

    #[error("Reconnect attempts exhausted after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("Fatal: {0}")]
    Fatal(String),

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WsError {
    /// Short label used as the `reason` of reconnect metrics.
    pub fn reason_label(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "connect_failed",
            Self::ConnectionClosed { .. } => "closed",
            Self::IdleTimeout { .. } => "idle_timeout",
            Self::HandshakeRejected(_) => "handshake_rejected",
            Self::ReconnectExhausted { .. } => "exhausted",
            Self::Fatal(_) => "fatal",
            Self::Tungstenite(_) => "transport",
            Self::Json(_) => "json",
        }
    }

    /// Whether this error ends the connector rather than triggering a reconnect.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_) | Self::ReconnectExhausted { .. })
    }
}

pub type WsResult<T> = Result<T, WsError>;
