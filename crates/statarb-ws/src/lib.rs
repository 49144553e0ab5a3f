//! WebSocket client for the upstream trade stream.
//!
//! Provides robust WebSocket connectivity with:
//! - An explicit connection state machine (Connecting, Streaming, Reconnecting, Closed)
//! - Subscription handshake with acknowledgment tracking
//! - Idle-timeout detection (no message within the configured interval)
//! - Exponential, capped, jittered reconnect backoff
//! - Cooperative shutdown via cancellation token
//!
//! Payload handling is delegated to a `FrameHandler`, which runs inline in the
//! receive loop.

pub mod backoff;
pub mod connection;
pub mod error;
pub mod idle;
pub mod message;

pub use backoff::BackoffConfig;
pub use connection::{
    ConnectionConfig, ConnectionManager, ConnectionState, ConnectionStatus, FrameHandler,
    FrameOutcome,
};
pub use error::{WsError, WsResult};
pub use idle::{IdleMonitor, IdleStats};
pub use message::{ControlResponse, SubscribeRequest};
