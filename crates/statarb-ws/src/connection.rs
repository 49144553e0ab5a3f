//! WebSocket connection manager.
//!
//! Runs the connector state machine: connect, subscribe and wait for the
//! acknowledgment, stream frames into a `FrameHandler`, and reconnect with
//! backoff on any fault until shutdown or a fatal condition.

use crate::backoff::BackoffConfig;
use crate::error::{WsError, WsResult};
use crate::idle::{IdleMonitor, IdleStats};
use crate::message::{ControlResponse, SubscribeRequest};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use statarb_telemetry::Metrics;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_tls_with_config, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL of the stream endpoint.
    pub url: String,
    /// Streams to subscribe to (e.g., "btcusdt@trade").
    pub streams: Vec<String>,
    /// Maximum consecutive reconnect attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Reconnect backoff.
    pub backoff: BackoffConfig,
    /// Maximum silence on an established stream.
    pub idle_timeout_ms: u64,
    /// Bound on connecting and on waiting for the subscription ack.
    pub handshake_timeout_ms: u64,
    /// Consecutive handshake rejections before giving up (0 = never).
    pub max_handshake_rejections: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "wss://stream.binance.com:9443/stream".to_string(),
            streams: Vec::new(),
            max_reconnect_attempts: 0, // Infinite
            backoff: BackoffConfig::default(),
            idle_timeout_ms: 30_000,
            handshake_timeout_ms: 10_000,
            max_handshake_rejections: 3,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Streaming,
    Reconnecting,
    /// Terminal.
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of handling one data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    /// Stop the connector; the reason is reported as `WsError::Fatal`.
    Fatal(String),
}

/// Consumer of data frames.
///
/// Called inline in the receive loop. The shutdown signal is not observed
/// while a frame is being handled, so the returned future always runs to
/// completion.
pub trait FrameHandler: Send {
    fn on_frame(&mut self, payload: &str) -> impl Future<Output = FrameOutcome> + Send;
}

/// Read-only view of the connector, cheap to clone.
#[derive(Clone)]
pub struct ConnectionStatus {
    state: Arc<RwLock<ConnectionState>>,
    reconnect_count: Arc<RwLock<u32>>,
    idle: Arc<IdleMonitor>,
}

impl ConnectionStatus {
    fn new(idle_timeout_ms: u64) -> Self {
        Self {
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            reconnect_count: Arc::new(RwLock::new(0)),
            idle: Arc::new(IdleMonitor::new(idle_timeout_ms)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_streaming(&self) -> bool {
        self.state() == ConnectionState::Streaming
    }

    /// Total reconnects since start.
    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.read()
    }

    pub fn idle_stats(&self) -> IdleStats {
        self.idle.stats()
    }
}

/// How a single connection ended.
enum SessionEnd {
    Shutdown,
    Fatal(String),
    Fault { error: WsError, streamed: bool },
}

enum Handshake {
    Acknowledged,
    Shutdown,
    Fatal(String),
}

/// WebSocket connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    status: ConnectionStatus,
    next_request_id: AtomicU64,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig) -> Self {
        let status = ConnectionStatus::new(config.idle_timeout_ms);
        Self {
            config,
            status,
            next_request_id: AtomicU64::new(1),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        self.status.state()
    }

    /// Shareable status handle for health reporting.
    pub fn status(&self) -> ConnectionStatus {
        self.status.clone()
    }

    /// Signal graceful shutdown.
    ///
    /// Observed while waiting for a frame, during connect, during the
    /// handshake and during backoff.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Run the connector until shutdown (`Ok`) or a fatal condition (`Err`).
    ///
    /// The state is `Closed` when this returns.
    pub async fn run<H: FrameHandler>(&self, handler: &mut H) -> WsResult<()> {
        let mut attempt = 0u32;
        let mut rejections = 0u32;

        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                self.set_state(ConnectionState::Closed);
                return Ok(());
            }

            self.set_state(ConnectionState::Connecting);

            let fault = match self.run_session(handler).await {
                SessionEnd::Shutdown => {
                    self.set_state(ConnectionState::Closed);
                    return Ok(());
                }
                SessionEnd::Fatal(reason) => {
                    error!(%reason, "Frame handler reported a fatal condition");
                    self.set_state(ConnectionState::Closed);
                    return Err(WsError::Fatal(reason));
                }
                SessionEnd::Fault { error, streamed } => {
                    if streamed {
                        attempt = 0;
                        rejections = 0;
                    }
                    error
                }
            };

            if matches!(fault, WsError::HandshakeRejected(_)) {
                rejections += 1;
                if self.config.max_handshake_rejections > 0
                    && rejections >= self.config.max_handshake_rejections
                {
                    error!(rejections, error = %fault, "Subscription rejected repeatedly");
                    self.set_state(ConnectionState::Closed);
                    return Err(WsError::Fatal(format!(
                        "subscription rejected {rejections} consecutive times: {fault}"
                    )));
                }
            }

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                self.set_state(ConnectionState::Closed);
                return Ok(());
            }

            attempt += 1;
            if self.config.max_reconnect_attempts > 0
                && attempt > self.config.max_reconnect_attempts
            {
                error!(attempt, error = %fault, "Max reconnection attempts reached");
                self.set_state(ConnectionState::Closed);
                return Err(WsError::ReconnectExhausted {
                    attempts: self.config.max_reconnect_attempts,
                });
            }

            *self.status.reconnect_count.write() += 1;
            Metrics::ws_reconnect(fault.reason_label());
            self.set_state(ConnectionState::Reconnecting);

            let delay = self.config.backoff.delay(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %fault,
                "Reconnecting"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during backoff, exiting");
                    self.set_state(ConnectionState::Closed);
                    return Ok(());
                }
            }
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = std::mem::replace(&mut *self.status.state.write(), next);
        if previous != next {
            info!(from = %previous, to = %next, "Connection state changed");
            Metrics::ws_state_set(next.as_str());
        }
    }

    fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.config.handshake_timeout_ms)
    }

    async fn run_session<H: FrameHandler>(&self, handler: &mut H) -> SessionEnd {
        let (mut write, mut read) = match self.open().await {
            Ok(Some(halves)) => halves,
            Ok(None) => return SessionEnd::Shutdown,
            Err(error) => {
                return SessionEnd::Fault {
                    error,
                    streamed: false,
                }
            }
        };

        match self.subscribe(&mut write, &mut read, handler).await {
            Ok(Handshake::Acknowledged) => {}
            Ok(Handshake::Shutdown) => {
                send_close(&mut write).await;
                return SessionEnd::Shutdown;
            }
            Ok(Handshake::Fatal(reason)) => {
                send_close(&mut write).await;
                return SessionEnd::Fatal(reason);
            }
            Err(error) => {
                return SessionEnd::Fault {
                    error,
                    streamed: false,
                }
            }
        }

        self.status.idle.reset();
        self.set_state(ConnectionState::Streaming);
        info!(streams = ?self.config.streams, "Subscription acknowledged");

        match self.stream(&mut write, &mut read, handler).await {
            Ok(end) => end,
            Err(error) => SessionEnd::Fault {
                error,
                streamed: true,
            },
        }
    }

    /// Connect, or `None` if shutdown was requested first.
    async fn open(&self) -> WsResult<Option<(WsSink, WsSource)>> {
        info!(url = %self.config.url, "Connecting to WebSocket");

        let connect = tokio::time::timeout(
            self.handshake_timeout(),
            // TCP_NODELAY: trades are small and latency-sensitive
            connect_async_tls_with_config(&self.config.url, None, true, None),
        );

        tokio::select! {
            biased;
            () = self.shutdown_token.cancelled() => Ok(None),
            result = connect => match result {
                Ok(Ok((ws_stream, _response))) => {
                    info!("WebSocket connected");
                    Ok(Some(ws_stream.split()))
                }
                Ok(Err(e)) => Err(WsError::ConnectionFailed(e.to_string())),
                Err(_) => Err(WsError::ConnectionFailed(format!(
                    "connect timed out after {}ms",
                    self.config.handshake_timeout_ms
                ))),
            },
        }
    }

    /// Send the subscription and wait for its acknowledgment.
    async fn subscribe<H: FrameHandler>(
        &self,
        write: &mut WsSink,
        read: &mut WsSource,
        handler: &mut H,
    ) -> WsResult<Handshake> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let request = SubscribeRequest::new(request_id, self.config.streams.clone());
        write
            .send(Message::Text(serde_json::to_string(&request)?))
            .await?;
        debug!(request_id, streams = ?self.config.streams, "Subscription sent");

        let deadline = tokio::time::Instant::now() + self.handshake_timeout();

        loop {
            tokio::select! {
                biased;
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received during handshake");
                    return Ok(Handshake::Shutdown);
                }
                () = tokio::time::sleep_until(deadline) => {
                    return Err(WsError::HandshakeRejected(format!(
                        "no acknowledgment for request {request_id} within {}ms",
                        self.config.handshake_timeout_ms
                    )));
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.status.idle.record_activity();
                            if let Some(response) = ControlResponse::parse(&text) {
                                if !response.is_for(request_id) {
                                    debug!(id = ?response.id, "Ignoring response to another request");
                                    continue;
                                }
                                if let Some(reason) = response.rejection() {
                                    warn!(request_id, %reason, "Subscription rejected");
                                    return Err(WsError::HandshakeRejected(reason));
                                }
                                return Ok(Handshake::Acknowledged);
                            }
                            // Data may arrive ahead of the ack.
                            if let FrameOutcome::Fatal(reason) = handler.on_frame(&text).await {
                                return Ok(Handshake::Fatal(reason));
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => return Err(close_error(frame)),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Err(stream_ended()),
                    }
                }
            }
        }
    }

    /// Streaming loop. `Err` is a transient fault; `Ok` ends the connector.
    async fn stream<H: FrameHandler>(
        &self,
        write: &mut WsSink,
        read: &mut WsSource,
        handler: &mut H,
    ) -> WsResult<SessionEnd> {
        let idle = &self.status.idle;

        loop {
            let idle_wait = tokio::time::sleep(idle.remaining());

            tokio::select! {
                biased;
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    send_close(write).await;
                    return Ok(SessionEnd::Shutdown);
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            idle.record_activity();
                            if let Some(response) = ControlResponse::parse(&text) {
                                debug!(?response, "Control response while streaming");
                                continue;
                            }
                            if let FrameOutcome::Fatal(reason) = handler.on_frame(&text).await {
                                send_close(write).await;
                                return Ok(SessionEnd::Fatal(reason));
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            idle.record_activity();
                            debug!("Received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let error = close_error(frame);
                            warn!(%error, "WebSocket closed by server");
                            return Err(error);
                        }
                        Some(Ok(_)) => idle.record_activity(),
                        Some(Err(e)) => {
                            error!(?e, "WebSocket read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return Err(stream_ended());
                        }
                    }
                }
                () = idle_wait => {
                    if idle.is_timed_out() {
                        let idle_ms = idle.idle_for().as_millis() as u64;
                        error!(idle_ms, "No message within idle timeout");
                        return Err(WsError::IdleTimeout { idle_ms });
                    }
                }
            }
        }
    }
}

async fn send_close(write: &mut WsSink) {
    if let Err(e) = write.send(Message::Close(None)).await {
        warn!(?e, "Failed to send Close frame");
    }
}

fn close_error(frame: Option<CloseFrame<'_>>) -> WsError {
    let (code, reason) = frame
        .map(|f| (f.code.into(), f.reason.to_string()))
        .unwrap_or((1000, "Normal close".to_string()));
    WsError::ConnectionClosed { code, reason }
}

fn stream_ended() -> WsError {
    WsError::ConnectionClosed {
        code: 1006,
        reason: "stream ended".to_string(),
    }
}
