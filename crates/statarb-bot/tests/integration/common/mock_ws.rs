//! Mock trade stream server for integration tests.
//!
//! Each accepted connection follows a `SessionScript`: wait for the
//! SUBSCRIBE request, acknowledge or reject it, push the scripted frames,
//! then either close or stay open answering pings.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Behaviour of one server-side connection.
#[derive(Debug, Clone, Default)]
pub struct SessionScript {
    /// Answer the subscription with an error instead of an ack.
    pub reject: bool,
    /// Frames pushed after the ack.
    pub frames: Vec<String>,
    /// Close the connection after the frames are sent.
    pub close_after_frames: bool,
}

impl SessionScript {
    /// Ack, then stay silent.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn stream(frames: Vec<String>) -> Self {
        Self {
            frames,
            ..Default::default()
        }
    }

    pub fn reject() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    pub fn then_close(mut self) -> Self {
        self.close_after_frames = true;
        self
    }
}

/// A scripted WebSocket server.
pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
}

impl MockFeedServer {
    /// Start on an available port. Connection `n` follows `scripts[n]`;
    /// connections beyond the list follow `SessionScript::silent()`.
    pub async fn start(scripts: Vec<SessionScript>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let subscriptions: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let subscriptions_clone = subscriptions.clone();
        let connections_clone = connections.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let index = {
                            let mut count = connections_clone.lock().await;
                            *count += 1;
                            (*count - 1) as usize
                        };
                        let script = scripts.get(index).cloned().unwrap_or_default();
                        tokio::spawn(handle_connection(
                            stream,
                            script,
                            subscriptions_clone.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            subscriptions,
            connections,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}/stream", self.addr)
    }

    /// Get the number of connections received.
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// SUBSCRIBE requests received, in order.
    pub async fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().await.clone()
    }

    /// Stop accepting connections.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    script: SessionScript,
    subscriptions: Arc<Mutex<Vec<String>>>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    // Wait for the subscription request
    let request_id = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => {
                let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&text) else {
                    continue;
                };
                if parsed.get("method") != Some(&serde_json::json!("SUBSCRIBE")) {
                    continue;
                }
                subscriptions.lock().await.push(text.clone());
                break parsed.get("id").cloned().unwrap_or(serde_json::Value::Null);
            }
            Some(Ok(Message::Ping(data))) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Some(Ok(_)) => {}
            _ => return,
        }
    };

    let response = if script.reject {
        serde_json::json!({
            "error": {"code": 2, "msg": "Invalid request"},
            "id": request_id
        })
    } else {
        serde_json::json!({"result": null, "id": request_id})
    };
    if write
        .send(Message::Text(response.to_string()))
        .await
        .is_err()
    {
        return;
    }

    if !script.reject {
        for frame in script.frames {
            if write.send(Message::Text(frame)).await.is_err() {
                return;
            }
        }
        if script.close_after_frames {
            let _ = write.send(Message::Close(None)).await;
            return;
        }
    }

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockFeedServer::start(Vec::new()).await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }
}
