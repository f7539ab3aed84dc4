//! Mock feed server for integration tests.
//!
//! Provides a simple WebSocket server that can:
//! - Accept connections and count them
//! - Answer `refresh` with the current snapshot and `ping` with `pong`
//! - Push snapshots or raw text to every client
//! - Send ping frames and record the pong frames that come back
//! - Close every open connection
//! - Record received messages

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Debug, Clone)]
enum Control {
    PushSnapshot,
    PushRaw(String),
    Ping(Vec<u8>),
    Close,
}

struct ServerState {
    snapshot: Mutex<Value>,
    messages: Mutex<VecDeque<String>>,
    pongs: Mutex<Vec<Vec<u8>>>,
    connections: Mutex<u32>,
}

/// A mock feed server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    control_tx: broadcast::Sender<Control>,
    state: Arc<ServerState>,
}

impl MockWsServer {
    /// Start a server answering refreshes with `snapshot`.
    pub async fn start(snapshot: Value) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ServerState {
            snapshot: Mutex::new(snapshot),
            messages: Mutex::new(VecDeque::new()),
            pongs: Mutex::new(Vec::new()),
            connections: Mutex::new(0),
        });
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (control_tx, _) = broadcast::channel::<Control>(16);

        let state_clone = state.clone();
        let control_clone = control_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            state_clone.clone(),
                            control_clone.subscribe(),
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
            control_tx,
            state,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}/webapp/ws", self.addr)
    }

    /// Get the number of connections received.
    pub async fn connection_count(&self) -> u32 {
        *self.state.connections.lock().await
    }

    /// Get all received messages.
    pub async fn received_messages(&self) -> Vec<String> {
        self.state.messages.lock().await.iter().cloned().collect()
    }

    /// Number of received messages with the given action.
    pub async fn action_count(&self, action: &str) -> usize {
        self.received_messages()
            .await
            .iter()
            .filter_map(|m| serde_json::from_str::<Value>(m).ok())
            .filter(|v| v.get("action").and_then(Value::as_str) == Some(action))
            .count()
    }

    /// Replace the snapshot served from now on.
    pub async fn set_snapshot(&self, snapshot: Value) {
        *self.state.snapshot.lock().await = snapshot;
    }

    /// Send the current snapshot to every client.
    pub fn push_snapshot(&self) {
        let _ = self.control_tx.send(Control::PushSnapshot);
    }

    /// Send arbitrary text to every client.
    pub fn push_raw(&self, text: impl Into<String>) {
        let _ = self.control_tx.send(Control::PushRaw(text.into()));
    }

    /// Send a ping frame with `payload` to every client.
    pub fn ping(&self, payload: &[u8]) {
        let _ = self.control_tx.send(Control::Ping(payload.to_vec()));
    }

    /// Payloads of pong frames received from clients.
    pub async fn received_pongs(&self) -> Vec<Vec<u8>> {
        self.state.pongs.lock().await.clone()
    }

    /// Close every open connection with a close frame.
    pub fn close_all(&self) {
        let _ = self.control_tx.send(Control::Close);
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<ServerState>,
    mut control: broadcast::Receiver<Control>,
) {
    // Increment connection count
    {
        let mut count = state.connections.lock().await;
        *count += 1;
    }

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    // Record the message
                    state.messages.lock().await.push_back(text.clone());

                    let Ok(parsed) = serde_json::from_str::<Value>(&text) else {
                        continue;
                    };
                    match parsed.get("action").and_then(Value::as_str) {
                        Some("refresh") => {
                            let snapshot = state.snapshot.lock().await.to_string();
                            let _ = write.send(Message::Text(snapshot)).await;
                        }
                        Some("ping") => {
                            let pong = json!({ "action": "pong" }).to_string();
                            let _ = write.send(Message::Text(pong)).await;
                        }
                        _ => {}
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Pong(data))) => {
                    state.pongs.lock().await.push(data);
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            ctrl = control.recv() => match ctrl {
                Ok(Control::PushSnapshot) => {
                    let snapshot = state.snapshot.lock().await.to_string();
                    let _ = write.send(Message::Text(snapshot)).await;
                }
                Ok(Control::PushRaw(text)) => {
                    let _ = write.send(Message::Text(text)).await;
                }
                Ok(Control::Ping(payload)) => {
                    let _ = write.send(Message::Ping(payload)).await;
                }
                Ok(Control::Close) => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start(json!({})).await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }
}
