//! WebSocket connection manager.
//!
//! Drives the feed connection through [`ConnectionLifecycle`]: opens the
//! socket, performs the commands each transition yields (refresh on open,
//! heartbeat while open, one fixed-delay reconnection after close) and
//! forwards snapshots and lifecycle events to the controller.

use crate::error::{WsError, WsResult};
use crate::heartbeat::{HeartbeatManager, HeartbeatStats};
use crate::lifecycle::{ConnectionLifecycle, ConnectionState, LifecycleCommand};
use crate::message::{ClientRequest, ServerMessage};
use crate::ws_write_handle::WsWriteHandle;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rtpmon_core::Snapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Close code used when the socket went away without a close frame.
const ABNORMAL_CLOSE: u16 = 1006;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL (see [`crate::endpoint_url`]).
    pub url: String,
    /// Fixed delay before the single reconnection attempt after a close.
    pub reconnect_delay_ms: u64,
    /// Application ping period while open.
    pub heartbeat_interval_ms: u64,
    /// Upper bound on the opening handshake.
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect_delay_ms: 5_000,
            heartbeat_interval_ms: 30_000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl ConnectionConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Event delivered to the connection's owner, in arrival order.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// The socket opened and the automatic refresh was sent.
    Opened,
    /// A full snapshot arrived.
    Snapshot(Snapshot),
    /// Transport diagnostic. Never triggers reconnection on its own.
    Error(String),
    /// The socket closed; a reconnection is scheduled unless shutting down.
    Closed { code: u16, reason: String },
}

/// How a session ended without a transport error.
#[derive(Debug)]
struct CloseInfo {
    code: u16,
    reason: String,
}

impl CloseInfo {
    fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// WebSocket connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    lifecycle: Arc<Mutex<ConnectionLifecycle>>,
    heartbeat: Arc<HeartbeatManager>,
    event_tx: mpsc::Sender<ConnectionEvent>,
    /// Outbound request sender (for WsWriteHandle).
    outbound_tx: mpsc::Sender<ClientRequest>,
    /// Outbound request receiver (consumed by the session loop).
    outbound_rx: Arc<TokioMutex<mpsc::Receiver<ClientRequest>>>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new(config: ConnectionConfig, event_tx: mpsc::Sender<ConnectionEvent>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(16);
        Self {
            lifecycle: Arc::new(Mutex::new(ConnectionLifecycle::new(
                config.reconnect_delay(),
            ))),
            heartbeat: Arc::new(HeartbeatManager::new(config.heartbeat_interval_ms)),
            config,
            event_tx,
            outbound_tx,
            outbound_rx: Arc::new(TokioMutex::new(outbound_rx)),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get a write handle for requesting refreshes.
    ///
    /// The handle can be cloned and survives reconnects.
    pub fn write_handle(&self) -> WsWriteHandle {
        WsWriteHandle::new(self.outbound_tx.clone(), self.lifecycle.clone())
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        self.lifecycle.lock().state()
    }

    /// Number of reconnection attempts made so far.
    pub fn reconnect_attempts(&self) -> u64 {
        self.lifecycle.lock().reconnect_attempts()
    }

    pub fn heartbeat_stats(&self) -> HeartbeatStats {
        self.heartbeat.stats()
    }

    /// Signal graceful shutdown.
    ///
    /// An open session sends a Close frame; a pending reconnection wait is
    /// abandoned. `run` returns promptly afterwards.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and keep the connection alive until shutdown.
    ///
    /// Retries forever: every close arms the single reconnection timer.
    pub async fn run(&self) -> WsResult<()> {
        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                return Ok(());
            }

            self.lifecycle.lock().on_connect_started();

            let close = match self.run_session().await {
                Ok(close) => {
                    info!(code = close.code, reason = %close.reason, "Feed connection closed");
                    close
                }
                Err(e) => {
                    error!(error = %e, "Feed connection error");
                    self.lifecycle.lock().on_error();
                    self.emit(ConnectionEvent::Error(e.to_string())).await;
                    CloseInfo::new(ABNORMAL_CLOSE, e.to_string())
                }
            };

            let commands = self.lifecycle.lock().on_close();
            self.emit(ConnectionEvent::Closed {
                code: close.code,
                reason: close.reason,
            })
            .await;

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                return Ok(());
            }

            let delay = commands
                .iter()
                .find_map(|c| match c {
                    LifecycleCommand::ScheduleReconnect(delay) => Some(*delay),
                    _ => None,
                })
                .unwrap_or_else(|| self.config.reconnect_delay());
            warn!(delay_ms = delay.as_millis() as u64, "Reconnecting");

            // Wait for delay OR shutdown signal (cancellation-aware sleep)
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during reconnect wait, exiting");
                    return Ok(());
                }
            }

            let commands = self.lifecycle.lock().on_reconnect_timer();
            if !commands.contains(&LifecycleCommand::Connect) {
                debug!("Reconnect timer fired with no attempt due");
            }
        }
    }

    async fn run_session(&self) -> WsResult<CloseInfo> {
        info!(url = %self.config.url, "Connecting to feed");

        let connect = tokio::time::timeout(
            self.config.connect_timeout(),
            connect_async_tls_with_config(&self.config.url, None, true, None),
        );
        let (ws_stream, _response) = tokio::select! {
            result = connect => result
                .map_err(|_| WsError::ConnectTimeout(self.config.connect_timeout_ms))??,
            () = self.shutdown_token.cancelled() => {
                return Ok(CloseInfo::new(1000, "shutdown before open"));
            }
        };
        let (mut write, mut read) = ws_stream.split();

        let stale = self.discard_stale_requests().await;
        if stale > 0 {
            debug!(stale, "Discarded requests queued before this connection");
        }
        let commands = self.lifecycle.lock().on_open();
        self.heartbeat.reset();
        info!("Feed connected");

        let mut heartbeat_timer: Option<Interval> = None;
        for command in commands {
            match command {
                LifecycleCommand::Send(request) => {
                    write.send(Message::Text(request.to_json()?)).await?;
                    debug!(?request, "Sent request on open");
                }
                LifecycleCommand::StartHeartbeat => {
                    heartbeat_timer = Some(self.heartbeat_timer());
                }
                LifecycleCommand::CancelReconnect => {
                    debug!("Pending reconnect cancelled by open");
                }
                other => debug!(?other, "Ignoring command on open"),
            }
        }
        self.emit(ConnectionEvent::Opened).await;

        loop {
            let outbound_recv = async { self.outbound_rx.lock().await.recv().await };

            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    self.lifecycle.lock().on_closing();
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(?e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(CloseInfo::new(1000, "shutdown"));
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_message(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping frame, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.to_string()))
                                .unwrap_or((1005, "No status".to_string()));
                            warn!(code, %reason, "Feed closed by server");
                            return Ok(CloseInfo::new(code, reason));
                        }
                        Some(Err(e)) => {
                            error!(?e, "Feed read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("Feed stream ended");
                            return Ok(CloseInfo::new(ABNORMAL_CLOSE, "stream ended"));
                        }
                        _ => {}
                    }
                }

                outbound = outbound_recv => {
                    if let Some(request) = outbound {
                        write.send(Message::Text(request.to_json()?)).await?;
                        debug!(?request, "Sent request");
                    }
                }

                () = next_tick(&mut heartbeat_timer) => {
                    let ping = self.lifecycle.lock().on_heartbeat_tick();
                    if let Some(ping) = ping {
                        write.send(Message::Text(ping.to_json()?)).await?;
                        self.heartbeat.record_ping();
                    } else {
                        debug!("Heartbeat tick while not open, skipped");
                    }
                }
            }
        }
    }

    async fn handle_text_message(&self, text: &str) {
        self.heartbeat.record_message();

        match ServerMessage::parse(text) {
            Ok(ServerMessage::Pong) => {
                self.heartbeat.record_pong();
            }
            Ok(ServerMessage::Snapshot(snapshot)) => {
                debug!(
                    pairs = snapshot.len(),
                    invalid = snapshot.invalid_count(),
                    "Snapshot received"
                );
                self.emit(ConnectionEvent::Snapshot(snapshot)).await;
            }
            Err(e) => {
                // Drop the message; the last good snapshot stays on screen.
                warn!(error = %e, bytes = text.len(), "Dropping malformed message");
            }
        }
    }

    /// Drop requests left over from a previous connection. The refresh sent
    /// on open supersedes them.
    async fn discard_stale_requests(&self) -> usize {
        let mut rx = self.outbound_rx.lock().await;
        let mut discarded = 0;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }

    fn heartbeat_timer(&self) -> Interval {
        let period = self.heartbeat.interval();
        let mut timer = tokio::time::interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    }

    async fn emit(&self, event: ConnectionEvent) {
        if self.event_tx.send(event).await.is_err() {
            warn!("Connection event receiver dropped");
        }
    }
}

/// Resolve on the next heartbeat tick, or never while the heartbeat is off.
async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
