//! Connection lifecycle state machine.
//!
//! Pure bookkeeping: every transition returns the commands the driver must
//! carry out, such as sending a frame or arming a timer.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──open──▶ Open ──shutdown──▶ Closing
//!      ▲                        │                  │                  │
//!      └────────── close ───────┴──────────────────┴──────────────────┘
//!      └── reconnect timer (single-flight) ──▶ Connecting
//! ```

use crate::message::ClientRequest;
use std::time::Duration;
use tracing::debug;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
        }
    }
}

/// Side effect requested by a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// Open a new connection now.
    Connect,
    /// Drop the pending reconnection timer.
    CancelReconnect,
    /// Write a request to the socket.
    Send(ClientRequest),
    /// Arm the repeating heartbeat timer.
    StartHeartbeat,
    /// Disarm the heartbeat timer.
    StopHeartbeat,
    /// Arm the one-shot reconnection timer.
    ScheduleReconnect(Duration),
}

/// Lifecycle of the single feed connection.
#[derive(Debug, Clone)]
pub struct ConnectionLifecycle {
    state: ConnectionState,
    reconnect_delay: Duration,
    reconnect_pending: bool,
    heartbeat_running: bool,
    /// Reconnection timers that fired and led to a new attempt.
    reconnect_attempts: u64,
}

impl ConnectionLifecycle {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_delay,
            reconnect_pending: false,
            heartbeat_running: false,
            reconnect_attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn heartbeat_running(&self) -> bool {
        self.heartbeat_running
    }

    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts
    }

    /// A connection attempt is starting.
    pub fn on_connect_started(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// The socket opened.
    pub fn on_open(&mut self) -> Vec<LifecycleCommand> {
        let mut commands = Vec::with_capacity(3);
        self.state = ConnectionState::Open;

        if self.reconnect_pending {
            self.reconnect_pending = false;
            commands.push(LifecycleCommand::CancelReconnect);
        }

        // Catch up on anything missed while disconnected.
        commands.push(LifecycleCommand::Send(ClientRequest::refresh()));

        if !self.heartbeat_running {
            self.heartbeat_running = true;
            commands.push(LifecycleCommand::StartHeartbeat);
        }

        commands
    }

    /// A transport error was observed. Errors are diagnostic only; the
    /// close that follows drives reconnection.
    pub fn on_error(&self) {
        debug!(state = self.state.as_str(), "Transport error recorded");
    }

    /// Local shutdown of an open connection has begun.
    pub fn on_closing(&mut self) {
        if self.state == ConnectionState::Open {
            self.state = ConnectionState::Closing;
        }
    }

    /// The socket closed (server close, network loss or failed open).
    ///
    /// At most one reconnection timer is ever pending: closes that arrive
    /// while one is armed schedule nothing.
    pub fn on_close(&mut self) -> Vec<LifecycleCommand> {
        let mut commands = Vec::with_capacity(2);
        self.state = ConnectionState::Disconnected;

        if self.heartbeat_running {
            self.heartbeat_running = false;
            commands.push(LifecycleCommand::StopHeartbeat);
        }

        if !self.reconnect_pending {
            self.reconnect_pending = true;
            commands.push(LifecycleCommand::ScheduleReconnect(self.reconnect_delay));
        }

        commands
    }

    /// The reconnection timer fired.
    pub fn on_reconnect_timer(&mut self) -> Vec<LifecycleCommand> {
        if !self.reconnect_pending {
            return Vec::new();
        }
        self.reconnect_pending = false;

        if self.state != ConnectionState::Disconnected {
            return Vec::new();
        }

        self.reconnect_attempts += 1;
        vec![LifecycleCommand::Connect]
    }

    /// The heartbeat timer fired. Pings only go out on an open connection.
    pub fn on_heartbeat_tick(&self) -> Option<ClientRequest> {
        self.is_open().then(ClientRequest::ping)
    }

    /// Explicit refresh from the UI. Silently dropped unless open; the
    /// automatic refresh on the next open covers the gap.
    pub fn request_refresh(&self) -> Option<ClientRequest> {
        self.is_open().then(ClientRequest::refresh)
    }
}
