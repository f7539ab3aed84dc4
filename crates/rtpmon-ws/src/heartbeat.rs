//! Heartbeat bookkeeping for the feed connection.
//!
//! Tracks ping/pong timing and message activity so round-trip times and
//! feed silence show up in the logs. Liveness itself is left to the server:
//! a dead peer surfaces as a close, which drives reconnection.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Heartbeat manager for the feed connection.
pub struct HeartbeatManager {
    /// How often to send ping.
    interval_ms: u64,
    /// Last ping sent time.
    last_ping: Arc<RwLock<Option<DateTime<Utc>>>>,
    /// Last pong received time.
    last_pong: Arc<RwLock<Option<DateTime<Utc>>>>,
    /// Last message received time (any message).
    last_message: Arc<RwLock<DateTime<Utc>>>,
    /// Whether we're waiting for pong.
    waiting_for_pong: Arc<RwLock<bool>>,
    /// Pings sent since the last reset.
    pings_sent: Arc<RwLock<u64>>,
}

impl HeartbeatManager {
    /// Create a new heartbeat manager.
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ping: Arc::new(RwLock::new(None)),
            last_pong: Arc::new(RwLock::new(None)),
            last_message: Arc::new(RwLock::new(Utc::now())),
            waiting_for_pong: Arc::new(RwLock::new(false)),
            pings_sent: Arc::new(RwLock::new(0)),
        }
    }

    /// Ping period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Reset heartbeat state (called on connection).
    pub fn reset(&self) {
        *self.last_ping.write() = None;
        *self.last_pong.write() = None;
        *self.last_message.write() = Utc::now();
        *self.waiting_for_pong.write() = false;
        *self.pings_sent.write() = 0;
    }

    /// Record that a ping was sent.
    pub fn record_ping(&self) {
        let now = Utc::now();
        if *self.waiting_for_pong.read() {
            debug!(time = %now, "Previous ping still unanswered");
        }
        *self.last_ping.write() = Some(now);
        *self.waiting_for_pong.write() = true;
        *self.pings_sent.write() += 1;
        debug!(time = %now, "Recorded ping");
    }

    /// Record that a pong was received.
    pub fn record_pong(&self) {
        let now = Utc::now();
        *self.last_pong.write() = Some(now);
        *self.waiting_for_pong.write() = false;

        if let Some(ping_time) = *self.last_ping.read() {
            let rtt_ms = (now - ping_time).num_milliseconds();
            debug!(rtt_ms, "Received pong");
        }
    }

    /// Record that any message was received.
    pub fn record_message(&self) {
        *self.last_message.write() = Utc::now();
    }

    /// Get time since last message.
    pub fn time_since_last_message_ms(&self) -> i64 {
        (Utc::now() - *self.last_message.read()).num_milliseconds()
    }

    /// Get heartbeat statistics.
    pub fn stats(&self) -> HeartbeatStats {
        HeartbeatStats {
            last_ping: *self.last_ping.read(),
            last_pong: *self.last_pong.read(),
            last_message: *self.last_message.read(),
            waiting_for_pong: *self.waiting_for_pong.read(),
            pings_sent: *self.pings_sent.read(),
            time_since_last_message_ms: self.time_since_last_message_ms(),
        }
    }
}

/// Heartbeat statistics.
#[derive(Debug, Clone)]
pub struct HeartbeatStats {
    pub last_ping: Option<DateTime<Utc>>,
    pub last_pong: Option<DateTime<Utc>>,
    pub last_message: DateTime<Utc>,
    pub waiting_for_pong: bool,
    pub pings_sent: u64,
    pub time_since_last_message_ms: i64,
}
