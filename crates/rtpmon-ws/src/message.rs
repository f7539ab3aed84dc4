//! WebSocket message types.

use rtpmon_core::{ProtocolError, Snapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Client Request (Outgoing)
// ============================================================================

/// Action carried by a client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientAction {
    /// Ask the server for an immediate full snapshot.
    Refresh,
    /// Application-level heartbeat.
    Ping,
}

/// Outgoing request, serialized as `{"action": "..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    pub action: ClientAction,
}

impl ClientRequest {
    pub fn refresh() -> Self {
        Self {
            action: ClientAction::Refresh,
        }
    }

    pub fn ping() -> Self {
        Self {
            action: ClientAction::Ping,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// Server Message (Incoming)
// ============================================================================

/// Incoming message from the snapshot feed.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Heartbeat acknowledgement (`{"action":"pong"}`).
    Pong,
    /// Full replacement dataset.
    Snapshot(Snapshot),
}

impl ServerMessage {
    /// Parse message text.
    ///
    /// Anything that is not a JSON object is a protocol error. An object
    /// whose `action` is `"pong"` is a heartbeat reply; every other object is
    /// a snapshot.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(ProtocolError::NotAnObject);
        }
        if is_pong(&value) {
            return Ok(Self::Pong);
        }
        Ok(Self::Snapshot(Snapshot::from_value(value)?))
    }

    pub fn is_pong(&self) -> bool {
        matches!(self, Self::Pong)
    }
}

fn is_pong(value: &Value) -> bool {
    value
        .get("action")
        .and_then(|v| v.as_str())
        .is_some_and(|a| a == "pong")
}
