//! WebSocket client for the RTP monitor snapshot feed.
//!
//! Provides one long-lived connection with:
//! - Fixed-delay, single-flight reconnection (5s)
//! - Application heartbeat (`{"action":"ping"}` every 30s while open)
//! - Automatic `{"action":"refresh"}` on every open
//! - Channel-based delivery of snapshots and lifecycle events

pub mod connection;
pub mod endpoint;
pub mod error;
pub mod heartbeat;
pub mod lifecycle;
pub mod message;
pub mod ws_write_handle;

pub use connection::{ConnectionConfig, ConnectionEvent, ConnectionManager};
pub use endpoint::{endpoint_url, WS_PATH};
pub use error::{WsError, WsResult};
pub use heartbeat::{HeartbeatManager, HeartbeatStats};
pub use lifecycle::{ConnectionLifecycle, ConnectionState, LifecycleCommand};
pub use message::{ClientAction, ClientRequest, ServerMessage};
pub use ws_write_handle::WsWriteHandle;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
