//! Write handle for sending requests on the feed connection.
//!
//! The handle queues requests for the connection task instead of touching
//! the socket directly, so it stays valid across reconnects and can be
//! cloned into UI code.

use crate::lifecycle::{ConnectionLifecycle, ConnectionState};
use crate::message::ClientRequest;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Cloneable handle to the feed connection.
#[derive(Clone)]
pub struct WsWriteHandle {
    tx: mpsc::Sender<ClientRequest>,
    lifecycle: Arc<Mutex<ConnectionLifecycle>>,
}

impl WsWriteHandle {
    /// Create a new write handle.
    pub fn new(tx: mpsc::Sender<ClientRequest>, lifecycle: Arc<Mutex<ConnectionLifecycle>>) -> Self {
        Self { tx, lifecycle }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.lifecycle.lock().state()
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle.lock().is_open()
    }

    /// Ask the server for a fresh snapshot.
    ///
    /// No-op unless the connection is open. Returns `true` when the request
    /// was queued for sending.
    pub fn request_refresh(&self) -> bool {
        let Some(request) = self.lifecycle.lock().request_refresh() else {
            debug!("Refresh skipped, connection not open");
            return false;
        };

        match self.tx.try_send(request) {
            Ok(()) => {
                debug!("Refresh queued");
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue full, refresh dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Outbound channel closed, refresh dropped");
                false
            }
        }
    }
}
