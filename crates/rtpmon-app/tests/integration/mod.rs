//! Integration tests for rtpmon-app.
//!
//! These tests run the real feed client against a local mock server:
//! - Connection lifecycle (refresh on open, heartbeat, reconnection)
//! - Snapshot flow through the controller into the view
//! - Selection persistence across restarts

pub mod common;
