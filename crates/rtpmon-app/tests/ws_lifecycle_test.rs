//! Feed connection lifecycle integration tests.
//!
//! Tests the connection lifecycle against a mock server:
//! - Refresh on open and snapshot delivery
//! - Heartbeat ping/pong and server ping frames
//! - Connect timeout on a stalled handshake
//! - Single reconnection after a close
//! - Graceful shutdown

mod integration;
use integration::common::{mock_ws::MockWsServer, snapshot_json};

use rtpmon_core::PairId;
use rtpmon_ws::{ConnectionConfig, ConnectionEvent, ConnectionManager, ConnectionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(3);

fn spawn_manager(
    config: ConnectionConfig,
) -> (
    Arc<ConnectionManager>,
    mpsc::Receiver<ConnectionEvent>,
    JoinHandle<()>,
) {
    let (event_tx, event_rx) = mpsc::channel(64);
    let manager = Arc::new(ConnectionManager::new(config, event_tx));
    let runner = manager.clone();
    let handle = tokio::spawn(async move {
        let _ = runner.run().await;
    });
    (manager, event_rx, handle)
}

/// Receive events until `pred` matches, returning the matching event.
async fn wait_for(
    rx: &mut mpsc::Receiver<ConnectionEvent>,
    pred: impl Fn(&ConnectionEvent) -> bool,
) -> ConnectionEvent {
    timeout(WAIT, async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for connection event")
}

fn is_opened(event: &ConnectionEvent) -> bool {
    matches!(event, ConnectionEvent::Opened)
}

fn is_snapshot(event: &ConnectionEvent) -> bool {
    matches!(event, ConnectionEvent::Snapshot(_))
}

fn is_closed(event: &ConnectionEvent) -> bool {
    matches!(event, ConnectionEvent::Closed { .. })
}

/// Opening the connection sends a refresh and delivers the snapshot.
#[tokio::test]
async fn test_refresh_on_open_delivers_snapshot() {
    let server = MockWsServer::start(snapshot_json(&["EURUSD", "GBPUSD"])).await;
    let (manager, mut events, handle) = spawn_manager(ConnectionConfig {
        url: server.url(),
        ..Default::default()
    });

    wait_for(&mut events, is_opened).await;
    let ConnectionEvent::Snapshot(snapshot) = wait_for(&mut events, is_snapshot).await else {
        unreachable!()
    };

    let pairs: Vec<&PairId> = snapshot.pair_ids().collect();
    assert_eq!(pairs, vec![&PairId::from("EURUSD"), &PairId::from("GBPUSD")]);
    assert_eq!(snapshot.invalid_count(), 0);
    assert_eq!(server.action_count("refresh").await, 1);
    assert_eq!(manager.state(), ConnectionState::Open);

    manager.shutdown();
    let _ = timeout(WAIT, handle).await;
    server.shutdown().await;
}

/// A refresh through the write handle yields a fresh snapshot.
#[tokio::test]
async fn test_write_handle_refresh() {
    let server = MockWsServer::start(snapshot_json(&["EURUSD"])).await;
    let (manager, mut events, handle) = spawn_manager(ConnectionConfig {
        url: server.url(),
        ..Default::default()
    });
    wait_for(&mut events, is_snapshot).await;

    assert!(manager.write_handle().request_refresh());
    wait_for(&mut events, is_snapshot).await;
    assert_eq!(server.action_count("refresh").await, 2);

    manager.shutdown();
    let _ = timeout(WAIT, handle).await;
    server.shutdown().await;
}

/// Heartbeat pings are answered and recorded.
#[tokio::test]
async fn test_heartbeat_ping_pong() {
    let server = MockWsServer::start(snapshot_json(&["EURUSD"])).await;
    let (manager, mut events, handle) = spawn_manager(ConnectionConfig {
        url: server.url(),
        heartbeat_interval_ms: 100,
        ..Default::default()
    });
    wait_for(&mut events, is_opened).await;

    tokio::time::sleep(Duration::from_millis(450)).await;

    assert!(server.action_count("ping").await >= 2);
    let stats = manager.heartbeat_stats();
    assert!(stats.pings_sent >= 2);
    assert!(stats.last_pong.is_some());

    manager.shutdown();
    let _ = timeout(WAIT, handle).await;
    server.shutdown().await;
}

/// Server ping frames are answered with pong frames carrying the payload.
#[tokio::test]
async fn test_server_ping_frame_answered() {
    let server = MockWsServer::start(snapshot_json(&["EURUSD"])).await;
    let (manager, mut events, handle) = spawn_manager(ConnectionConfig {
        url: server.url(),
        ..Default::default()
    });
    wait_for(&mut events, is_snapshot).await;

    server.ping(b"liveness");
    timeout(WAIT, async {
        while !server.received_pongs().await.contains(&b"liveness".to_vec()) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("no pong frame for the server ping");
    assert_eq!(manager.state(), ConnectionState::Open);

    manager.shutdown();
    let _ = timeout(WAIT, handle).await;
    server.shutdown().await;
}

/// A handshake that never completes is a failed open: error, close, retry.
#[tokio::test]
async fn test_stalled_handshake_times_out_and_retries() {
    // Accepts TCP connections but never answers the upgrade request.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = accepted.clone();
    let silent = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            held.push(stream);
        }
    });

    let (manager, mut events, handle) = spawn_manager(ConnectionConfig {
        url: format!("ws://{addr}/webapp/ws"),
        connect_timeout_ms: 200,
        reconnect_delay_ms: 100,
        ..Default::default()
    });

    let first = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    let ConnectionEvent::Error(message) = first else {
        panic!("expected error, got {first:?}");
    };
    assert!(message.contains("Connect timed out after 200ms"), "{message}");
    let ConnectionEvent::Closed { code, .. } = wait_for(&mut events, is_closed).await else {
        unreachable!()
    };
    assert_eq!(code, 1006);

    // The reconnect policy kicks in: a second attempt also times out.
    wait_for(&mut events, |e| matches!(e, ConnectionEvent::Error(_))).await;
    assert!(accepted.load(std::sync::atomic::Ordering::SeqCst) >= 2);
    assert!(manager.reconnect_attempts() >= 1);

    manager.shutdown();
    assert!(timeout(WAIT, handle).await.is_ok());
    silent.abort();
}

/// A server close leads to exactly one new connection after the delay.
#[tokio::test]
async fn test_reconnects_once_after_close() {
    let server = MockWsServer::start(snapshot_json(&["EURUSD"])).await;
    let (manager, mut events, handle) = spawn_manager(ConnectionConfig {
        url: server.url(),
        reconnect_delay_ms: 200,
        ..Default::default()
    });
    wait_for(&mut events, is_snapshot).await;
    assert_eq!(server.connection_count().await, 1);

    server.close_all();
    wait_for(&mut events, is_closed).await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    // Reopen brings a new refresh and snapshot.
    wait_for(&mut events, is_opened).await;
    wait_for(&mut events, is_snapshot).await;

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.connection_count().await, 2);
    assert_eq!(server.action_count("refresh").await, 2);
    assert_eq!(manager.reconnect_attempts(), 1);

    manager.shutdown();
    let _ = timeout(WAIT, handle).await;
    server.shutdown().await;
}

/// Unreachable server: error then close, connection stays disconnected.
#[tokio::test]
async fn test_refused_connection_reports_error_and_close() {
    // Bind and drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (manager, mut events, handle) = spawn_manager(ConnectionConfig {
        url: format!("ws://{addr}/webapp/ws"),
        reconnect_delay_ms: 10_000,
        ..Default::default()
    });

    let first = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert!(matches!(first, ConnectionEvent::Error(_)));
    let ConnectionEvent::Closed { code, .. } = wait_for(&mut events, is_closed).await else {
        unreachable!()
    };
    assert_eq!(code, 1006);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(!manager.write_handle().request_refresh());

    // Shutdown abandons the pending reconnect wait.
    manager.shutdown();
    assert!(timeout(WAIT, handle).await.is_ok());
}

/// Malformed messages are dropped without closing the connection.
#[tokio::test]
async fn test_malformed_message_dropped() {
    let server = MockWsServer::start(snapshot_json(&["EURUSD"])).await;
    let (manager, mut events, handle) = spawn_manager(ConnectionConfig {
        url: server.url(),
        ..Default::default()
    });
    wait_for(&mut events, is_snapshot).await;

    server.push_raw("not json");
    server.push_raw("[1, 2, 3]");
    server.set_snapshot(snapshot_json(&["XAUUSD"])).await;
    server.push_snapshot();

    let next = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    let ConnectionEvent::Snapshot(snapshot) = next else {
        panic!("expected snapshot, got {next:?}");
    };
    assert!(snapshot.contains(&PairId::from("XAUUSD")));
    assert_eq!(manager.state(), ConnectionState::Open);

    manager.shutdown();
    let _ = timeout(WAIT, handle).await;
    server.shutdown().await;
}

/// Shutdown closes an open session and ends `run`.
#[tokio::test]
async fn test_shutdown_closes_session() {
    let server = MockWsServer::start(snapshot_json(&["EURUSD"])).await;
    let (manager, mut events, handle) = spawn_manager(ConnectionConfig {
        url: server.url(),
        ..Default::default()
    });
    wait_for(&mut events, is_opened).await;

    manager.shutdown();
    assert!(timeout(WAIT, handle).await.is_ok());
    assert!(manager.is_shutdown());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.connection_count().await, 1);
    server.shutdown().await;
}
