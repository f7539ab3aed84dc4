//! Dashboard controller.
//!
//! Owns the client state (snapshot store, focus, current view tree) and
//! consumes connection events, UI events and the settle timer one at a
//! time. Only the connection state is shared with other tasks, through the
//! feed's write handle.

use crate::error::AppResult;
use rtpmon_core::Selection;
use rtpmon_view::{
    ChartBackend, FocusChange, FocusState, FocusTarget, RenderOptions, SnapshotStore, ViewRenderer,
    ViewTree,
};
use rtpmon_ws::{ConnectionConfig, ConnectionEvent, ConnectionManager, WsWriteHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, error, info, warn};

/// How long `stop` waits for the connection task to wind down.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// User input, already resolved to what it acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Change the pair selection (persisted).
    SelectPair(Selection),
    /// Toggle full-screen focus on one chart.
    ToggleFocus(FocusTarget),
    /// Ask the server for a fresh snapshot.
    Refresh,
    /// Present the current tree again without rebuilding it.
    Redraw,
    Quit,
}

/// What the controller knows about the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub snapshots_received: u64,
    pub last_error: Option<String>,
    pub last_close: Option<(u16, String)>,
}

struct RunningConnection {
    manager: Arc<ConnectionManager>,
    task: JoinHandle<()>,
}

/// Process-wide dashboard state.
pub struct DashboardController<B: ChartBackend> {
    store: SnapshotStore,
    focus: FocusState,
    renderer: ViewRenderer,
    backend: B,
    tree: ViewTree,
    settle_delay: Duration,
    /// Single pending settle pass; replaced on every render.
    settle_deadline: Option<Instant>,
    status: ConnectionStatus,
    refresh: Option<WsWriteHandle>,
    connection: Option<RunningConnection>,
}

impl<B: ChartBackend> DashboardController<B> {
    /// Create the controller and render the initial (empty) view.
    pub fn new(store: SnapshotStore, backend: B, options: RenderOptions, settle_delay: Duration) -> Self {
        let tree = ViewTree::empty(store.selection());
        let mut controller = Self {
            store,
            focus: FocusState::new(),
            renderer: ViewRenderer::new(options),
            backend,
            tree,
            settle_delay,
            settle_deadline: None,
            status: ConnectionStatus::default(),
            refresh: None,
            connection: None,
        };
        controller.render();
        controller
    }

    pub fn tree(&self) -> &ViewTree {
        &self.tree
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn focus(&self) -> &FocusState {
        &self.focus
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn settle_pending(&self) -> bool {
        self.settle_deadline.is_some()
    }

    /// Use `handle` for refresh requests.
    pub fn attach_refresh(&mut self, handle: WsWriteHandle) {
        self.refresh = Some(handle);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Spawn the feed connection. Returns the receiver its events arrive on.
    pub fn start(&mut self, config: ConnectionConfig) -> mpsc::Receiver<ConnectionEvent> {
        let (event_tx, event_rx) = mpsc::channel(64);
        info!(url = %config.url, "Starting feed connection");

        let manager = Arc::new(ConnectionManager::new(config, event_tx));
        self.attach_refresh(manager.write_handle());

        let runner = manager.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = runner.run().await {
                error!(error = %e, "Feed connection task failed");
            }
        });

        self.connection = Some(RunningConnection { manager, task });
        event_rx
    }

    /// Shut the feed connection down and wait for its task.
    pub async fn stop(&mut self) {
        let Some(RunningConnection { manager, mut task }) = self.connection.take() else {
            return;
        };
        manager.shutdown();

        match timeout(STOP_TIMEOUT, &mut task).await {
            Ok(Ok(())) => info!("Feed connection stopped"),
            Ok(Err(e)) => warn!(error = %e, "Feed connection task ended abnormally"),
            Err(_) => {
                warn!("Feed connection did not stop in time, aborting");
                task.abort();
            }
        }
        self.status.connected = false;
    }

    /// Main event loop. Returns on `UiEvent::Quit` or Ctrl-C.
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<ConnectionEvent>,
        mut ui: mpsc::Receiver<UiEvent>,
    ) -> AppResult<()> {
        info!("Entering dashboard event loop");

        loop {
            let settle_at = self.settle_deadline;
            tokio::select! {
                Some(event) = events.recv() => {
                    self.handle_connection_event(event);
                }

                Some(event) = ui.recv() => {
                    if !self.handle_ui_event(event) {
                        info!("Quit requested");
                        break;
                    }
                }

                _ = sleep_until(settle_at.unwrap_or_else(Instant::now)), if settle_at.is_some() => {
                    self.settle_now();
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!(
            snapshots = self.status.snapshots_received,
            "Leaving dashboard event loop"
        );
        Ok(())
    }

    // ========================================================================
    // Event handling
    // ========================================================================

    pub fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened => {
                info!("Feed connected");
                self.status.connected = true;
                self.status.last_error = None;
            }
            ConnectionEvent::Snapshot(snapshot) => {
                self.status.snapshots_received += 1;
                self.store.set_snapshot(snapshot);
                self.render();
            }
            ConnectionEvent::Error(message) => {
                warn!(error = %message, "Feed error");
                self.status.last_error = Some(message);
            }
            ConnectionEvent::Closed { code, reason } => {
                info!(code, reason = %reason, "Feed disconnected");
                self.status.connected = false;
                self.status.last_close = Some((code, reason));
            }
        }
    }

    /// Apply a UI event. Returns `false` when the dashboard should exit.
    pub fn handle_ui_event(&mut self, event: UiEvent) -> bool {
        match event {
            UiEvent::SelectPair(selection) => {
                info!(selection = %selection, "Pair selected");
                self.store.set_selection(selection);
                self.render();
                self.request_refresh();
            }
            UiEvent::ToggleFocus(target) => {
                match self.focus.toggle(&mut self.tree, target) {
                    Ok(FocusChange::Activated(t)) => debug!(target = %t, "Focus on"),
                    Ok(FocusChange::Deactivated(t)) => debug!(target = %t, "Focus off"),
                    Err(e) => {
                        warn!(error = %e, "Focus toggle ignored");
                        return true;
                    }
                }
                self.backend.commit(&self.tree);
                self.schedule_settle();
            }
            UiEvent::Refresh => self.request_refresh(),
            UiEvent::Redraw => self.backend.commit(&self.tree),
            UiEvent::Quit => return false,
        }
        true
    }

    /// Run the pending layout-settle pass now.
    pub fn settle_now(&mut self) -> usize {
        self.settle_deadline = None;
        self.renderer.settle(&self.tree, &mut self.backend)
    }

    /// Ask the feed for a fresh snapshot; no-op unless connected.
    fn request_refresh(&self) {
        match &self.refresh {
            Some(handle) => {
                handle.request_refresh();
            }
            None => debug!("Refresh requested without a connection"),
        }
    }

    fn render(&mut self) {
        self.tree = self.renderer.render(
            self.store.snapshot(),
            self.store.selection(),
            &mut self.focus,
            &mut self.backend,
        );
        self.schedule_settle();
    }

    fn schedule_settle(&mut self) {
        self.settle_deadline = Some(Instant::now() + self.settle_delay);
    }
}
