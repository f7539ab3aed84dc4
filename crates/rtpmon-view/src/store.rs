//! Latest snapshot plus the persisted pair selection.

use rtpmon_core::{PairId, Selection, Snapshot};
use rtpmon_persistence::SelectionStore;
use tracing::{debug, info, warn};

/// Pairs shown for `selection`, in snapshot order.
///
/// "All" shows every key; a single pair shows itself when present and
/// nothing otherwise.
pub fn visible_pairs(snapshot: &Snapshot, selection: &Selection) -> Vec<PairId> {
    match selection {
        Selection::All => snapshot.pair_ids().cloned().collect(),
        Selection::Pair(pair) if snapshot.contains(pair) => vec![pair.clone()],
        Selection::Pair(_) => Vec::new(),
    }
}

/// Holds the most recent snapshot and the current selection.
pub struct SnapshotStore {
    snapshot: Option<Snapshot>,
    selection: Selection,
    persistence: Box<dyn SelectionStore>,
}

impl SnapshotStore {
    /// Open the store, restoring the persisted selection.
    ///
    /// An unreadable state file falls back to "All".
    pub fn open(persistence: Box<dyn SelectionStore>) -> Self {
        let selection = match persistence.load() {
            Ok(Some(value)) => Selection::from_stored(&value),
            Ok(None) => Selection::All,
            Err(e) => {
                warn!(error = %e, "Failed to load stored selection, using all pairs");
                Selection::All
            }
        };
        info!(selection = %selection, "Selection restored");

        Self {
            snapshot: None,
            selection,
            persistence,
        }
    }

    /// Replace the snapshot wholesale.
    pub fn set_snapshot(&mut self, snapshot: Snapshot) {
        debug!(
            pairs = snapshot.len(),
            invalid = snapshot.invalid_count(),
            "Snapshot stored"
        );
        self.snapshot = Some(snapshot);
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Change and persist the selection.
    ///
    /// A persistence failure is logged; the in-memory selection changes
    /// regardless.
    pub fn set_selection(&mut self, selection: Selection) {
        if let Err(e) = self.persistence.save(selection.as_stored()) {
            warn!(error = %e, selection = %selection, "Failed to persist selection");
        }
        self.selection = selection;
    }

    /// Pairs visible under the current selection; empty before the first
    /// snapshot.
    pub fn visible_pairs(&self) -> Vec<PairId> {
        self.snapshot
            .as_ref()
            .map(|s| visible_pairs(s, &self.selection))
            .unwrap_or_default()
    }
}
