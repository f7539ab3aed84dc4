//! Durable client state for the RTP monitor.
//!
//! Persists the user's pair selection so it survives restarts.

pub mod error;
pub mod selection;

pub use error::{PersistenceError, PersistenceResult};
pub use selection::{FileSelectionStore, MemorySelectionStore, SelectionStore, SELECTION_KEY};
