//! Key-value storage for the selected pair.
//!
//! The state file is a flat JSON object so other client settings can live
//! next to the selection without a format change. Writes go to a temporary
//! file first and are renamed into place, so an interrupted write never
//! leaves a truncated state file behind.

use crate::error::{PersistenceError, PersistenceResult};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Fixed key under which the selection is stored.
pub const SELECTION_KEY: &str = "selectedPair";

/// Durable storage for the selection value (`"all"` or a pair id).
pub trait SelectionStore: Send {
    /// Read the stored value, `None` if never written.
    fn load(&self) -> PersistenceResult<Option<String>>;

    /// Persist a new value.
    fn save(&self, value: &str) -> PersistenceResult<()>;
}

// ============================================================================
// File-backed store
// ============================================================================

/// Selection stored in a JSON state file.
#[derive(Debug, Clone)]
pub struct FileSelectionStore {
    path: PathBuf,
}

impl FileSelectionStore {
    /// File name used inside the state directory.
    pub const FILE_NAME: &'static str = "selection.json";

    /// Store at an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/selection.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> PersistenceResult<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(PersistenceError::InvalidStateFile(
                self.path.display().to_string(),
            )),
        }
    }
}

impl SelectionStore for FileSelectionStore {
    fn load(&self) -> PersistenceResult<Option<String>> {
        let map = self.read_map()?;
        let value = map
            .get(SELECTION_KEY)
            .and_then(|v| v.as_str())
            .map(str::to_string);
        debug!(path = %self.path.display(), ?value, "Loaded selection");
        Ok(value)
    }

    fn save(&self, value: &str) -> PersistenceResult<()> {
        let mut map = self.read_map()?;
        map.insert(SELECTION_KEY.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&Value::Object(map))?)?;
        fs::rename(&tmp, &self.path)?;

        info!(path = %self.path.display(), value, "Selection saved");
        Ok(())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Selection stored in memory.
///
/// Clones share the same map, so a clone handed to a new owner sees what
/// the previous owner wrote (used to exercise restart behavior).
#[derive(Debug, Clone, Default)]
pub struct MemorySelectionStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStore for MemorySelectionStore {
    fn load(&self) -> PersistenceResult<Option<String>> {
        Ok(self.values.read().get(SELECTION_KEY).cloned())
    }

    fn save(&self, value: &str) -> PersistenceResult<()> {
        self.values
            .write()
            .insert(SELECTION_KEY.to_string(), value.to_string());
        Ok(())
    }
}
