//! Scene state management
//!
//! The store owns the live snapshot, the selection, the active tool and the
//! history log. Every mutation builds a new snapshot and, unless it is a
//! restore, undo/redo or remote apply, appends one labeled history entry.

mod history;
mod object_ops;
mod persistence;

pub use history::{HistoryLog, DEFAULT_CAPACITY, MAX_CAPACITY};
pub use object_ops::{ExtrusionSetting, MirrorSetting, ObjectField, TransformKind};

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{HistoryEntry, SceneObject, SceneSnapshot};
use tracing::{debug, warn};

use super::selection::SelectionState;
use super::Tool;
use crate::clock;

/// Authoritative scene state with selection and history
pub struct SceneStore {
    snapshot: SceneSnapshot,
    selection: SelectionState,
    tool: Tool,
    history: HistoryLog,
    /// Monotonically increasing version counter, bumped whenever the live snapshot changes
    version: u64,
    rng: StdRng,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SceneStore {
    pub fn new(history_capacity: usize) -> Self {
        Self::with_rng(history_capacity, StdRng::from_entropy())
    }

    /// Deterministic placement and colors, for tests and scripted runs
    pub fn with_seed(history_capacity: usize, seed: u64) -> Self {
        Self::with_rng(history_capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(history_capacity: usize, rng: StdRng) -> Self {
        Self {
            snapshot: SceneSnapshot::default(),
            selection: SelectionState::default(),
            tool: Tool::default(),
            history: HistoryLog::new(history_capacity),
            version: 0,
            rng,
        }
    }

    pub fn snapshot(&self) -> &SceneSnapshot {
        &self.snapshot
    }

    pub fn get(&self, id: &str) -> Option<&SceneObject> {
        self.snapshot.get(id)
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Current scene version (increments on every snapshot change)
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Install `snapshot` as the live scene and log it under `label`
    pub(crate) fn commit(&mut self, label: impl Into<String>, snapshot: SceneSnapshot) {
        let label = label.into();
        self.install(snapshot);
        let id = self
            .history
            .record(label.clone(), self.snapshot.clone(), clock::now_ms());
        debug!(entry = id, %label, objects = self.snapshot.len(), "scene committed");
    }

    /// Replace the live snapshot without logging
    fn install(&mut self, snapshot: SceneSnapshot) {
        self.snapshot = snapshot;
        self.selection.retain_existing(&self.snapshot);
        self.version += 1;
    }

    /// Point-in-time restore. Clears the selection and is not itself logged,
    /// so restoring the same entry twice leaves the same state.
    pub fn restore_snapshot(&mut self, entry_id: u64) -> bool {
        let Some(snapshot) = self.history.restore(entry_id) else {
            return false;
        };
        self.install(snapshot);
        self.selection.clear();
        debug!(entry = entry_id, "restored history entry");
        true
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.install(snapshot);
                self.selection.clear();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.install(snapshot);
                self.selection.clear();
                true
            }
            None => false,
        }
    }

    /// Adopt a scene and log received from another editor instance.
    /// No local history entry is created.
    pub fn apply_remote(
        &mut self,
        snapshot: SceneSnapshot,
        log: Vec<HistoryEntry>,
        baseline: Option<SceneSnapshot>,
    ) {
        self.install(unique_ids(snapshot));
        self.history.adopt(log, baseline);
        debug!(objects = self.snapshot.len(), "applied remote scene");
    }
}

/// Keep the first object for each id. Every local entry point already
/// enforces unique ids, so this only trims malformed remote scenes.
fn unique_ids(snapshot: SceneSnapshot) -> SceneSnapshot {
    let unique = {
        let mut seen = HashSet::new();
        snapshot.iter().all(|o| seen.insert(o.id.as_str()))
    };
    if unique {
        return snapshot;
    }
    warn!("dropping remote objects with duplicate ids");
    snapshot.with_objects(|objects| {
        let mut seen = HashSet::new();
        objects.retain(|o| seen.insert(o.id.clone()));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ShapeType;

    #[test]
    fn test_new_store_is_empty() {
        let store = SceneStore::default();
        assert!(store.snapshot().is_empty());
        assert!(store.history().is_empty());
        assert_eq!(store.tool(), Tool::Move);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_restore_is_idempotent_and_unlogged() {
        let mut store = SceneStore::with_seed(20, 1);
        store.add_object(ShapeType::Cube);
        let first = store.history().latest().unwrap().id;
        store.add_object(ShapeType::Sphere);

        assert!(store.restore_snapshot(first));
        let once = store.snapshot().clone();
        let len = store.history().len();
        assert!(store.restore_snapshot(first));
        assert_eq!(store.snapshot(), &once);
        assert_eq!(store.history().len(), len);
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_restore_unknown_entry() {
        let mut store = SceneStore::default();
        assert!(!store.restore_snapshot(42));
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_undo_redo() {
        let mut store = SceneStore::with_seed(20, 1);
        store.add_object(ShapeType::Cube);
        store.add_object(ShapeType::Torus);
        assert!(store.undo());
        assert_eq!(store.snapshot().len(), 1);
        assert!(store.undo());
        assert!(store.snapshot().is_empty());
        assert!(!store.undo());
        assert!(store.redo());
        assert!(store.redo());
        assert_eq!(store.snapshot().len(), 2);
        assert_eq!(store.history().len(), 2);
    }

    #[test]
    fn test_apply_remote_prunes_selection() {
        let mut store = SceneStore::with_seed(20, 1);
        let id = store.add_object(ShapeType::Cube).unwrap();
        assert!(store.selection().is_selected(&id));
        store.apply_remote(SceneSnapshot::default(), vec![], None);
        assert!(store.selection().is_empty());
        assert!(store.history().is_empty());
    }

    #[test]
    fn test_apply_remote_drops_duplicate_ids() {
        let mut store = SceneStore::with_seed(20, 1);
        let objects = vec![
            crate::fixtures::primitive("dup", ShapeType::Cube),
            crate::fixtures::primitive("dup", ShapeType::Cone),
        ];
        store.apply_remote(SceneSnapshot::new(objects), vec![], None);
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(store.get("dup").unwrap().shape_type, ShapeType::Cube);
    }
}
