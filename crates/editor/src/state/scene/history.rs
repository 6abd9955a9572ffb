//! Bounded history log with point-in-time restore and undo/redo stepping

use std::collections::VecDeque;

use shared::{HistoryEntry, SceneSnapshot};

pub const DEFAULT_CAPACITY: usize = 20;
pub const MAX_CAPACITY: usize = 1000;

/// Ring of labeled snapshots, oldest first.
///
/// The cursor names the entry the live scene corresponds to; `None` means
/// the baseline, i.e. the state before the oldest retained entry.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    next_id: u64,
    cursor: Option<u64>,
    baseline: SceneSnapshot,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_CAPACITY);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
            next_id: 1,
            cursor: None,
            baseline: SceneSnapshot::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, oldest first
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn get(&self, id: u64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    /// Append an entry, evicting the oldest past capacity. Returns the new id.
    pub fn record(&mut self, label: String, snapshot: SceneSnapshot, timestamp: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_back(HistoryEntry {
            id,
            label,
            snapshot,
            timestamp,
        });
        self.evict();
        self.cursor = Some(id);
        id
    }

    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            if let Some(old) = self.entries.pop_front() {
                self.baseline = old.snapshot;
            }
        }
    }

    /// Snapshot of entry `id`, moving the cursor onto it
    pub fn restore(&mut self, id: u64) -> Option<SceneSnapshot> {
        let snapshot = self.get(id)?.snapshot.clone();
        self.cursor = Some(id);
        Some(snapshot)
    }

    fn cursor_position(&self) -> Option<usize> {
        let id = self.cursor?;
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor_position().is_some()
    }

    pub fn can_redo(&self) -> bool {
        match self.cursor {
            None => !self.entries.is_empty(),
            Some(_) => self
                .cursor_position()
                .is_some_and(|p| p + 1 < self.entries.len()),
        }
    }

    /// Step back one entry (or to the baseline)
    pub fn undo(&mut self) -> Option<SceneSnapshot> {
        let pos = self.cursor_position()?;
        if pos == 0 {
            self.cursor = None;
            return Some(self.baseline.clone());
        }
        let entry = &self.entries[pos - 1];
        self.cursor = Some(entry.id);
        Some(entry.snapshot.clone())
    }

    /// Step forward one entry
    pub fn redo(&mut self) -> Option<SceneSnapshot> {
        let next = match self.cursor {
            None => 0,
            Some(_) => self.cursor_position()? + 1,
        };
        let entry = self.entries.get(next)?;
        self.cursor = Some(entry.id);
        Some(entry.snapshot.clone())
    }

    /// State before the oldest retained entry
    pub fn baseline(&self) -> &SceneSnapshot {
        &self.baseline
    }

    /// Replace the log with one received from another editor instance.
    /// The cursor moves to the newest entry and future ids stay unique.
    /// Without a remote baseline the local one is kept.
    pub fn adopt(&mut self, entries: Vec<HistoryEntry>, baseline: Option<SceneSnapshot>) {
        if let Some(baseline) = baseline {
            self.baseline = baseline;
        }
        self.entries = entries.into();
        self.evict();
        if let Some(max) = self.entries.iter().map(|e| e.id).max() {
            self.next_id = self.next_id.max(max + 1);
        }
        self.cursor = self.entries.back().map(|e| e.id);
    }

    /// Drop all entries and start over from `baseline`
    pub fn reset(&mut self, baseline: SceneSnapshot) {
        self.entries.clear();
        self.cursor = None;
        self.baseline = baseline;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use shared::ShapeType;

    fn snap(n: usize) -> SceneSnapshot {
        SceneSnapshot::new(
            (0..n)
                .map(|i| fixtures::primitive(&format!("o{i}"), ShapeType::Cube))
                .collect(),
        )
    }

    #[test]
    fn test_record_assigns_increasing_ids() {
        let mut log = HistoryLog::default();
        let a = log.record("A".into(), snap(1), 0);
        let b = log.record("B".into(), snap(2), 0);
        assert!(b > a);
        assert_eq!(log.cursor(), Some(b));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = HistoryLog::new(3);
        for i in 0..5 {
            log.record(format!("op {i}"), snap(i), 0);
        }
        let labels: Vec<_> = log.entries().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["op 2", "op 3", "op 4"]);
    }

    #[test]
    fn test_undo_to_baseline_and_redo() {
        let mut log = HistoryLog::new(2);
        log.record("1".into(), snap(1), 0);
        log.record("2".into(), snap(2), 0);
        log.record("3".into(), snap(3), 0);

        assert_eq!(log.undo().unwrap().len(), 2);
        // baseline is the snapshot of the evicted entry
        assert_eq!(log.undo().unwrap().len(), 1);
        assert!(!log.can_undo());
        assert!(log.undo().is_none());

        assert_eq!(log.redo().unwrap().len(), 2);
        assert_eq!(log.redo().unwrap().len(), 3);
        assert!(!log.can_redo());
        assert!(log.redo().is_none());
    }

    #[test]
    fn test_restore_moves_cursor() {
        let mut log = HistoryLog::default();
        let first = log.record("1".into(), snap(1), 0);
        log.record("2".into(), snap(2), 0);
        assert_eq!(log.restore(first).unwrap().len(), 1);
        assert_eq!(log.cursor(), Some(first));
        assert!(log.restore(999).is_none());
        assert_eq!(log.cursor(), Some(first));
    }

    #[test]
    fn test_reset_undoes_to_new_baseline() {
        let mut log = HistoryLog::default();
        log.record("1".into(), snap(1), 0);
        log.reset(snap(4));
        assert!(log.is_empty());
        log.record("2".into(), snap(5), 0);
        assert_eq!(log.undo().unwrap().len(), 4);
    }

    #[test]
    fn test_adopt_keeps_ids_unique() {
        let mut remote = HistoryLog::default();
        for i in 0..4 {
            remote.record(format!("r{i}"), snap(i), 0);
        }
        let mut local = HistoryLog::default();
        local.record("l".into(), snap(0), 0);
        local.adopt(remote.to_vec(), Some(remote.baseline().clone()));
        assert_eq!(local.len(), 4);
        assert_eq!(local.cursor(), Some(4));
        let id = local.record("next".into(), snap(1), 0);
        assert_eq!(id, 5);
    }

    #[test]
    fn test_adopt_takes_remote_baseline() {
        let mut remote = HistoryLog::new(2);
        for i in 1..=3 {
            remote.record(format!("r{i}"), snap(i), 0);
        }
        // remote evicted "r1", so its baseline holds one object
        let mut local = HistoryLog::new(2);
        local.reset(snap(7));
        local.adopt(remote.to_vec(), Some(remote.baseline().clone()));

        assert_eq!(local.undo().unwrap().len(), 2);
        assert_eq!(local.undo().unwrap().len(), 1);
        assert!(local.undo().is_none());
    }
}
