use shared::{ObjectId, SceneSnapshot};

/// Object selection state (supports multi-select)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    /// Selected object IDs (in order of selection)
    selected: Vec<ObjectId>,
}

impl SelectionState {
    /// Primary (first) selected object; operand A of a boolean
    pub fn primary(&self) -> Option<&ObjectId> {
        self.selected.first()
    }

    /// All selected objects
    pub fn all(&self) -> &[ObjectId] {
        &self.selected
    }

    /// Check if an object is selected
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    /// Select a single object (clears previous selection)
    pub fn select(&mut self, id: ObjectId) {
        self.selected.clear();
        self.selected.push(id);
    }

    /// Toggle selection (shift+click behavior)
    pub fn toggle(&mut self, id: ObjectId) {
        if let Some(pos) = self.selected.iter().position(|s| s == &id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id);
        }
    }

    /// Clear all selection
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Number of selected objects
    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Drop ids that no longer exist in `snapshot`
    pub fn retain_existing(&mut self, snapshot: &SceneSnapshot) {
        self.selected.retain(|id| snapshot.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use shared::ShapeType;

    #[test]
    fn test_initial_empty() {
        let s = SelectionState::default();
        assert!(s.primary().is_none());
        assert!(s.all().is_empty());
        assert_eq!(s.count(), 0);
    }

    #[test]
    fn test_select_replaces() {
        let mut s = SelectionState::default();
        s.select("a".into());
        s.select("b".into());
        assert_eq!(s.all(), ["b".to_string()]);
    }

    #[test]
    fn test_toggle_keeps_insertion_order() {
        let mut s = SelectionState::default();
        s.toggle("a".into());
        s.toggle("b".into());
        s.toggle("c".into());
        assert_eq!(s.primary().map(String::as_str), Some("a"));
        s.toggle("a".into());
        assert_eq!(s.all(), ["b".to_string(), "c".to_string()]);
        assert!(!s.is_selected("a"));
    }

    #[test]
    fn test_clear() {
        let mut s = SelectionState::default();
        s.select("a".into());
        s.clear();
        assert!(s.is_empty());
    }

    #[test]
    fn test_retain_existing() {
        let snap = shared::SceneSnapshot::new(vec![fixtures::primitive("a", ShapeType::Cube)]);
        let mut s = SelectionState::default();
        s.toggle("a".into());
        s.toggle("gone".into());
        s.retain_existing(&snap);
        assert_eq!(s.all(), ["a".to_string()]);
    }
}
