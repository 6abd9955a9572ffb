//! Integration tests for the scene store and its history log.

use scene_editor::fixtures;
use scene_editor::state::{SceneStore, TransformKind};
use shared::{Axis, ShapeType};

#[test]
fn test_restore_is_idempotent() {
    let mut store = SceneStore::with_seed(20, 11);
    store.add_object(ShapeType::Cube);
    let first = store.history().latest().unwrap().id;
    store.add_object(ShapeType::Sphere);
    store.add_object(ShapeType::Heart);
    let entries = store.history().len();

    assert!(store.restore_snapshot(first));
    let once = store.snapshot().clone();
    assert!(store.restore_snapshot(first));

    assert_eq!(store.snapshot(), &once);
    assert_eq!(store.snapshot().len(), 1);
    assert_eq!(store.history().len(), entries);
    assert!(store.selection().is_empty());
}

#[test]
fn test_log_keeps_newest_twenty() {
    let mut store = SceneStore::with_seed(20, 12);
    let id = store.add_object(ShapeType::Cube).unwrap();
    for i in 0..24 {
        store.update_transform_axis(&id, TransformKind::Position, Axis::Y, &i.to_string());
    }

    assert_eq!(store.history().len(), 20);
    let latest = store.history().latest().unwrap();
    assert_eq!(latest.label, "Update Transform");
    assert_eq!(latest.snapshot.get(&id).unwrap().transform.position[1], 23.0);

    // the oldest retained entry is the sixth operation
    let oldest = store.history().entries().next().unwrap();
    assert_eq!(oldest.snapshot.get(&id).unwrap().transform.position[1], 4.0);
}

#[test]
fn test_delete_prunes_selection() {
    let mut store = SceneStore::with_seed(20, 13);
    let a = store.add_object(ShapeType::Cube).unwrap();
    let b = store.add_object(ShapeType::Cone).unwrap();
    store.set_selection(Some(a.as_str()), true);
    assert_eq!(store.selection().count(), 2);

    assert!(store.delete_object(&a));
    assert!(!store.snapshot().contains(&a));
    assert_eq!(store.selection().all(), [b.clone()]);
    assert_eq!(store.history().latest().unwrap().label, "Delete Object");
}

#[test]
fn test_unparsable_number_becomes_zero() {
    let mut store = SceneStore::with_seed(20, 14);
    let id = store.add_object(ShapeType::Torus).unwrap();
    store.update_transform_axis(&id, TransformKind::Scale, Axis::Z, "not-a-number");
    assert_eq!(store.get(&id).unwrap().transform.scale[2], 0.0);
}

#[test]
fn test_undo_redo_walks_timeline() {
    let mut store = SceneStore::with_seed(20, 15);
    store.set_scene(fixtures::showcase_scene());
    let baseline = store.snapshot().clone();

    store.add_object(ShapeType::Star);
    store.add_object(ShapeType::Cube);
    let after = store.snapshot().clone();

    assert!(store.undo());
    assert!(store.undo());
    assert_eq!(store.snapshot(), &baseline);
    assert!(!store.undo());

    assert!(store.redo());
    assert!(store.redo());
    assert_eq!(store.snapshot(), &after);
    assert!(!store.redo());
}
