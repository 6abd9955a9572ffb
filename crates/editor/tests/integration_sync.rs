//! Integration tests for cross-tab collaboration between editors.

use scene_editor::state::{EditorSettings, SceneStore, TransformKind};
use scene_editor::sync::LocalHub;
use scene_editor::viewport::loader::QueuedLoader;
use scene_editor::Editor;
use shared::{Axis, ShapeType};

fn editor(seed: u64, name: &str) -> Editor {
    let mut settings = EditorSettings::default();
    settings.sync.user_name = name.to_string();
    Editor::with_store(
        settings,
        SceneStore::with_seed(20, seed),
        Box::new(QueuedLoader::new()),
    )
}

#[test]
fn test_edits_propagate_without_echo() {
    let hub = LocalHub::default();
    let mut a = editor(1, "Ada");
    let mut b = editor(2, "Bo");
    a.join(Box::new(hub.connect()));
    b.join(Box::new(hub.connect()));

    let id = a.edit(|s| s.add_object(ShapeType::Cylinder)).unwrap();
    assert!(b.tick_at(0).sync.scene_applied);
    assert_eq!(b.store().snapshot(), a.store().snapshot());
    assert_eq!(b.store().history().len(), 1);

    // applying the remote scene produced no broadcast back
    assert!(!a.tick_at(0).sync.scene_applied);

    b.edit(|s| s.update_transform_axis(&id, TransformKind::Position, Axis::Y, "3"));
    assert!(a.tick_at(10).sync.scene_applied);
    assert_eq!(a.store().get(&id).unwrap().transform.position[1], 3.0);
    assert_eq!(a.store().history().len(), 2);
    assert_eq!(a.store().history().latest().unwrap().label, "Update Transform");
}

#[test]
fn test_last_write_wins() {
    let hub = LocalHub::default();
    let mut a = editor(3, "Ada");
    let mut b = editor(4, "Bo");
    let mut c = editor(5, "Cy");
    a.join(Box::new(hub.connect()));
    b.join(Box::new(hub.connect()));
    c.join(Box::new(hub.connect()));

    a.edit(|s| s.add_object(ShapeType::Cube));
    b.edit(|s| s.add_object(ShapeType::Sphere));
    c.tick_at(0);
    assert_eq!(c.store().snapshot(), b.store().snapshot());
}

#[test]
fn test_presence_expires_after_timeout() {
    let hub = LocalHub::default();
    let mut a = editor(6, "Ada");
    let mut b = editor(7, "Bo");
    a.join(Box::new(hub.connect()));
    b.join(Box::new(hub.connect()));

    b.tick_at(1_000);
    a.tick_at(1_000);
    let users = a.sync().active_users(1_000);
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].user, "Bo");

    assert_eq!(a.sync().active_users(6_000).len(), 1);
    assert!(a.sync().active_users(6_001).is_empty());
}

#[test]
fn test_cursor_shared_in_percent() {
    let hub = LocalHub::default();
    let mut a = editor(8, "Ada");
    let mut b = editor(9, "Bo");
    a.join(Box::new(hub.connect()));
    b.join(Box::new(hub.connect()));

    b.viewport_mut().resize(400.0, 200.0);
    b.pointer_move(100.0, 150.0);
    a.tick_at(0);
    assert_eq!(a.sync().cursors(0), vec![("Bo", 25.0, 75.0)]);
}

#[test]
fn test_left_editor_stops_sharing() {
    let hub = LocalHub::default();
    let mut a = editor(10, "Ada");
    let mut b = editor(11, "Bo");
    a.join(Box::new(hub.connect()));
    b.join(Box::new(hub.connect()));
    b.leave();

    a.edit(|s| s.add_object(ShapeType::Cube));
    assert!(!b.tick_at(0).sync.scene_applied);
    assert!(b.store().snapshot().is_empty());
}
