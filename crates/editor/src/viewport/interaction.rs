//! Pointer interaction: orbiting the camera and dragging objects.
//!
//! A drag only moves the renderable; the scene sees a single
//! "Move Object" commit when the pointer is released.

use glam::{Vec2, Vec3};
use shared::ObjectId;

use super::Viewport;
use crate::state::{SceneStore, Tool};

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    Orbiting {
        last: Vec2,
    },
    Dragging {
        id: ObjectId,
        plane_point: Vec3,
        plane_normal: Vec3,
        /// Object position minus the grabbed point
        offset: Vec3,
        start: Vec3,
        current: Vec3,
    },
}

impl Viewport {
    /// Pointer pressed at `pointer` (pixels). `multi` is the shift modifier.
    pub fn pointer_down(&mut self, store: &mut SceneStore, pointer: Vec2, multi: bool) {
        let Some(hit) = self.pick(pointer) else {
            store.set_selection(None, multi);
            self.interaction = InteractionState::Orbiting { last: pointer };
            return;
        };

        store.set_selection(Some(hit.object_id.as_str()), multi);

        let draggable = store.tool() == Tool::Move && store.selection().is_selected(&hit.object_id);
        let position = self.cache.get(&hit.object_id).map(|r| r.position);
        self.interaction = match position {
            Some(position) if draggable => InteractionState::Dragging {
                id: hit.object_id,
                plane_point: hit.point,
                plane_normal: self.camera.toward_camera(),
                offset: position - hit.point,
                start: position,
                current: position,
            },
            _ => InteractionState::Orbiting { last: pointer },
        };
    }

    pub fn pointer_move(&mut self, pointer: Vec2) {
        match &mut self.interaction {
            InteractionState::Idle => {}
            InteractionState::Orbiting { last } => {
                let delta = pointer - *last;
                *last = pointer;
                self.camera.orbit(delta.x, delta.y);
            }
            InteractionState::Dragging {
                id,
                plane_point,
                plane_normal,
                offset,
                current,
                ..
            } => {
                let ray = self.camera.screen_ray(pointer, self.size);
                if let Some(hit) = ray.intersect_plane(*plane_point, *plane_normal) {
                    *current = hit + *offset;
                    self.cache.set_position(id, *current);
                }
            }
        }
    }

    /// Pointer released. Returns true if a move was committed.
    pub fn pointer_up(&mut self, store: &mut SceneStore) -> bool {
        let state = std::mem::replace(&mut self.interaction, InteractionState::Idle);
        match state {
            InteractionState::Dragging {
                id, start, current, ..
            } if current != start => {
                let p = current.as_dvec3().to_array();
                store.commit_move(&id, p)
            }
            _ => false,
        }
    }

    pub fn wheel(&mut self, delta: f32) {
        self.camera.zoom(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EditorSettings;
    use crate::viewport::loader::QueuedLoader;
    use shared::ShapeType;

    fn setup() -> (SceneStore, Viewport, String) {
        let mut store = SceneStore::with_seed(20, 9);
        let id = store.add_object(ShapeType::Cube).unwrap();
        store.update_transform_axis(&id, crate::state::TransformKind::Position, shared::Axis::X, "0");
        store.update_transform_axis(&id, crate::state::TransformKind::Position, shared::Axis::Z, "0");
        let mut viewport = Viewport::new(&EditorSettings::default());
        viewport.sync(&store, &QueuedLoader::new());
        (store, viewport, id)
    }

    fn center(viewport: &Viewport) -> Vec2 {
        viewport.size() * 0.5
    }

    #[test]
    fn test_drag_commits_once_on_release() {
        let (mut store, mut viewport, id) = setup();
        let entries = store.history().len();

        viewport.pointer_down(&mut store, center(&viewport), false);
        assert!(matches!(viewport.interaction(), InteractionState::Dragging { .. }));

        viewport.pointer_move(center(&viewport) + Vec2::new(40.0, 0.0));
        viewport.pointer_move(center(&viewport) + Vec2::new(80.0, 10.0));
        // scene untouched during the drag
        assert_eq!(store.history().len(), entries);
        assert_eq!(store.get(&id).unwrap().transform.position, [0.0; 3]);
        assert_ne!(viewport.renderables().get(&id).unwrap().position, Vec3::ZERO);

        assert!(viewport.pointer_up(&mut store));
        assert_eq!(store.history().len(), entries + 1);
        assert_eq!(store.history().latest().unwrap().label, "Move Object");
        assert_ne!(store.get(&id).unwrap().transform.position, [0.0; 3]);
    }

    #[test]
    fn test_click_without_motion_commits_nothing() {
        let (mut store, mut viewport, _) = setup();
        let entries = store.history().len();
        viewport.pointer_down(&mut store, center(&viewport), false);
        assert!(!viewport.pointer_up(&mut store));
        assert_eq!(store.history().len(), entries);
        assert_eq!(viewport.interaction(), &InteractionState::Idle);
    }

    #[test]
    fn test_select_tool_orbits_on_hit() {
        let (mut store, mut viewport, id) = setup();
        store.set_tool(Tool::Select);
        store.set_selection(None, false);
        viewport.pointer_down(&mut store, center(&viewport), false);
        assert!(store.selection().is_selected(&id));
        assert!(matches!(viewport.interaction(), InteractionState::Orbiting { .. }));
    }

    #[test]
    fn test_miss_clears_single_keeps_multi() {
        let (mut store, mut viewport, id) = setup();
        let corner = Vec2::new(1.0, 1.0);

        viewport.pointer_down(&mut store, corner, true);
        assert!(store.selection().is_selected(&id));
        viewport.pointer_up(&mut store);

        viewport.pointer_down(&mut store, corner, false);
        assert!(store.selection().is_empty());
        assert!(matches!(viewport.interaction(), InteractionState::Orbiting { .. }));
    }

    #[test]
    fn test_orbit_moves_camera() {
        let (mut store, mut viewport, _) = setup();
        let before = viewport.camera.theta;
        viewport.pointer_down(&mut store, Vec2::new(1.0, 1.0), false);
        viewport.pointer_move(Vec2::new(51.0, 1.0));
        viewport.pointer_up(&mut store);
        assert!(viewport.camera.theta < before);
    }
}
