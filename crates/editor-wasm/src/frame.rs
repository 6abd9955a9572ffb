//! Per-frame view of the editor handed to the JavaScript renderer.

use serde::Serialize;
use scene_editor::Editor;

/// One drawable. Mesh data is fetched separately when `revision` changes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameItem {
    pub key: String,
    pub object_id: Option<String>,
    pub revision: u64,
    /// Column-major 4x4 world matrix
    pub matrix: [f32; 16],
    pub color: [f32; 3],
    pub wireframe: bool,
    pub selected: bool,
    pub loading: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCursor {
    pub user: String,
    /// Percent of the viewport
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub view_projection: [f32; 16],
    pub eye: [f32; 3],
    pub items: Vec<FrameItem>,
    pub cursors: Vec<RemoteCursor>,
    pub active_users: Vec<String>,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl Frame {
    pub fn capture(editor: &Editor, now: u64) -> Self {
        let viewport = editor.viewport();
        let size = viewport.size();
        let store = editor.store();

        let items = viewport
            .renderables()
            .iter()
            .map(|r| {
                let object_id = r.object_id().map(str::to_string);
                FrameItem {
                    key: r.key.clone(),
                    selected: !r.is_mirror()
                        && object_id
                            .as_deref()
                            .is_some_and(|id| store.selection().is_selected(id)),
                    object_id,
                    revision: r.revision(),
                    matrix: r.world_matrix().to_cols_array(),
                    color: r.color,
                    wireframe: r.wireframe,
                    loading: r.is_loading(),
                }
            })
            .collect();

        let sync = editor.sync();
        Self {
            view_projection: viewport
                .camera
                .view_projection(size.x / size.y)
                .to_cols_array(),
            eye: viewport.camera.eye_position().to_array(),
            items,
            cursors: sync
                .cursors(now)
                .into_iter()
                .map(|(user, x, y)| RemoteCursor {
                    user: user.to_string(),
                    x,
                    y,
                })
                .collect(),
            active_users: sync
                .active_users(now)
                .into_iter()
                .map(|p| p.user.clone())
                .collect(),
            can_undo: store.history().can_undo(),
            can_redo: store.history().can_redo(),
        }
    }
}
