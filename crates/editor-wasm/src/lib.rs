//! Browser bindings for the scene editor.
//!
//! The page owns rendering, file pickers and network fetches; everything
//! else runs here. Data crosses the boundary as JSON or plain JS values.

use std::rc::Rc;

use scene_editor::command::execute_json;
use scene_editor::state::{EditorSettings, SceneStore};
use scene_editor::viewport::loader::{
    LoadError, LoadRequest, LoadTicket, MeshLoader, QueuedLoader,
};
use scene_editor::{clock, Editor, Modifiers};
use serde::Serialize;
use wasm_bindgen::prelude::*;

mod frame;
mod transport;

use frame::Frame;
use transport::BroadcastTransport;

const AUTOSAVE_KEY: &str = "scene-editor.autosave";
const SETTINGS_KEY: &str = "scene-editor.settings";

/// Initialize WASM module with panic hook and logging
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
    tracing::info!("scene editor initialized");
}

/// Loader whose requests are fetched by the page and handed back
struct HostLoader(Rc<QueuedLoader>);

impl MeshLoader for HostLoader {
    fn start(&self, request: LoadRequest, ticket: LoadTicket) {
        self.0.start(request, ticket);
    }
}

#[derive(Serialize)]
struct PendingLoad {
    key: String,
    url: String,
    format: shared::ModelFormat,
}

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
}

#[wasm_bindgen]
pub struct WasmEditor {
    editor: Editor,
    loads: Rc<QueuedLoader>,
}

#[wasm_bindgen]
impl WasmEditor {
    /// Editor restored from the last autosave, if any
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        let settings = local_storage()
            .and_then(|s| s.get_item(SETTINGS_KEY).ok().flatten())
            .and_then(|json| EditorSettings::from_json(&json).ok())
            .unwrap_or_else(EditorSettings::default);
        let loads = Rc::new(QueuedLoader::new());
        let store = SceneStore::new(settings.history.capacity);
        let mut editor = Editor::with_store(settings, store, Box::new(HostLoader(Rc::clone(&loads))));

        let saved = local_storage().and_then(|s| s.get_item(AUTOSAVE_KEY).ok().flatten());
        if let Some(json) = saved {
            match serde_json::from_str::<Vec<shared::SceneObject>>(&json) {
                Ok(objects) => editor.edit(|s| s.set_scene(objects)),
                Err(e) => tracing::warn!("ignoring malformed autosave: {e}"),
            }
        }
        Self { editor, loads }
    }

    /// Run one JSON command; returns the JSON response
    pub fn execute(&mut self, command_json: &str) -> Result<String, JsError> {
        let response = execute_json(&mut self.editor, command_json).map_err(|e| JsError::new(&e))?;
        Ok(serde_json::to_string(&response)?)
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.editor.viewport_mut().resize(width, height);
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, shift: bool) {
        self.editor.pointer_down(x, y, shift);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.editor.pointer_move(x, y);
    }

    pub fn pointer_up(&mut self) -> bool {
        self.editor.pointer_up()
    }

    pub fn wheel(&mut self, delta: f32) {
        self.editor.wheel(delta);
    }

    pub fn key_down(&mut self, key: &str, command: bool, shift: bool, in_text_field: bool) -> bool {
        self.editor
            .key_down(key, Modifiers { command, shift }, in_text_field)
    }

    /// Import a file the user picked or dropped
    pub fn import_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), JsError> {
        Ok(self.editor.import_file(name, bytes)?)
    }

    pub fn export_scene_json(&self) -> Result<String, JsError> {
        Ok(self.editor.export_scene_json()?)
    }

    pub fn export_glb(&self) -> Vec<u8> {
        self.editor.export_glb()
    }

    /// Models the page should fetch: `[{key, url, format}]`
    pub fn pending_loads(&self) -> Result<JsValue, JsValue> {
        let pending: Vec<PendingLoad> = self
            .loads
            .pending_requests()
            .into_iter()
            .map(|r| PendingLoad {
                key: r.key,
                url: r.url,
                format: r.format,
            })
            .collect();
        to_js(&pending)
    }

    /// Hand fetched model bytes back. Returns false if the object is gone.
    pub fn deliver_model(&mut self, key: &str, bytes: &[u8]) -> bool {
        self.loads.deliver_bytes(key, bytes) > 0
    }

    pub fn fail_load(&mut self, key: &str, url: &str, reason: &str) {
        self.loads.complete(
            key,
            Err(LoadError::Fetch {
                url: url.to_string(),
                reason: reason.to_string(),
            }),
        );
    }

    /// Join the collaboration channel configured in settings
    pub fn join(&mut self, user_name: &str) -> Result<(), JsValue> {
        let channel = self.editor.sync().config().channel.clone();
        let transport = BroadcastTransport::open(&channel)?;
        self.editor.set_user_name(user_name);
        if let Some(storage) = local_storage() {
            if let Ok(json) = serde_json::to_string(self.editor.settings()) {
                let _ = storage.set_item(SETTINGS_KEY, &json);
            }
        }
        self.editor.join(Box::new(transport));
        Ok(())
    }

    pub fn leave(&mut self) {
        self.editor.leave();
    }

    /// Periodic work; returns true when the renderer should redraw
    pub fn tick(&mut self) -> bool {
        let report = self.editor.tick();
        !report.loaded.is_empty() || report.sync.scene_applied || report.sync.cursor_updates > 0
    }

    /// Camera, drawables and presence for the current frame
    pub fn frame(&self) -> Result<JsValue, JsValue> {
        to_js(&Frame::capture(&self.editor, clock::now_ms()))
    }

    /// Interleaved position+normal floats of one drawable, local space
    pub fn mesh_vertices(&self, key: &str) -> Option<Vec<f32>> {
        let r = self.editor.viewport().renderables().get(key)?;
        Some(r.local_mesh().vertices)
    }

    pub fn mesh_indices(&self, key: &str) -> Option<Vec<u32>> {
        let r = self.editor.viewport().renderables().get(key)?;
        Some(r.local_mesh().indices)
    }

    /// Messages for the status bar since the last call
    pub fn take_notices(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.editor.take_notices())
    }

    /// Persist the scene to localStorage
    pub fn autosave(&self) {
        let Some(storage) = local_storage() else {
            return;
        };
        match self.editor.export_scene_json() {
            Ok(json) => {
                if storage.set_item(AUTOSAVE_KEY, &json).is_err() {
                    tracing::warn!("autosave failed: storage full or unavailable");
                }
            }
            Err(e) => tracing::warn!("autosave failed: {e}"),
        }
    }
}

impl Default for WasmEditor {
    fn default() -> Self {
        Self::new()
    }
}
