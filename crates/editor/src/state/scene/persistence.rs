//! Scene documents: JSON export/import and autosave

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use shared::{MeshDocument, SceneObject, SceneSnapshot, SourcePayload};
use tracing::{info, warn};

use super::SceneStore;
use crate::io::ImportError;
use crate::viewport::mesh::MeshData;

/// Display name for meshes imported from a bare mesh document
const IMPORTED_MESH_NAME: &str = "Imported Mesh";

impl SceneStore {
    /// Current scene as a pretty-printed JSON array of objects
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot)
    }

    /// Apply a parsed scene document.
    ///
    /// An array replaces the whole scene ("Import Scene"); an object is read
    /// as a single mesh document and added as an imported model.
    pub fn load_scene_document(&mut self, document: Value) -> Result<(), ImportError> {
        match document {
            Value::Array(_) => {
                let mut objects: Vec<SceneObject> = serde_json::from_value(document)?;
                reassign_duplicate_ids(&mut objects);
                let count = objects.len();
                self.commit("Import Scene", SceneSnapshot::new(objects));
                self.selection.clear();
                info!(objects = count, "imported scene");
                Ok(())
            }
            Value::Object(_) => {
                let mesh: MeshDocument = serde_json::from_value(document)?;
                // reject broken buffers before they reach the scene
                MeshData::from_document(&mesh)?;
                self.import_model(
                    IMPORTED_MESH_NAME,
                    None,
                    SourcePayload::Inline { document: mesh },
                );
                Ok(())
            }
            _ => Err(ImportError::UnsupportedDocument),
        }
    }

    /// Parse and apply scene JSON text. Malformed input is logged and dropped.
    pub fn load_scene_json(&mut self, json: &str) -> bool {
        let result = serde_json::from_str::<Value>(json)
            .map_err(ImportError::from)
            .and_then(|doc| self.load_scene_document(doc));
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("scene import dropped: {e}");
                false
            }
        }
    }

    /// Replace the scene without logging and start a fresh history from it
    pub fn set_scene(&mut self, mut objects: Vec<SceneObject>) {
        reassign_duplicate_ids(&mut objects);
        self.install(SceneSnapshot::new(objects));
        self.selection.clear();
        self.history.reset(self.snapshot.clone());
    }

    pub fn autosave_to(&self, path: &Path) -> Result<(), ImportError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.export_json()?)?;
        Ok(())
    }

    /// Read an autosaved scene; missing or malformed files yield `None`
    pub fn load_autosave_from(path: &Path) -> Option<Vec<SceneObject>> {
        let json = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&json) {
            Ok(objects) => Some(objects),
            Err(e) => {
                warn!(path = %path.display(), "ignoring malformed autosave: {e}");
                None
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn autosave_path() -> Option<std::path::PathBuf> {
        directories::ProjectDirs::from("com", "scene-editor", "scene-editor")
            .map(|dirs| dirs.data_dir().join("autosave.json"))
    }

    /// Save the scene to the platform data directory
    #[cfg(not(target_arch = "wasm32"))]
    pub fn autosave(&self) {
        if let Some(path) = Self::autosave_path() {
            if let Err(e) = self.autosave_to(&path) {
                warn!("autosave failed: {e}");
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_autosave() -> Option<Vec<SceneObject>> {
        Self::load_autosave_from(&Self::autosave_path()?)
    }
}

/// Give every repeat of an already-seen id a fresh one
fn reassign_duplicate_ids(objects: &mut [SceneObject]) {
    let mut seen = HashSet::new();
    for obj in objects.iter_mut() {
        if !seen.insert(obj.id.clone()) {
            let fresh = uuid::Uuid::new_v4().to_string();
            warn!(duplicate = %obj.id, %fresh, "reassigned duplicate object id");
            obj.id = fresh.clone();
            seen.insert(fresh);
        }
    }
}
