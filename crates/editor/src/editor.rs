//! Editor facade: wires store, viewport, loader and collaboration together.
//!
//! Every mutating call runs the same control flow: store mutation, viewport
//! reconciliation, then (when joined) a scene broadcast to other tabs.

use glam::Vec2;
use serde::Serialize;
use shared::{ModelFormat, ObjectId, SourcePayload};
use tracing::{info, warn};

use crate::clock;
use crate::csg::{self, BooleanOp, CsgError};
use crate::io::{self, FileKind, ImportError};
use crate::state::{EditorSettings, SceneStore};
use crate::sync::{SyncConfig, SyncReceipt, SyncSession, SyncTransport};
use crate::viewport::loader::MeshLoader;
use crate::viewport::renderables::ReconcileReport;
use crate::viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// User-facing status message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Keyboard modifier state for [`Editor::key_down`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Ctrl, or Cmd on macOS
    pub command: bool,
    pub shift: bool,
}

/// What one [`Editor::tick`] did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub loaded: Vec<String>,
    pub sync: SyncReceipt,
    pub reconcile: Option<ReconcileReport>,
}

pub struct Editor {
    store: SceneStore,
    viewport: Viewport,
    sync: SyncSession,
    loader: Box<dyn MeshLoader>,
    settings: EditorSettings,
    notices: Vec<Notice>,
}

impl Editor {
    pub fn new(settings: EditorSettings, loader: Box<dyn MeshLoader>) -> Self {
        let store = SceneStore::new(settings.history.capacity);
        Self::with_store(settings, store, loader)
    }

    /// Editor around an existing store (seeded stores in tests)
    pub fn with_store(mut settings: EditorSettings, store: SceneStore, loader: Box<dyn MeshLoader>) -> Self {
        settings.sanitize();
        let mut editor = Self {
            viewport: Viewport::new(&settings),
            sync: SyncSession::new(SyncConfig::from(&settings.sync)),
            store,
            loader,
            settings,
            notices: Vec::new(),
        };
        editor.after_change();
        editor
    }

    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn sync(&self) -> &SyncSession {
        &self.sync
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Run a store mutation, then reconcile and broadcast
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut SceneStore) -> R) -> R {
        let result = f(&mut self.store);
        self.after_change();
        result
    }

    /// Reconcile renderables with the store and share the new scene.
    /// A no-op when the store version did not move.
    pub fn after_change(&mut self) -> Option<ReconcileReport> {
        let report = self.viewport.sync(&self.store, self.loader.as_ref())?;
        if self.sync.is_joined() {
            if let Err(e) = self.sync.broadcast_scene(&self.store) {
                warn!("scene broadcast failed: {e}");
            }
        }
        Some(report)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Info => info!("{message}"),
            NoticeLevel::Warning => warn!("{message}"),
        }
        self.notices.push(Notice { level, message });
    }

    /// Notices raised since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Combine the two selected objects. The first selected is operand A.
    pub fn boolean(&mut self, op: BooleanOp) -> Result<ObjectId, CsgError> {
        let result = self.evaluate_boolean(op);
        match &result {
            Ok(id) => info!(op = op.label(), id = %id, "boolean applied"),
            Err(e) => self.notify(NoticeLevel::Warning, e.to_string()),
        }
        result
    }

    fn evaluate_boolean(&mut self, op: BooleanOp) -> Result<ObjectId, CsgError> {
        let selected = self.store.selection().all();
        let [a, b] = selected else {
            return Err(CsgError::SelectionCount(selected.len()));
        };
        let (a, b) = (a.clone(), b.clone());
        let lhs = self
            .store
            .get(&a)
            .ok_or_else(|| CsgError::MissingOperand(a.clone()))?;
        let rhs = self
            .store
            .get(&b)
            .ok_or_else(|| CsgError::MissingOperand(b.clone()))?;
        let derived = csg::evaluate(op, lhs, rhs)?;
        let id = derived.id.clone();
        self.edit(|store| store.apply_boolean(&a, &b, derived));
        Ok(id)
    }

    /// Keyboard shortcut. Returns true if the key was handled.
    /// Keys typed into a text field never reach the scene.
    pub fn key_down(&mut self, key: &str, modifiers: Modifiers, in_text_field: bool) -> bool {
        if in_text_field {
            return false;
        }
        match key {
            "Delete" | "Backspace" => self.edit(|s| s.delete_selected()),
            "Escape" => {
                self.store.set_selection(None, false);
                true
            }
            "z" | "Z" if modifiers.command && modifiers.shift => self.edit(|s| s.redo()),
            "z" | "Z" if modifiers.command => self.edit(|s| s.undo()),
            "y" | "Y" if modifiers.command => self.edit(|s| s.redo()),
            _ => false,
        }
    }

    /// Import a dropped/opened file by name and content
    pub fn import_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), ImportError> {
        let result = self.read_file(name, bytes);
        match &result {
            Ok(()) => self.notify(NoticeLevel::Info, format!("Imported {name}")),
            Err(e) => self.notify(NoticeLevel::Warning, format!("Could not import {name}: {e}")),
        }
        result
    }

    fn read_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), ImportError> {
        match io::classify(name)? {
            FileKind::Document => {
                let doc: serde_json::Value = serde_json::from_slice(bytes)?;
                self.edit(|s| s.load_scene_document(doc))
            }
            FileKind::Model(format) => {
                let mesh = io::parse_model(format, bytes)?;
                let payload = SourcePayload::Inline {
                    document: mesh.to_document(),
                };
                self.edit(|s| s.import_model(name, Some(format), payload));
                Ok(())
            }
        }
    }

    /// Import a model by reference; geometry arrives through the loader
    pub fn import_url(&mut self, url: &str) -> Result<ObjectId, ImportError> {
        let format = match io::classify(url)? {
            FileKind::Model(format) => format,
            FileKind::Document => return Err(ImportError::UnsupportedFile(url.to_string())),
        };
        Ok(self.import_reference(url, format))
    }

    pub fn import_reference(&mut self, url: &str, format: ModelFormat) -> ObjectId {
        let name = url
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(url)
            .to_string();
        let payload = SourcePayload::Reference {
            url: url.to_string(),
            format,
        };
        self.edit(|s| s.import_model(&name, Some(format), payload))
    }

    pub fn export_scene_json(&self) -> Result<String, serde_json::Error> {
        self.store.export_json()
    }

    /// GLB of everything currently rendered, mirrors included
    pub fn export_glb(&self) -> Vec<u8> {
        io::build_glb(&self.viewport.export_meshes(&self.store))
    }

    // ── Pointer input ─────────────────────────────────────────

    pub fn pointer_down(&mut self, x: f32, y: f32, shift: bool) {
        self.viewport
            .pointer_down(&mut self.store, Vec2::new(x, y), shift);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.viewport.pointer_move(Vec2::new(x, y));
        if self.sync.is_joined() {
            let size = self.viewport.size();
            let (px, py) = (100.0 * x / size.x, 100.0 * y / size.y);
            if let Err(e) = self.sync.send_cursor(px as f64, py as f64) {
                warn!("cursor update failed: {e}");
            }
        }
    }

    pub fn pointer_up(&mut self) -> bool {
        let committed = self.viewport.pointer_up(&mut self.store);
        self.after_change();
        committed
    }

    pub fn wheel(&mut self, delta: f32) {
        self.viewport.wheel(delta);
    }

    // ── Collaboration ─────────────────────────────────────────

    pub fn set_user_name(&mut self, name: &str) {
        self.settings.sync.user_name = name.to_string();
        self.sync.set_user_name(name);
    }

    /// Join a channel. Nothing is sent until the next local edit.
    pub fn join(&mut self, transport: Box<dyn SyncTransport>) {
        self.sync.join(transport);
    }

    pub fn leave(&mut self) {
        self.sync.leave();
    }

    /// True while any imported reference is still loading
    pub fn loads_pending(&self) -> bool {
        self.viewport.renderables().iter().any(|r| r.is_loading())
    }

    /// Periodic work: finished loads, incoming messages, heartbeats
    pub fn tick(&mut self) -> TickReport {
        self.tick_at(clock::now_ms())
    }

    pub fn tick_at(&mut self, now: u64) -> TickReport {
        let loaded = self.viewport.poll_loads(&self.store);
        let mut report = TickReport {
            loaded,
            ..Default::default()
        };
        if self.sync.is_joined() {
            report.sync = self.sync.receive(&mut self.store, now);
            if report.sync.scene_applied {
                report.reconcile = self.after_change();
            }
            if let Err(e) = self.sync.tick(now) {
                warn!("sync upkeep failed: {e}");
            }
        }
        report
    }
}
