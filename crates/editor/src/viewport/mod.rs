//! Viewport: camera, renderable cache, picking and pointer interaction.
//!
//! The host render loop only reads from here; all scene changes go through
//! the [`SceneStore`](crate::state::SceneStore).

pub mod camera;
pub mod interaction;
pub mod loader;
pub mod mesh;
pub mod picking;
pub mod renderables;

use glam::Vec2;

use crate::io::glb::ExportMesh;
use crate::state::settings::ImportSettings;
use crate::state::{EditorSettings, SceneStore};
use camera::OrbitCamera;
use interaction::InteractionState;
use loader::MeshLoader;
use renderables::{PickHit, ReconcileReport, RenderableCache};

pub struct Viewport {
    pub camera: OrbitCamera,
    cache: RenderableCache,
    interaction: InteractionState,
    /// Canvas size in pixels
    size: Vec2,
    import: ImportSettings,
    /// Store version the cache was last reconciled against
    synced_version: Option<u64>,
}

impl Viewport {
    pub fn new(settings: &EditorSettings) -> Self {
        Self {
            camera: OrbitCamera::new(settings.camera.clone()),
            cache: RenderableCache::new(),
            interaction: InteractionState::Idle,
            size: Vec2::new(800.0, 600.0),
            import: settings.import.clone(),
            synced_version: None,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.size = Vec2::new(width.max(1.0), height.max(1.0));
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn renderables(&self) -> &RenderableCache {
        &self.cache
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    /// Reconcile once per store version; `None` when already current
    pub fn sync(&mut self, store: &SceneStore, loader: &dyn MeshLoader) -> Option<ReconcileReport> {
        if self.synced_version == Some(store.version()) {
            return None;
        }
        self.synced_version = Some(store.version());
        Some(self.cache.reconcile(store.snapshot(), loader, &self.import))
    }

    /// Install finished async loads
    pub fn poll_loads(&mut self, store: &SceneStore) -> Vec<String> {
        self.cache.poll_loads(store.snapshot(), &self.import)
    }

    /// Object under a pointer position
    pub fn pick(&self, pointer: Vec2) -> Option<PickHit> {
        let ray = self.camera.screen_ray(pointer, self.size);
        self.cache.pick(&ray)
    }

    /// World-space meshes of every renderable, mirrors included
    pub fn export_meshes(&self, store: &SceneStore) -> Vec<ExportMesh> {
        self.cache
            .iter()
            .filter(|r| r.triangle_count() > 0)
            .map(|r| {
                let owner = r.object_id().and_then(|id| store.get(id));
                let name = match owner {
                    Some(obj) if r.is_mirror() => format!("{} (mirror)", obj.name()),
                    Some(obj) => obj.name().to_string(),
                    None => r.key.clone(),
                };
                ExportMesh {
                    name,
                    mesh: r.world_mesh(),
                    color: r.color,
                }
            })
            .collect()
    }
}
