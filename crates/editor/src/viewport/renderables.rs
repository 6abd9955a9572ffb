//! Renderable cache: the viewport-side mirror of the scene.
//!
//! Renderables are derived from scene objects and never authoritative.
//! Reconciliation reuses a renderable while its build key is unchanged and
//! rebuilds it otherwise; stale ones are removed and reported so the host
//! can release GPU resources.

use std::collections::BTreeMap;

use glam::{EulerRot, Mat4, Quat, Vec3};
use shared::{
    Axis, ExtrusionProfile, ObjectId, ObjectKind, SceneObject, SceneSnapshot, ShapeType,
    SourcePayload,
};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, warn};

use super::loader::{LoadRequest, LoadResult, LoadTicket, MeshLoader};
use super::mesh::MeshData;
use super::picking::{pick_triangle, Ray};
use crate::build::build_object_mesh;
use crate::helpers::{blend_rgb, short_id};
use crate::state::settings::ImportSettings;

const MIRROR_SUFFIX: &str = "_mirror";

/// Cache key of the mirror clone for object `id`
pub fn mirror_key(id: &str) -> String {
    format!("{id}{MIRROR_SUFFIX}")
}

/// Node of a renderable's content tree, in renderable-local space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderNode {
    /// Owning scene object, set on the root of every renderable
    pub object_id: Option<ObjectId>,
    pub mesh: Option<MeshData>,
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    fn tagged(id: &str) -> Self {
        Self {
            object_id: Some(id.to_string()),
            ..Default::default()
        }
    }

    fn leaf(mesh: MeshData) -> Self {
        Self {
            mesh: Some(mesh),
            ..Default::default()
        }
    }

    /// Nearest hit in this subtree: (ray parameter, owning id from the
    /// closest tagged ancestor)
    fn pick<'a>(&'a self, ray: &Ray, owner: Option<&'a str>) -> Option<(f32, Option<&'a str>)> {
        let owner = self.object_id.as_deref().or(owner);
        let own = self
            .mesh
            .as_ref()
            .and_then(|m| pick_triangle(ray, m))
            .map(|t| (t, owner));
        self.children
            .iter()
            .filter_map(|c| c.pick(ray, owner))
            .chain(own)
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn triangle_count(&self) -> usize {
        self.mesh.as_ref().map_or(0, |m| m.triangle_count())
            + self.children.iter().map(|c| c.triangle_count()).sum::<usize>()
    }

    /// Flatten into one mesh in this node's space
    fn collect_mesh(&self, out: &mut MeshData) {
        if let Some(mesh) = &self.mesh {
            out.append(mesh);
        }
        for child in &self.children {
            child.collect_mesh(out);
        }
    }
}

/// Inputs that force a rebuild when they change
#[derive(Debug, Clone, PartialEq)]
struct BuildKey {
    kind: ObjectKind,
    shape: ShapeType,
    profile: Option<ExtrusionProfile>,
    payload: Option<SourcePayload>,
}

impl BuildKey {
    fn of(obj: &SceneObject) -> Self {
        Self {
            kind: obj.kind,
            shape: obj.shape_type,
            profile: obj.extrusion_profile.clone(),
            payload: obj.source_payload.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MirrorSource {
    revision: u64,
    children: usize,
    axis: Axis,
}

/// One drawable entry
#[derive(Debug)]
pub struct Renderable {
    pub key: String,
    pub root: RenderNode,
    pub position: Vec3,
    /// Euler XYZ, radians
    pub rotation: Vec3,
    pub scale: Vec3,
    /// Final display color
    pub color: [f32; 3],
    pub wireframe: bool,
    /// Model's own material color, blended toward the object color
    base_color: Option<[f32; 3]>,
    build_key: BuildKey,
    /// Bumped whenever the content tree changes
    revision: u64,
    pending: Option<oneshot::Receiver<LoadResult>>,
    mirror: Option<MirrorSource>,
}

impl Renderable {
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale,
            Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z),
            self.position,
        )
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Waiting on an async load
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_mirror(&self) -> bool {
        self.mirror.is_some()
    }

    pub fn object_id(&self) -> Option<&str> {
        self.root.object_id.as_deref()
    }

    pub fn triangle_count(&self) -> usize {
        self.root.triangle_count()
    }

    /// Whole content tree as one mesh in renderable-local space
    pub fn local_mesh(&self) -> MeshData {
        let mut mesh = MeshData::new();
        self.root.collect_mesh(&mut mesh);
        mesh
    }

    /// Whole content tree as one world-space mesh
    pub fn world_mesh(&self) -> MeshData {
        let mut mesh = MeshData::new();
        self.root.collect_mesh(&mut mesh);
        let m = self.world_matrix();
        mesh.transform(m);
        if m.determinant() < 0.0 {
            for tri in mesh.indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
        }
        mesh
    }

    fn sync_from(&mut self, obj: &SceneObject, import: &ImportSettings) {
        let t = &obj.transform;
        self.position = to_vec3(t.position);
        self.rotation = to_vec3(t.rotation);
        self.scale = to_vec3(t.scale);
        self.wireframe = obj.appearance.wireframe;
        let color = obj.appearance.color.to_rgb_f32();
        self.color = match self.base_color {
            Some(base) => blend_rgb(base, color, import.color_blend),
            None => color,
        };
    }
}

fn to_vec3(v: [f64; 3]) -> Vec3 {
    Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32)
}

/// What one reconciliation pass did, by renderable key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub created: Vec<String>,
    pub rebuilt: Vec<String>,
    /// Released; the host should free their GPU buffers
    pub removed: Vec<String>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.rebuilt.is_empty() && self.removed.is_empty()
    }
}

/// Result of a viewport pick
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    pub object_id: ObjectId,
    pub point: Vec3,
    pub distance: f32,
}

/// Viewport-owned arena of renderables keyed by object id (and mirror key)
#[derive(Debug, Default)]
pub struct RenderableCache {
    entries: BTreeMap<String, Renderable>,
}

impl RenderableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Renderable> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Renderable> {
        self.entries.values()
    }

    /// Bring the cache in line with `snapshot`
    pub fn reconcile(
        &mut self,
        snapshot: &SceneSnapshot,
        loader: &dyn MeshLoader,
        import: &ImportSettings,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for obj in snapshot {
            let key = BuildKey::of(obj);
            let cached = self
                .entries
                .get(&obj.id)
                .map(|r| (r.build_key == key, r.revision));
            match cached {
                Some((true, _)) => {
                    if let Some(existing) = self.entries.get_mut(&obj.id) {
                        existing.sync_from(obj, import);
                    }
                }
                Some((false, revision)) => {
                    let mut fresh = build_renderable(obj, key, loader, import);
                    fresh.revision = revision + 1;
                    self.entries.insert(obj.id.clone(), fresh);
                    report.rebuilt.push(obj.id.clone());
                }
                None => {
                    let fresh = build_renderable(obj, key, loader, import);
                    self.entries.insert(obj.id.clone(), fresh);
                    report.created.push(obj.id.clone());
                }
            }
        }

        self.sync_mirrors(snapshot, &mut report);

        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(k, r)| {
                let owner = r.object_id().unwrap_or(k.as_str());
                let wanted = if r.is_mirror() {
                    snapshot.get(owner).and_then(|o| o.active_mirror()).is_some()
                } else {
                    snapshot.contains(k)
                };
                !wanted
            })
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            // dropping the renderable drops any pending load receiver
            self.entries.remove(&key);
            report.removed.push(key);
        }

        if !report.is_empty() {
            debug!(
                created = report.created.len(),
                rebuilt = report.rebuilt.len(),
                removed = report.removed.len(),
                "reconciled renderables"
            );
        }
        report
    }

    /// Create, refresh or re-clone mirror renderables for mirrored objects
    fn sync_mirrors(&mut self, snapshot: &SceneSnapshot, report: &mut ReconcileReport) {
        for obj in snapshot {
            let Some(modifier) = obj.active_mirror() else {
                continue;
            };
            let Some(primary) = self.entries.get(&obj.id) else {
                continue;
            };
            let source = MirrorSource {
                revision: primary.revision,
                children: primary.root.children.len(),
                axis: modifier.axis,
            };
            let key = mirror_key(&obj.id);

            let mut scale = primary.scale;
            scale[modifier.axis.index()] = -scale[modifier.axis.index()];

            let current = self.entries.get(&key).map(|m| m.mirror == Some(source));
            if current == Some(true) {
                let (position, rotation, color, wireframe) =
                    (primary.position, primary.rotation, primary.color, primary.wireframe);
                if let Some(mirror) = self.entries.get_mut(&key) {
                    mirror.position = position;
                    mirror.rotation = rotation;
                    mirror.scale = scale;
                    mirror.color = color;
                    mirror.wireframe = wireframe;
                }
                continue;
            }

            let clone = Renderable {
                key: key.clone(),
                root: primary.root.clone(),
                position: primary.position,
                rotation: primary.rotation,
                scale,
                color: primary.color,
                wireframe: primary.wireframe,
                base_color: primary.base_color,
                build_key: primary.build_key.clone(),
                revision: primary.revision,
                pending: None,
                mirror: Some(source),
            };
            self.entries.insert(key.clone(), clone);
            match current {
                Some(_) => report.rebuilt.push(key),
                None => report.created.push(key),
            }
        }
    }

    /// Drain finished loads into their renderables. Returns populated keys.
    pub fn poll_loads(&mut self, snapshot: &SceneSnapshot, import: &ImportSettings) -> Vec<String> {
        let mut populated = Vec::new();
        for (key, renderable) in self.entries.iter_mut() {
            let Some(receiver) = renderable.pending.as_mut() else {
                continue;
            };
            match receiver.try_recv() {
                Ok(Ok(mut mesh)) => {
                    normalize_size(&mut mesh, import.max_dimension);
                    renderable.root.children.push(RenderNode::leaf(mesh));
                    renderable.revision += 1;
                    renderable.pending = None;
                    populated.push(key.clone());
                }
                Ok(Err(e)) => {
                    warn!(key = short_id(key), "model load failed: {e}");
                    renderable.pending = None;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => {
                    warn!(key = short_id(key), "model loader went away");
                    renderable.pending = None;
                }
            }
        }
        if !populated.is_empty() {
            let mut report = ReconcileReport::default();
            self.sync_mirrors(snapshot, &mut report);
        }
        populated
    }

    /// Move a renderable (and its mirror) without touching the scene
    pub fn set_position(&mut self, id: &str, position: Vec3) {
        for key in [id.to_string(), mirror_key(id)] {
            if let Some(r) = self.entries.get_mut(&key) {
                r.position = position;
            }
        }
    }

    /// Nearest renderable hit by `ray`, resolved to its owning object
    pub fn pick(&self, ray: &Ray) -> Option<PickHit> {
        self.entries
            .values()
            .filter_map(|r| {
                let inv = r.world_matrix().inverse();
                let local = Ray {
                    origin: inv.transform_point3(ray.origin),
                    direction: inv.transform_vector3(ray.direction),
                };
                let (t, owner) = r.root.pick(&local, None)?;
                Some((t, owner?))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, owner)| PickHit {
                object_id: owner.to_string(),
                point: ray.at(t),
                distance: t,
            })
    }
}

fn build_renderable(
    obj: &SceneObject,
    build_key: BuildKey,
    loader: &dyn MeshLoader,
    import: &ImportSettings,
) -> Renderable {
    let mut root = RenderNode::tagged(&obj.id);
    let mut pending = None;
    let mut base_color = None;

    if obj.kind.is_generated() {
        if let Some(mesh) = build_object_mesh(obj) {
            root.children.push(RenderNode::leaf(mesh));
        }
    } else {
        base_color = Some([1.0; 3]);
        match &obj.source_payload {
            Some(SourcePayload::Inline { document }) => match MeshData::from_document(document) {
                Ok(mut mesh) => {
                    if obj.kind == ObjectKind::ImportedModel {
                        normalize_size(&mut mesh, import.max_dimension);
                    }
                    root.children.push(RenderNode::leaf(mesh));
                }
                Err(e) => warn!(id = short_id(&obj.id), "inline mesh rejected: {e}"),
            },
            Some(SourcePayload::Reference { url, format }) => {
                let (ticket, receiver) = LoadTicket::channel();
                loader.start(
                    LoadRequest {
                        key: obj.id.clone(),
                        url: url.clone(),
                        format: *format,
                    },
                    ticket,
                );
                pending = Some(receiver);
            }
            None => warn!(id = short_id(&obj.id), "object has no geometry source"),
        }
    }

    let mut renderable = Renderable {
        key: obj.id.clone(),
        root,
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
        color: [1.0; 3],
        wireframe: false,
        base_color,
        build_key,
        revision: 0,
        pending,
        mirror: None,
    };
    renderable.sync_from(obj, import);
    renderable
}

/// Shrink `mesh` uniformly so its largest extent is at most `max_dimension`
pub fn normalize_size(mesh: &mut MeshData, max_dimension: f32) {
    let Some(aabb) = mesh.aabb() else {
        return;
    };
    let largest = aabb.max_dimension();
    if largest > max_dimension && largest > 0.0 {
        mesh.transform(Mat4::from_scale(Vec3::splat(max_dimension / largest)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::viewport::loader::QueuedLoader;
    use shared::{Color, MirrorModifier, ModelFormat};

    fn reconcile(cache: &mut RenderableCache, objects: Vec<SceneObject>) -> ReconcileReport {
        let loader = QueuedLoader::new();
        cache.reconcile(&SceneSnapshot::new(objects), &loader, &ImportSettings::default())
    }

    #[test]
    fn test_reuse_when_build_key_unchanged() {
        let mut cache = RenderableCache::new();
        let mut cube = fixtures::primitive("a", ShapeType::Cube);
        let report = reconcile(&mut cache, vec![cube.clone()]);
        assert_eq!(report.created, ["a"]);

        cube.transform.position = [1.0, 2.0, 3.0];
        cube.appearance.color = Color([255, 0, 0]);
        let report = reconcile(&mut cache, vec![cube.clone()]);
        assert!(report.is_empty());
        let r = cache.get("a").unwrap();
        assert_eq!(r.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(r.color, [1.0, 0.0, 0.0]);
        assert_eq!(r.revision(), 0);
    }

    #[test]
    fn test_rebuild_on_profile_change() {
        let mut cache = RenderableCache::new();
        let mut star = fixtures::extruded("s", ShapeType::Star);
        reconcile(&mut cache, vec![star.clone()]);
        if let Some(p) = star.extrusion_profile.as_mut() {
            p.depth = 2.0;
        }
        let report = reconcile(&mut cache, vec![star]);
        assert_eq!(report.rebuilt, ["s"]);
        assert_eq!(cache.get("s").unwrap().revision(), 1);
    }

    #[test]
    fn test_stale_removed() {
        let mut cache = RenderableCache::new();
        reconcile(
            &mut cache,
            vec![
                fixtures::primitive("a", ShapeType::Cube),
                fixtures::primitive("b", ShapeType::Sphere),
            ],
        );
        let report = reconcile(&mut cache, vec![fixtures::primitive("b", ShapeType::Sphere)]);
        assert_eq!(report.removed, ["a"]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_mirror_lifecycle() {
        let mut cache = RenderableCache::new();
        let mut obj = fixtures::primitive("m", ShapeType::Cone);
        obj.transform.position = [1.0, 0.5, 0.0];
        obj.transform.scale = [1.0, 2.0, 3.0];
        obj.mirror = Some(MirrorModifier {
            enabled: true,
            axis: Axis::Y,
        });
        let report = reconcile(&mut cache, vec![obj.clone()]);
        assert!(report.created.contains(&"m_mirror".to_string()));

        let mirror = cache.get("m_mirror").unwrap();
        assert_eq!(mirror.position, Vec3::new(1.0, 0.5, 0.0));
        assert_eq!(mirror.scale, Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(mirror.object_id(), Some("m"));

        obj.mirror = Some(MirrorModifier {
            enabled: false,
            axis: Axis::Y,
        });
        let report = reconcile(&mut cache, vec![obj]);
        assert_eq!(report.removed, ["m_mirror"]);
        assert!(cache.get("m_mirror").is_none());
    }

    #[test]
    fn test_imported_color_blends() {
        let mut cache = RenderableCache::new();
        let mut obj = fixtures::raw_mesh_object("d", fixtures::unit_cube_document());
        obj.appearance.color = Color([0, 0, 0]);
        reconcile(&mut cache, vec![obj]);
        assert_eq!(cache.get("d").unwrap().color, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_reference_loads_and_normalizes() {
        let mut cache = RenderableCache::new();
        let loader = QueuedLoader::new();
        let obj = fixtures::imported_reference("i", "big.obj", ModelFormat::Obj);
        let snapshot = SceneSnapshot::new(vec![obj]);
        let import = ImportSettings::default();
        cache.reconcile(&snapshot, &loader, &import);
        assert!(cache.get("i").unwrap().is_loading());
        assert_eq!(cache.get("i").unwrap().triangle_count(), 0);

        let obj_text = b"v 0 0 0\nv 10 0 0\nv 0 4 0\nf 1 2 3\n";
        assert_eq!(loader.deliver_bytes("i", obj_text), 1);
        assert_eq!(cache.poll_loads(&snapshot, &import), ["i"]);

        let r = cache.get("i").unwrap();
        assert!(!r.is_loading());
        let mut mesh = MeshData::new();
        r.root.collect_mesh(&mut mesh);
        assert!((mesh.aabb().unwrap().max_dimension() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_delete_cancels_pending_load() {
        let mut cache = RenderableCache::new();
        let loader = QueuedLoader::new();
        let import = ImportSettings::default();
        let obj = fixtures::imported_reference("i", "a.glb", ModelFormat::Glb);
        cache.reconcile(&SceneSnapshot::new(vec![obj]), &loader, &import);
        assert_eq!(loader.pending_requests().len(), 1);

        let empty = SceneSnapshot::default();
        cache.reconcile(&empty, &loader, &import);
        assert!(loader.pending_requests().is_empty());
        assert_eq!(loader.complete("i", Ok(MeshData::new())), 0);
        assert!(cache.poll_loads(&empty, &import).is_empty());
    }

    #[test]
    fn test_pick_resolves_owner() {
        let mut cache = RenderableCache::new();
        let mut near = fixtures::primitive("near", ShapeType::Cube);
        near.transform.position = [0.0, 0.0, 2.0];
        let far = fixtures::primitive("far", ShapeType::Cube);
        reconcile(&mut cache, vec![near, far]);

        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 10.0),
            direction: Vec3::NEG_Z,
        };
        let hit = cache.pick(&ray).unwrap();
        assert_eq!(hit.object_id, "near");
        assert!((hit.point.z - 2.5).abs() < 1e-4);

        let miss = Ray {
            origin: Vec3::new(5.0, 5.0, 10.0),
            direction: Vec3::NEG_Z,
        };
        assert!(cache.pick(&miss).is_none());
    }
}
