use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod sync;

pub use sync::SyncMessage;

/// Unique identifier of a scene object
pub type ObjectId = String;

/// What produced an object, and therefore how its geometry is materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    /// Parametric solid from the primitive table
    PrimitiveShape,
    /// 2D profile swept along a depth axis
    ExtrudedShape,
    /// Mesh loaded from a file or an inline mesh document
    ImportedModel,
    /// Result of a boolean operation, stored inline
    DerivedSolid,
}

impl ObjectKind {
    /// Whether the geometry factory can materialize this kind
    pub fn is_generated(&self) -> bool {
        matches!(self, ObjectKind::PrimitiveShape | ObjectKind::ExtrudedShape)
    }
}

/// Tag selecting which generator or loader applies to an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeType {
    // ── Primitives ──
    Cube,
    Sphere,
    Cylinder,
    Cone,
    Torus,
    Tetrahedron,
    Octahedron,
    Dodecahedron,
    Icosahedron,

    // ── Extrusion profiles ──
    Rectangle,
    Circle,
    Triangle,
    Hexagon,
    Star,
    Heart,

    // ── Model formats ──
    Gltf,
    Glb,
    Obj,
    Stl,
    /// Inline serialized mesh (boolean results, raw JSON imports)
    RawMesh,

    /// Any tag this build does not know about
    #[serde(other)]
    Unknown,
}

impl ShapeType {
    pub const PRIMITIVES: [ShapeType; 9] = [
        ShapeType::Cube,
        ShapeType::Sphere,
        ShapeType::Cylinder,
        ShapeType::Cone,
        ShapeType::Torus,
        ShapeType::Tetrahedron,
        ShapeType::Octahedron,
        ShapeType::Dodecahedron,
        ShapeType::Icosahedron,
    ];

    pub const PROFILES: [ShapeType; 6] = [
        ShapeType::Rectangle,
        ShapeType::Circle,
        ShapeType::Triangle,
        ShapeType::Hexagon,
        ShapeType::Star,
        ShapeType::Heart,
    ];

    /// Profile shapes are extruded rather than generated as solids
    pub fn is_extrudable(&self) -> bool {
        Self::PROFILES.contains(self)
    }

    /// Object kind a freshly added object of this shape gets
    pub fn default_kind(&self) -> ObjectKind {
        match self {
            s if s.is_extrudable() => ObjectKind::ExtrudedShape,
            ShapeType::Gltf | ShapeType::Glb | ShapeType::Obj | ShapeType::Stl => {
                ObjectKind::ImportedModel
            }
            ShapeType::RawMesh => ObjectKind::ImportedModel,
            _ => ObjectKind::PrimitiveShape,
        }
    }

    /// Human-readable name used in history labels and the object list
    pub fn label(&self) -> &'static str {
        match self {
            ShapeType::Cube => "Cube",
            ShapeType::Sphere => "Sphere",
            ShapeType::Cylinder => "Cylinder",
            ShapeType::Cone => "Cone",
            ShapeType::Torus => "Torus",
            ShapeType::Tetrahedron => "Tetrahedron",
            ShapeType::Octahedron => "Octahedron",
            ShapeType::Dodecahedron => "Dodecahedron",
            ShapeType::Icosahedron => "Icosahedron",
            ShapeType::Rectangle => "Rectangle",
            ShapeType::Circle => "Circle",
            ShapeType::Triangle => "Triangle",
            ShapeType::Hexagon => "Hexagon",
            ShapeType::Star => "Star",
            ShapeType::Heart => "Heart",
            ShapeType::Gltf => "glTF Model",
            ShapeType::Glb => "GLB Model",
            ShapeType::Obj => "OBJ Model",
            ShapeType::Stl => "STL Model",
            ShapeType::RawMesh => "Mesh",
            ShapeType::Unknown => "Object",
        }
    }
}

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Object transform: position, rotation (radians, XYZ order), scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }

    pub fn at(position: [f64; 3]) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// RGB color, serialized as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const WHITE: Color = Color([0xff, 0xff, 0xff]);

    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Color([channel(0)?, channel(2)?, channel(4)?]))
    }

    /// Linear 0..1 channels
    pub fn to_rgb_f32(&self) -> [f32; 3] {
        [
            self.0[0] as f32 / 255.0,
            self.0[1] as f32 / 255.0,
            self.0[2] as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color '{s}'")))
    }
}

/// Visual appearance of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub color: Color,
    #[serde(default)]
    pub wireframe: bool,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            wireframe: false,
        }
    }
}

/// Extrusion and bevel settings for extruded shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtrusionProfile {
    pub depth: f64,
    pub bevel_enabled: bool,
    pub bevel_thickness: f64,
    pub bevel_size: f64,
    #[serde(deserialize_with = "bevel_segments")]
    pub bevel_segments: u32,
}

impl ExtrusionProfile {
    pub const MAX_BEVEL_SEGMENTS: u32 = 64;

    /// Round and clamp a requested segment count into `1..=MAX_BEVEL_SEGMENTS`
    pub fn clamp_segments(raw: f64) -> u32 {
        if raw.is_nan() {
            return 1;
        }
        raw.round().clamp(1.0, Self::MAX_BEVEL_SEGMENTS as f64) as u32
    }
}

/// Documents and remote scenes may carry any number here
fn bevel_segments<'de, D: serde::Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    f64::deserialize(d).map(ExtrusionProfile::clamp_segments)
}

impl Default for ExtrusionProfile {
    fn default() -> Self {
        Self {
            depth: 0.4,
            bevel_enabled: true,
            bevel_thickness: 0.05,
            bevel_size: 0.05,
            bevel_segments: 3,
        }
    }
}

/// Non-destructive mirror modifier
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MirrorModifier {
    pub enabled: bool,
    pub axis: Axis,
}

/// File formats that can back an imported model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Gltf,
    Glb,
    Obj,
    Stl,
}

impl ModelFormat {
    /// Format for a file extension (case-insensitive, without the dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "gltf" => Some(ModelFormat::Gltf),
            "glb" => Some(ModelFormat::Glb),
            "obj" => Some(ModelFormat::Obj),
            "stl" => Some(ModelFormat::Stl),
            _ => None,
        }
    }

    pub fn shape_type(&self) -> ShapeType {
        match self {
            ModelFormat::Gltf => ShapeType::Gltf,
            ModelFormat::Glb => ShapeType::Glb,
            ModelFormat::Obj => ShapeType::Obj,
            ModelFormat::Stl => ShapeType::Stl,
        }
    }
}

/// Self-contained triangle mesh: flat xyz position triples plus triangle indices
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshDocument {
    #[serde(default = "default_mesh_version")]
    pub version: u32,
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normals: Vec<f32>,
}

fn default_mesh_version() -> u32 {
    1
}

impl MeshDocument {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Where the geometry of an imported or derived object comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourcePayload {
    /// External file, loaded asynchronously
    Reference { url: String, format: ModelFormat },
    /// Mesh stored in the scene document itself
    Inline { document: MeshDocument },
}

/// One placed entity in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub shape_type: ShapeType,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub appearance: Appearance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extrusion_profile: Option<ExtrusionProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror: Option<MirrorModifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_payload: Option<SourcePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl SceneObject {
    /// Name shown in lists: display name if set, otherwise the shape label
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or_else(|| self.shape_type.label())
    }

    /// Mirror modifier if present and enabled
    pub fn active_mirror(&self) -> Option<&MirrorModifier> {
        self.mirror.as_ref().filter(|m| m.enabled)
    }
}

/// Immutable, ordered object list; the unit of history and of cross-tab sync.
///
/// Cloning is cheap and shares storage. Mutation always goes through
/// [`SceneSnapshot::with_objects`], which builds a fresh snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneSnapshot(Arc<Vec<SceneObject>>);

impl SceneSnapshot {
    pub fn new(objects: Vec<SceneObject>) -> Self {
        Self(Arc::new(objects))
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SceneObject> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SceneObject> {
        self.0.iter().find(|o| o.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Build a new snapshot from an edited copy of this one's objects
    pub fn with_objects(&self, edit: impl FnOnce(&mut Vec<SceneObject>)) -> Self {
        let mut objects = self.0.as_ref().clone();
        edit(&mut objects);
        Self::new(objects)
    }

    /// True if both snapshots share the same storage (no copy happened)
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<'a> IntoIterator for &'a SceneSnapshot {
    type Item = &'a SceneObject;
    type IntoIter = std::slice::Iter<'a, SceneObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Labeled point-in-time copy of the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub label: String,
    pub snapshot: SceneSnapshot,
    /// Unix time in milliseconds
    pub timestamp: u64,
}
