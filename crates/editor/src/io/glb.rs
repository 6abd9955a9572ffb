//! glTF 2.0: binary (GLB) export, GLB and embedded-buffer glTF import

use std::collections::HashSet;

use glam::Mat4;
use gltf::mesh::Mode;
use gltf::Semantic;
use shared::{MeshDocument, ModelFormat};

use super::ImportError;
use crate::viewport::mesh::MeshData;

/// GLB magic number: "glTF"
const GLB_MAGIC: u32 = 0x46546C67;
const GLB_VERSION: u32 = 2;
const CHUNK_TYPE_JSON: u32 = 0x4E4F534A;
const CHUNK_TYPE_BIN: u32 = 0x004E4942;

/// glTF component types
const UNSIGNED_INT: u32 = 5125;
const FLOAT: u32 = 5126;

/// glTF buffer view targets
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// One world-space mesh to export with its display color
#[derive(Debug, Clone)]
pub struct ExportMesh {
    pub name: String,
    pub mesh: MeshData,
    pub color: [f32; 3],
}

/// Build a GLB file with one node, mesh and material per entry.
/// Empty meshes are skipped; if nothing remains the result is empty.
pub fn build_glb(meshes: &[ExportMesh]) -> Vec<u8> {
    let mut bin: Vec<u8> = Vec::new();
    let mut accessors = Vec::new();
    let mut buffer_views = Vec::new();
    let mut gltf_meshes = Vec::new();
    let mut materials = Vec::new();
    let mut nodes = Vec::new();

    for entry in meshes.iter().filter(|e| !e.mesh.is_empty()) {
        let doc = entry.mesh.to_document();
        let Some(aabb) = entry.mesh.aabb() else {
            continue;
        };
        let index = nodes.len();
        let view_base = buffer_views.len();

        for (data, target) in [
            (floats_to_bytes(&doc.positions), ARRAY_BUFFER),
            (floats_to_bytes(&doc.normals), ARRAY_BUFFER),
            (u32s_to_bytes(&doc.indices), ELEMENT_ARRAY_BUFFER),
        ] {
            buffer_views.push(serde_json::json!({
                "buffer": 0,
                "byteOffset": bin.len(),
                "byteLength": data.len(),
                "target": target
            }));
            bin.extend_from_slice(&data);
        }

        accessors.push(serde_json::json!({
            "bufferView": view_base,
            "componentType": FLOAT,
            "count": doc.vertex_count(),
            "type": "VEC3",
            "min": aabb.min.to_array(),
            "max": aabb.max.to_array()
        }));
        accessors.push(serde_json::json!({
            "bufferView": view_base + 1,
            "componentType": FLOAT,
            "count": doc.vertex_count(),
            "type": "VEC3"
        }));
        accessors.push(serde_json::json!({
            "bufferView": view_base + 2,
            "componentType": UNSIGNED_INT,
            "count": doc.indices.len(),
            "type": "SCALAR"
        }));

        let [r, g, b] = entry.color;
        materials.push(serde_json::json!({
            "name": entry.name,
            "pbrMetallicRoughness": {
                "baseColorFactor": [r, g, b, 1.0],
                "metallicFactor": 0.1,
                "roughnessFactor": 0.6
            }
        }));
        gltf_meshes.push(serde_json::json!({
            "name": entry.name,
            "primitives": [{
                "attributes": { "POSITION": view_base, "NORMAL": view_base + 1 },
                "indices": view_base + 2,
                "material": index
            }]
        }));
        nodes.push(serde_json::json!({ "name": entry.name, "mesh": index }));
    }

    if nodes.is_empty() {
        return Vec::new();
    }

    let root: Vec<usize> = (0..nodes.len()).collect();
    let gltf_json = serde_json::json!({
        "asset": { "version": "2.0", "generator": "scene-editor" },
        "scene": 0,
        "scenes": [{ "name": "Scene", "nodes": root }],
        "nodes": nodes,
        "meshes": gltf_meshes,
        "materials": materials,
        "accessors": accessors,
        "bufferViews": buffer_views,
        "buffers": [{ "byteLength": bin.len() }]
    });

    let mut json_bytes = gltf_json.to_string().into_bytes();
    // chunks are 4-byte aligned: JSON with spaces, BIN with zeros
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let total = 12 + 8 + json_bytes.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_TYPE_JSON.to_le_bytes());
    glb.extend_from_slice(&json_bytes);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_TYPE_BIN.to_le_bytes());
    glb.extend_from_slice(&bin);
    glb
}

fn floats_to_bytes(data: &[f32]) -> Vec<u8> {
    data.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn u32s_to_bytes(data: &[u32]) -> Vec<u8> {
    data.iter().flat_map(|v| v.to_le_bytes()).collect()
}

// ── Import ────────────────────────────────────────────────────

/// Parse a binary glTF container
pub fn parse_glb(bytes: &[u8]) -> Result<MeshData, ImportError> {
    read_document(ModelFormat::Glb, bytes)
}

/// Parse JSON glTF whose buffers are embedded as base64 data URIs
pub fn parse_gltf(bytes: &[u8]) -> Result<MeshData, ImportError> {
    read_document(ModelFormat::Gltf, bytes)
}

/// Flatten every mesh reachable from the default scene into one mesh.
/// External buffer files are rejected since there is no base path.
fn read_document(format: ModelFormat, bytes: &[u8]) -> Result<MeshData, ImportError> {
    let err = |e: gltf::Error| ImportError::parse(format, e.to_string());
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes).map_err(err)?;
    let buffers = gltf::import_buffers(&document, None, blob).map_err(err)?;
    let reader = MeshReader {
        format,
        buffers: &buffers,
    };

    let mut out = MeshData::new();
    let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) else {
        for mesh in document.meshes() {
            reader.append_mesh(&mesh, Mat4::IDENTITY, &mut out)?;
        }
        return Ok(out);
    };

    // nodes form a tree; a node reached twice is skipped
    let mut visited = HashSet::new();
    let mut stack: Vec<(gltf::Node, Mat4)> = scene.nodes().map(|n| (n, Mat4::IDENTITY)).collect();
    while let Some((node, parent)) = stack.pop() {
        if !visited.insert(node.index()) {
            continue;
        }
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
        if let Some(mesh) = node.mesh() {
            reader.append_mesh(&mesh, world, &mut out)?;
        }
        stack.extend(node.children().map(|c| (c, world)));
    }
    Ok(out)
}

struct MeshReader<'a> {
    format: ModelFormat,
    buffers: &'a [gltf::buffer::Data],
}

impl MeshReader<'_> {
    fn err(&self, reason: impl Into<String>) -> ImportError {
        ImportError::parse(self.format, reason)
    }

    fn append_mesh(&self, mesh: &gltf::Mesh, world: Mat4, out: &mut MeshData) -> Result<(), ImportError> {
        for prim in mesh.primitives().filter(|p| p.mode() == Mode::Triangles) {
            let Some(position) = prim.get(&Semantic::Positions) else {
                continue;
            };
            self.check_bounds(&position)?;
            if let Some(normal) = prim.get(&Semantic::Normals) {
                self.check_bounds(&normal)?;
            }
            if let Some(indices) = prim.indices() {
                self.check_bounds(&indices)?;
            }

            let data = prim.reader(|b| self.buffers.get(b.index()).map(|d| d.0.as_slice()));
            let positions: Vec<f32> = data
                .read_positions()
                .ok_or_else(|| self.err("unreadable POSITION accessor"))?
                .flatten()
                .collect();
            let normals: Vec<f32> = data
                .read_normals()
                .map(|n| n.flatten().collect())
                .unwrap_or_default();
            let indices: Vec<u32> = data
                .read_indices()
                .map(|i| i.into_u32().collect())
                .unwrap_or_default();

            let mut part = MeshData::from_document(&MeshDocument {
                version: 1,
                positions,
                indices,
                normals,
            })?;
            part.transform(world);
            if world.determinant() < 0.0 {
                for tri in part.indices.chunks_exact_mut(3) {
                    tri.swap(1, 2);
                }
            }
            out.append(&part);
        }
        Ok(())
    }

    /// Every element of the accessor lies inside its buffer view and buffer
    fn check_bounds(&self, accessor: &gltf::Accessor) -> Result<(), ImportError> {
        let index = accessor.index();
        let view = accessor
            .view()
            .ok_or_else(|| self.err(format!("accessor {index}: sparse accessors are not supported")))?;
        let buffer_len = self
            .buffers
            .get(view.buffer().index())
            .map(|d| d.0.len())
            .ok_or_else(|| self.err(format!("buffer {} missing", view.buffer().index())))?;

        let size = accessor.size();
        let stride = view.stride().unwrap_or(size);
        let view_end = view.offset().checked_add(view.length());
        let accessor_end = match accessor.count() {
            0 => Some(accessor.offset()),
            n => (n - 1)
                .checked_mul(stride)
                .and_then(|span| span.checked_add(accessor.offset()))
                .and_then(|start| start.checked_add(size)),
        };
        match (view_end, accessor_end) {
            (Some(view_end), Some(end)) if view_end <= buffer_len && end <= view.length() => Ok(()),
            _ => Err(self.err(format!("accessor {index} exceeds its buffer"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{build_mesh, GeometryDescriptor};
    use base64::Engine as _;
    use glam::Vec3;

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    fn cube_export() -> ExportMesh {
        ExportMesh {
            name: "cube".into(),
            mesh: build_mesh(&GeometryDescriptor::unit_cube()),
            color: [1.0, 0.0, 0.0],
        }
    }

    #[test]
    fn test_glb_header_and_alignment() {
        let glb = build_glb(&[cube_export()]);
        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(read_u32(&glb, 4), 2);
        assert_eq!(read_u32(&glb, 8) as usize, glb.len());
        assert_eq!(glb.len() % 4, 0);
    }

    #[test]
    fn test_empty_export() {
        assert!(build_glb(&[]).is_empty());
        let empty = ExportMesh {
            name: "e".into(),
            mesh: MeshData::new(),
            color: [1.0; 3],
        };
        assert!(build_glb(&[empty]).is_empty());
    }

    #[test]
    fn test_exported_glb_reads_back() {
        let source = cube_export();
        let mesh = parse_glb(&build_glb(&[source.clone()])).unwrap();
        assert_eq!(mesh.triangle_count(), source.mesh.triangle_count());
        assert_eq!(mesh.aabb(), source.mesh.aabb());
    }

    fn triangle_gltf(nodes: serde_json::Value, scene_roots: &[usize], accessor_offset: u64) -> Vec<u8> {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let bytes = floats_to_bytes(&positions);
        let uri = format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );
        serde_json::json!({
            "asset": { "version": "2.0" },
            "scenes": [{ "nodes": scene_roots }],
            "nodes": nodes,
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
            "accessors": [{
                "bufferView": 0,
                "byteOffset": accessor_offset,
                "componentType": FLOAT,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [1.0, 1.0, 0.0]
            }],
            "bufferViews": [{ "buffer": 0, "byteLength": bytes.len() }],
            "buffers": [{ "uri": uri, "byteLength": bytes.len() }]
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_gltf_with_embedded_buffer_and_node_transform() {
        let nodes = serde_json::json!([{ "mesh": 0, "translation": [0.0, 0.0, 5.0] }]);
        let mesh = parse_gltf(&triangle_gltf(nodes, &[0], 0)).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.position(1), Vec3::new(1.0, 0.0, 5.0));
    }

    #[test]
    fn test_accessor_offset_overflow_rejected() {
        let nodes = serde_json::json!([{ "mesh": 0 }]);
        let result = parse_gltf(&triangle_gltf(nodes, &[0], u64::MAX));
        assert!(matches!(result, Err(ImportError::Parse { .. })));
    }

    #[test]
    fn test_accessor_past_view_rejected() {
        let nodes = serde_json::json!([{ "mesh": 0 }]);
        let result = parse_gltf(&triangle_gltf(nodes, &[0], 12));
        assert!(matches!(result, Err(ImportError::Parse { .. })));
    }

    #[test]
    fn test_shared_children_visited_once() {
        // every node lists the next one twice; the last node carries the mesh
        let mut nodes: Vec<serde_json::Value> = (0..30)
            .map(|i| serde_json::json!({ "children": [i + 1, i + 1] }))
            .collect();
        nodes.push(serde_json::json!({ "mesh": 0 }));
        let result = parse_gltf(&triangle_gltf(serde_json::Value::Array(nodes), &[0], 0));
        if let Ok(mesh) = result {
            assert_eq!(mesh.triangle_count(), 1);
        }
    }

    #[test]
    fn test_gltf_external_buffer_rejected() {
        let json = r#"{"asset":{"version":"2.0"},"buffers":[{"uri":"model.bin","byteLength":4}]}"#;
        assert!(matches!(
            parse_gltf(json.as_bytes()),
            Err(ImportError::Parse { .. })
        ));
    }

    #[test]
    fn test_bad_magic() {
        assert!(parse_glb(b"notaglbfile!").is_err());
    }

    #[test]
    fn test_truncated_glb_rejected() {
        let glb = build_glb(&[cube_export()]);
        for len in [0, 11, 20, glb.len() / 2, glb.len() - 4] {
            assert!(parse_glb(&glb[..len]).is_err(), "length {len}");
        }
    }
}
