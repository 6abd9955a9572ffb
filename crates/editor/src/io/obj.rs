//! Wavefront OBJ reader (positions and faces only)

use glam::Vec3;
use shared::ModelFormat;

use super::ImportError;
use crate::viewport::mesh::MeshData;

/// Parse OBJ text. Faces are fan-triangulated; `o`/`g` groups are merged.
pub fn parse_obj(bytes: &[u8]) -> Result<MeshData, ImportError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ImportError::parse(ModelFormat::Obj, format!("invalid UTF-8: {e}")))?;

    let mut positions: Vec<Vec3> = Vec::new();
    let mut mesh = MeshData::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                let coords: Vec<f32> = parts.take(3).filter_map(|p| p.parse().ok()).collect();
                if coords.len() != 3 {
                    return Err(ImportError::parse(
                        ModelFormat::Obj,
                        format!("line {}: bad vertex", line_no + 1),
                    ));
                }
                positions.push(Vec3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let corners = parts
                    .map(|p| resolve_index(p, positions.len()))
                    .collect::<Option<Vec<usize>>>()
                    .ok_or_else(|| {
                        ImportError::parse(
                            ModelFormat::Obj,
                            format!("line {}: bad face index", line_no + 1),
                        )
                    })?;
                for i in 1..corners.len().saturating_sub(1) {
                    mesh.push_flat_triangle(
                        positions[corners[0]],
                        positions[corners[i]],
                        positions[corners[i + 1]],
                    );
                }
            }
            _ => {}
        }
    }

    Ok(mesh)
}

/// `v`, `v/vt`, `v//vn` or `v/vt/vn`; 1-based, negative counts from the end
fn resolve_index(token: &str, count: usize) -> Option<usize> {
    let raw: i64 = token.split('/').next()?.parse().ok()?;
    let idx = if raw < 0 { count as i64 + raw } else { raw - 1 };
    (0..count as i64).contains(&idx).then_some(idx as usize)
}
