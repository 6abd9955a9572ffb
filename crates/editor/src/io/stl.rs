//! STL reader, binary and ASCII

use glam::Vec3;
use shared::ModelFormat;

use super::ImportError;
use crate::viewport::mesh::MeshData;

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

pub fn parse_stl(bytes: &[u8]) -> Result<MeshData, ImportError> {
    if is_binary(bytes) {
        parse_binary(bytes)
    } else {
        parse_ascii(bytes)
    }
}

/// Binary files declare a triangle count that must match the file size.
/// Some binary exporters also start the header with "solid", so size wins.
fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_LEN + 4 {
        return false;
    }
    let count = read_u32(bytes, HEADER_LEN) as usize;
    count
        .checked_mul(TRIANGLE_LEN)
        .and_then(|body| body.checked_add(HEADER_LEN + 4))
        .is_some_and(|expected| expected == bytes.len())
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_vec3(bytes: &[u8], at: usize) -> Vec3 {
    let f = |o: usize| f32::from_bits(read_u32(bytes, at + o));
    Vec3::new(f(0), f(4), f(8))
}

fn parse_binary(bytes: &[u8]) -> Result<MeshData, ImportError> {
    let mut mesh = MeshData::new();
    for record in bytes[HEADER_LEN + 4..].chunks_exact(TRIANGLE_LEN) {
        // skip the stored facet normal; recomputed from winding
        mesh.push_flat_triangle(read_vec3(record, 12), read_vec3(record, 24), read_vec3(record, 36));
    }
    Ok(mesh)
}

fn parse_ascii(bytes: &[u8]) -> Result<MeshData, ImportError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| ImportError::parse(ModelFormat::Stl, "neither binary nor ASCII STL"))?;
    if !text.trim_start().starts_with("solid") {
        return Err(ImportError::parse(ModelFormat::Stl, "missing 'solid' header"));
    }

    let mut mesh = MeshData::new();
    let mut corners: Vec<Vec3> = Vec::with_capacity(3);
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("vertex") {
            continue;
        }
        let c: Vec<f32> = parts.filter_map(|p| p.parse().ok()).collect();
        if c.len() != 3 {
            return Err(ImportError::parse(ModelFormat::Stl, format!("bad vertex: {line}")));
        }
        corners.push(Vec3::new(c[0], c[1], c[2]));
        if corners.len() == 3 {
            mesh.push_flat_triangle(corners[0], corners[1], corners[2]);
            corners.clear();
        }
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_triangle() -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[..5].copy_from_slice(b"solid");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        let floats = [
            0.0f32, 0.0, 1.0, // normal
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0,
        ];
        for f in floats {
            bytes.extend_from_slice(&f.to_le_bytes());
        }
        bytes.extend_from_slice(&[0, 0]);
        bytes
    }

    #[test]
    fn test_binary_with_solid_header() {
        let mesh = parse_stl(&binary_triangle()).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.position(1), Vec3::X);
    }

    #[test]
    fn test_ascii() {
        let src = "solid t\n facet normal 0 0 1\n  outer loop\n   vertex 0 0 0\n   vertex 1 0 0\n   vertex 0 1 0\n  endloop\n endfacet\nendsolid t\n";
        let mesh = parse_stl(src.as_bytes()).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert!((mesh.normal(0) - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse_stl(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn test_oversized_triangle_count_not_binary() {
        let mut bytes = binary_triangle();
        bytes[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(!is_binary(&bytes));
        assert!(parse_stl(&bytes).is_err());
    }

    #[test]
    fn test_truncated_binary_rejected() {
        let bytes = binary_triangle();
        assert!(parse_stl(&bytes[..bytes.len() - 10]).is_err());
    }
}
