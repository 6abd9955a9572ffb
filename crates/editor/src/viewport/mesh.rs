use glam::{Mat4, Vec3};
use shared::MeshDocument;

use super::picking::Aabb;
use crate::io::ImportError;

/// Floats per vertex: position(3) + normal(3)
pub const STRIDE: usize = 6;

/// CPU-side triangle mesh: interleaved [pos.x, pos.y, pos.z, norm.x, norm.y, norm.z]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn position(&self, i: usize) -> Vec3 {
        let base = i * STRIDE;
        Vec3::new(
            self.vertices[base],
            self.vertices[base + 1],
            self.vertices[base + 2],
        )
    }

    pub fn normal(&self, i: usize) -> Vec3 {
        let base = i * STRIDE;
        Vec3::new(
            self.vertices[base + 3],
            self.vertices[base + 4],
            self.vertices[base + 5],
        )
    }

    /// Append a vertex and return its index
    pub fn push_vertex(&mut self, p: Vec3, n: Vec3) -> u32 {
        let idx = self.vertex_count() as u32;
        self.vertices.extend_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z]);
        idx
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Append a triangle with its own three vertices and a face normal.
    /// Zero-area triangles are dropped.
    pub fn push_flat_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        let n = (b - a).cross(c - a);
        if n.length_squared() <= f32::EPSILON * f32::EPSILON {
            return;
        }
        let n = n.normalize();
        let i0 = self.push_vertex(a, n);
        let i1 = self.push_vertex(b, n);
        let i2 = self.push_vertex(c, n);
        self.push_triangle(i0, i1, i2);
    }

    /// Triangle corner positions
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |t| {
            [
                self.position(t[0] as usize),
                self.position(t[1] as usize),
                self.position(t[2] as usize),
            ]
        })
    }

    pub fn aabb(&self) -> Option<Aabb> {
        Aabb::from_points((0..self.vertex_count()).map(|i| self.position(i)))
    }

    pub fn translate(&mut self, offset: Vec3) {
        for v in self.vertices.chunks_exact_mut(STRIDE) {
            v[0] += offset.x;
            v[1] += offset.y;
            v[2] += offset.z;
        }
    }

    /// Apply an affine transform to positions and normals
    pub fn transform(&mut self, m: Mat4) {
        let normal_m = m.inverse().transpose();
        for v in self.vertices.chunks_exact_mut(STRIDE) {
            let p = m.transform_point3(Vec3::new(v[0], v[1], v[2]));
            let n = normal_m
                .transform_vector3(Vec3::new(v[3], v[4], v[5]))
                .normalize_or_zero();
            v.copy_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z]);
        }
    }

    /// Append another mesh, re-basing its indices
    pub fn append(&mut self, other: &MeshData) {
        let base = self.vertex_count() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Serialize into a self-contained mesh document
    pub fn to_document(&self) -> MeshDocument {
        let count = self.vertex_count();
        let mut positions = Vec::with_capacity(count * 3);
        let mut normals = Vec::with_capacity(count * 3);
        for v in self.vertices.chunks_exact(STRIDE) {
            positions.extend_from_slice(&v[0..3]);
            normals.extend_from_slice(&v[3..6]);
        }
        MeshDocument {
            version: 1,
            positions,
            indices: self.indices.clone(),
            normals,
        }
    }

    /// Rebuild a mesh from a document, computing smooth normals when absent
    pub fn from_document(doc: &MeshDocument) -> Result<Self, ImportError> {
        if doc.positions.len() % 3 != 0 {
            return Err(ImportError::InvalidMesh(format!(
                "position array length {} is not a multiple of 3",
                doc.positions.len()
            )));
        }
        let count = doc.vertex_count();
        let indices: Vec<u32> = if doc.indices.is_empty() {
            (0..count as u32).collect()
        } else {
            doc.indices.clone()
        };
        if indices.len() % 3 != 0 {
            return Err(ImportError::InvalidMesh(format!(
                "index array length {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= count) {
            return Err(ImportError::InvalidMesh(format!(
                "index {bad} out of range for {count} vertices"
            )));
        }

        let normals = if doc.normals.len() == doc.positions.len() {
            doc.normals.clone()
        } else {
            smooth_normals(&doc.positions, &indices)
        };

        let mut vertices = Vec::with_capacity(count * STRIDE);
        for i in 0..count {
            vertices.extend_from_slice(&doc.positions[i * 3..i * 3 + 3]);
            vertices.extend_from_slice(&normals[i * 3..i * 3 + 3]);
        }
        Ok(Self { vertices, indices })
    }
}

/// Area-weighted vertex normals for an indexed position list
pub fn smooth_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let count = positions.len() / 3;
    let at = |i: u32| {
        let b = i as usize * 3;
        Vec3::new(positions[b], positions[b + 1], positions[b + 2])
    };
    let mut acc = vec![Vec3::ZERO; count];
    for t in indices.chunks_exact(3) {
        let n = (at(t[1]) - at(t[0])).cross(at(t[2]) - at(t[0]));
        for &i in t {
            acc[i as usize] += n;
        }
    }
    acc.into_iter()
        .flat_map(|n| {
            let n = n.normalize_or_zero();
            [n.x, n.y, n.z]
        })
        .collect()
}
