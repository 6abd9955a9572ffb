//! Conversion between editor meshes and csgrs solids.

use csgrs::float_types::Real;
use csgrs::mesh::polygon::Polygon;
use csgrs::mesh::vertex::Vertex;
use csgrs::mesh::Mesh;
use csgrs::traits::CSG;
use glam::{DMat4, DQuat, DVec3, EulerRot, Vec3};
use shared::Transform;

use crate::viewport::mesh::MeshData;

/// Triangles below this doubled area are dropped before clipping
const MIN_TWICE_AREA: f64 = 1e-12;

/// Object matrix: scale, then XYZ Euler rotation, then translation
pub fn world_matrix(transform: &Transform) -> DMat4 {
    let [rx, ry, rz] = transform.rotation;
    DMat4::from_scale_rotation_translation(
        DVec3::from_array(transform.scale),
        DQuat::from_euler(EulerRot::XYZ, rx, ry, rz),
        DVec3::from_array(transform.position),
    )
}

fn vertex(p: DVec3, n: DVec3) -> Vertex {
    Vertex::new(
        [p.x as Real, p.y as Real, p.z as Real].into(),
        [n.x as Real, n.y as Real, n.z as Real].into(),
    )
}

/// Closed world-space solid
#[derive(Debug, Clone)]
pub struct Brush {
    solid: Mesh<()>,
}

impl Brush {
    /// Place a local-space mesh in the world. Mirroring transforms reverse
    /// the winding so faces keep pointing outward.
    pub fn from_mesh(mesh: &MeshData, transform: &Transform) -> Self {
        let m = world_matrix(transform);
        let flip = m.determinant() < 0.0;

        let polygons: Vec<Polygon<()>> = mesh
            .triangles()
            .filter_map(|tri| {
                let [a, b, c] = tri.map(|p| m.transform_point3(p.as_dvec3()));
                let (a, c) = if flip { (c, a) } else { (a, c) };
                let normal = (b - a).cross(c - a);
                if !normal.is_finite() || normal.length() < MIN_TWICE_AREA {
                    return None;
                }
                let n = normal.normalize();
                Some(Polygon::new(vec![vertex(a, n), vertex(b, n), vertex(c, n)], None))
            })
            .collect();

        Self {
            solid: Mesh::from_polygons(&polygons, None),
        }
    }

    pub fn polygon_count(&self) -> usize {
        self.solid.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solid.polygons.is_empty()
    }

    pub fn union(&self, other: &Brush) -> Brush {
        Brush {
            solid: self.solid.union(&other.solid),
        }
    }

    pub fn difference(&self, other: &Brush) -> Brush {
        Brush {
            solid: self.solid.difference(&other.solid),
        }
    }

    pub fn intersection(&self, other: &Brush) -> Brush {
        Brush {
            solid: self.solid.intersection(&other.solid),
        }
    }

    /// Fan-triangulate the convex result polygons into a flat-shaded mesh
    pub fn to_mesh(&self) -> MeshData {
        let mut mesh = MeshData::new();
        for poly in &self.solid.polygons {
            let v: Vec<Vec3> = poly
                .vertices
                .iter()
                .map(|v| Vec3::new(v.pos.x as f32, v.pos.y as f32, v.pos.z as f32))
                .collect();
            for i in 1..v.len().saturating_sub(1) {
                mesh.push_flat_triangle(v[0], v[i], v[i + 1]);
            }
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{build_mesh, GeometryDescriptor};
    use crate::validation::MeshValidator;

    fn cube_at(x: f64) -> Brush {
        let mesh = build_mesh(&GeometryDescriptor::unit_cube());
        Brush::from_mesh(&mesh, &Transform::at([x, 0.0, 0.0]))
    }

    fn volume(b: &Brush) -> f32 {
        MeshValidator::new(&b.to_mesh()).signed_volume()
    }

    #[test]
    fn test_from_mesh_places_in_world() {
        let b = cube_at(3.0);
        assert_eq!(b.polygon_count(), 12);
        let aabb = b.to_mesh().aabb().unwrap();
        assert!((aabb.center().x - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_scale_keeps_outward_winding() {
        let mesh = build_mesh(&GeometryDescriptor::unit_cube());
        let mut t = Transform::new();
        t.scale = [-1.0, 1.0, 1.0];
        let b = Brush::from_mesh(&mesh, &t);
        assert!(volume(&b) > 0.99);
    }

    #[test]
    fn test_overlapping_cubes() {
        let a = cube_at(0.0);
        let b = cube_at(0.5);
        assert!((volume(&a.union(&b)) - 1.5).abs() < 1e-3);
        assert!((volume(&a.difference(&b)) - 0.5).abs() < 1e-3);
        assert!((volume(&a.intersection(&b)) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_disjoint_intersection_is_empty() {
        let a = cube_at(-2.0);
        let b = cube_at(2.0);
        assert!(a.intersection(&b).is_empty());
        assert!((volume(&a.union(&b)) - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_rotation_order_xyz() {
        let t = Transform {
            position: [0.0; 3],
            rotation: [std::f64::consts::FRAC_PI_2, 0.0, 0.0],
            scale: [1.0; 3],
        };
        let m = world_matrix(&t);
        let y = m.transform_vector3(DVec3::Y);
        assert!((y - DVec3::Z).length() < 1e-9);
    }
}
