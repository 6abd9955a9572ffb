//! Tessellation of the parametric primitives.
//!
//! Every generator winds triangles counter-clockwise when seen from outside,
//! so `(b - a) x (c - a)` points out of the solid. The CSG engine relies on it.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use crate::viewport::mesh::MeshData;

/// Regular polyhedra available as primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatonicSolid {
    Tetrahedron,
    Octahedron,
    Dodecahedron,
    Icosahedron,
}

pub fn cube(w: f32, h: f32, d: f32) -> MeshData {
    let hw = w * 0.5;
    let hh = h * 0.5;
    let hd = d * 0.5;

    let faces: [([Vec3; 4], Vec3); 6] = [
        // Front (+Z)
        ([Vec3::new(-hw, -hh, hd), Vec3::new(hw, -hh, hd), Vec3::new(hw, hh, hd), Vec3::new(-hw, hh, hd)], Vec3::Z),
        // Back (-Z)
        ([Vec3::new(hw, -hh, -hd), Vec3::new(-hw, -hh, -hd), Vec3::new(-hw, hh, -hd), Vec3::new(hw, hh, -hd)], Vec3::NEG_Z),
        // Right (+X)
        ([Vec3::new(hw, -hh, hd), Vec3::new(hw, -hh, -hd), Vec3::new(hw, hh, -hd), Vec3::new(hw, hh, hd)], Vec3::X),
        // Left (-X)
        ([Vec3::new(-hw, -hh, -hd), Vec3::new(-hw, -hh, hd), Vec3::new(-hw, hh, hd), Vec3::new(-hw, hh, -hd)], Vec3::NEG_X),
        // Top (+Y)
        ([Vec3::new(-hw, hh, hd), Vec3::new(hw, hh, hd), Vec3::new(hw, hh, -hd), Vec3::new(-hw, hh, -hd)], Vec3::Y),
        // Bottom (-Y)
        ([Vec3::new(-hw, -hh, -hd), Vec3::new(hw, -hh, -hd), Vec3::new(hw, -hh, hd), Vec3::new(-hw, -hh, hd)], Vec3::NEG_Y),
    ];

    let mut mesh = MeshData::new();
    for (quad, normal) in &faces {
        let base = mesh.vertex_count() as u32;
        for v in quad {
            mesh.push_vertex(*v, *normal);
        }
        mesh.push_triangle(base, base + 1, base + 2);
        mesh.push_triangle(base, base + 2, base + 3);
    }
    mesh
}

/// Cylinder or truncated cone along Y, centered on the origin.
/// A zero radius at either end collapses that end to an apex.
pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> MeshData {
    let hh = height * 0.5;
    let segments = segments.max(3);
    let mut mesh = MeshData::new();

    let ring = |r: f32, y: f32, a: f32| Vec3::new(r * a.cos(), y, r * a.sin());
    let slope = (radius_bottom - radius_top) / height.max(f32::EPSILON);

    for i in 0..segments {
        let a0 = i as f32 * TAU / segments as f32;
        let a1 = (i + 1) as f32 * TAU / segments as f32;

        let b0 = ring(radius_bottom, -hh, a0);
        let b1 = ring(radius_bottom, -hh, a1);
        let t0 = ring(radius_top, hh, a0);
        let t1 = ring(radius_top, hh, a1);

        let n0 = Vec3::new(a0.cos(), slope, a0.sin()).normalize();
        let n1 = Vec3::new(a1.cos(), slope, a1.sin()).normalize();

        let ib0 = mesh.push_vertex(b0, n0);
        let ib1 = mesh.push_vertex(b1, n1);
        let it0 = mesh.push_vertex(t0, n0);
        let it1 = mesh.push_vertex(t1, n1);

        if radius_top > 0.0 {
            mesh.push_triangle(ib0, it0, it1);
        }
        if radius_bottom > 0.0 {
            mesh.push_triangle(ib0, it1, ib1);
        }
    }

    if radius_top > 0.0 {
        add_cap(&mut mesh, radius_top, hh, segments, true);
    }
    if radius_bottom > 0.0 {
        add_cap(&mut mesh, radius_bottom, -hh, segments, false);
    }

    mesh
}

fn add_cap(mesh: &mut MeshData, radius: f32, y: f32, segments: u32, top: bool) {
    let normal = if top { Vec3::Y } else { Vec3::NEG_Y };
    let center = mesh.push_vertex(Vec3::new(0.0, y, 0.0), normal);

    for i in 0..segments {
        let angle = i as f32 * TAU / segments as f32;
        mesh.push_vertex(Vec3::new(radius * angle.cos(), y, radius * angle.sin()), normal);
    }

    for i in 0..segments {
        let cur = center + 1 + i;
        let next = center + 1 + (i + 1) % segments;
        if top {
            mesh.push_triangle(center, next, cur);
        } else {
            mesh.push_triangle(center, cur, next);
        }
    }
}

pub fn sphere(radius: f32, sectors: u32, rings: u32) -> MeshData {
    let sectors = sectors.max(3);
    let rings = rings.max(2);
    let mut mesh = MeshData::new();

    for r in 0..=rings {
        let phi = PI * r as f32 / rings as f32;
        for s in 0..=sectors {
            let theta = TAU * s as f32 / sectors as f32;
            let n = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            mesh.push_vertex(n * radius, n);
        }
    }

    for r in 0..rings {
        for s in 0..sectors {
            let i0 = r * (sectors + 1) + s;
            let i1 = i0 + 1;
            let i2 = i0 + sectors + 1;
            let i3 = i2 + 1;
            // Rows touching a pole would produce zero-area triangles
            if r != 0 {
                mesh.push_triangle(i0, i1, i2);
            }
            if r != rings - 1 {
                mesh.push_triangle(i1, i3, i2);
            }
        }
    }

    mesh
}

/// Torus in the XY plane
pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> MeshData {
    let radial = radial_segments.max(3);
    let tubular = tubular_segments.max(3);
    let mut mesh = MeshData::new();

    for j in 0..=radial {
        let v = TAU * j as f32 / radial as f32;
        for i in 0..=tubular {
            let u = TAU * i as f32 / tubular as f32;
            let n = Vec3::new(v.cos() * u.cos(), v.cos() * u.sin(), v.sin());
            let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
            mesh.push_vertex(center + n * tube, n);
        }
    }

    for j in 0..radial {
        for i in 0..tubular {
            let a = j * (tubular + 1) + i;
            let b = a + 1;
            let d = a + tubular + 1;
            let c = d + 1;
            mesh.push_triangle(a, b, d);
            mesh.push_triangle(b, c, d);
        }
    }

    mesh
}

pub fn polyhedron(solid: PlatonicSolid, radius: f32) -> MeshData {
    let (vertices, face_normals) = match solid {
        PlatonicSolid::Tetrahedron => {
            let v = tetrahedron_vertices();
            let normals = v.iter().map(|p| -*p).collect();
            (v, normals)
        }
        PlatonicSolid::Octahedron => (octahedron_vertices(), cube_corners()),
        PlatonicSolid::Icosahedron => (icosahedron_vertices(), dodecahedron_vertices()),
        PlatonicSolid::Dodecahedron => (dodecahedron_vertices(), icosahedron_vertices()),
    };

    let vertices: Vec<Vec3> = vertices.into_iter().map(|v| v.normalize() * radius).collect();
    let mut mesh = MeshData::new();

    // Each face of a regular polyhedron is dual to a vertex of its partner: the
    // face is the set of vertices that lie furthest along that direction.
    for n in face_normals {
        let n = n.normalize();
        let reach = vertices
            .iter()
            .map(|v| v.dot(n))
            .fold(f32::MIN, f32::max);
        let mut face: Vec<Vec3> = vertices
            .iter()
            .copied()
            .filter(|v| (v.dot(n) - reach).abs() < radius * 1e-3)
            .collect();
        if face.len() < 3 {
            continue;
        }

        let centroid = face.iter().copied().sum::<Vec3>() / face.len() as f32;
        let u = (face[0] - centroid).normalize();
        let w = n.cross(u);
        face.sort_by(|a, b| {
            let aa = (*a - centroid).dot(w).atan2((*a - centroid).dot(u));
            let ab = (*b - centroid).dot(w).atan2((*b - centroid).dot(u));
            aa.total_cmp(&ab)
        });

        for i in 1..face.len() - 1 {
            mesh.push_flat_triangle(face[0], face[i], face[i + 1]);
        }
    }

    mesh
}

fn tetrahedron_vertices() -> Vec<Vec3> {
    vec![
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
    ]
}

fn octahedron_vertices() -> Vec<Vec3> {
    vec![Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z]
}

fn cube_corners() -> Vec<Vec3> {
    let mut out = Vec::with_capacity(8);
    for x in [-1.0, 1.0] {
        for y in [-1.0, 1.0] {
            for z in [-1.0, 1.0] {
                out.push(Vec3::new(x, y, z));
            }
        }
    }
    out
}

fn icosahedron_vertices() -> Vec<Vec3> {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    vec![
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
}

fn dodecahedron_vertices() -> Vec<Vec3> {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let r = 1.0 / t;
    let mut out = cube_corners();
    for a in [-1.0, 1.0] {
        for b in [-1.0, 1.0] {
            out.push(Vec3::new(0.0, a * r, b * t));
            out.push(Vec3::new(a * r, b * t, 0.0));
            out.push(Vec3::new(a * t, 0.0, b * r));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::MeshValidator;

    fn assert_closed_outward(mesh: &MeshData, expected_volume: f32, tol: f32) {
        let v = MeshValidator::new(mesh);
        let errors = v.validate_all();
        assert!(errors.is_empty(), "validation errors: {errors:?}");
        let vol = v.signed_volume();
        assert!(
            (vol - expected_volume).abs() < tol,
            "volume {vol} expected {expected_volume}"
        );
    }

    #[test]
    fn test_cube_volume() {
        assert_closed_outward(&cube(1.0, 2.0, 3.0), 6.0, 1e-4);
    }

    #[test]
    fn test_cylinder_volume() {
        let expected = PI * 0.25;
        assert_closed_outward(&cylinder(0.5, 0.5, 1.0, 64), expected, 0.01);
    }

    #[test]
    fn test_cone_volume() {
        let expected = PI * 0.25 / 3.0;
        assert_closed_outward(&cylinder(0.0, 0.5, 1.0, 64), expected, 0.01);
    }

    #[test]
    fn test_sphere_volume() {
        let expected = 4.0 / 3.0 * PI * 0.6_f32.powi(3);
        assert_closed_outward(&sphere(0.6, 32, 32), expected, 0.02);
    }

    #[test]
    fn test_torus_volume() {
        let expected = 2.0 * PI * PI * 0.5 * 0.2 * 0.2;
        assert_closed_outward(&torus(0.5, 0.2, 16, 64), expected, 0.02);
    }

    #[test]
    fn test_polyhedra_face_counts() {
        let cases = [
            (PlatonicSolid::Tetrahedron, 4),
            (PlatonicSolid::Octahedron, 8),
            (PlatonicSolid::Icosahedron, 20),
            (PlatonicSolid::Dodecahedron, 36),
        ];
        for (solid, triangles) in cases {
            let mesh = polyhedron(solid, 0.6);
            assert_eq!(mesh.triangle_count(), triangles, "{solid:?}");
            assert!(MeshValidator::new(&mesh).signed_volume() > 0.0, "{solid:?}");
        }
    }

    #[test]
    fn test_polyhedron_radius() {
        let mesh = polyhedron(PlatonicSolid::Icosahedron, 0.6);
        for i in 0..mesh.vertex_count() {
            assert!((mesh.position(i).length() - 0.6).abs() < 1e-4);
        }
    }
}
