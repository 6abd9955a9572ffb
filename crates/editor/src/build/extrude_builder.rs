//! Extruded solids from 2D outlines, with an optional rounded bevel.
//!
//! The outline lies in XY and is swept along +Z. The bevel follows a quarter
//! circle: `bevelThickness` along Z, `bevelSize` outward in the profile plane.

use std::f64::consts::FRAC_PI_2;

use glam::Vec3;
use kurbo::{Point, Vec2};
use shared::ExtrusionProfile;

use super::profiles::edge_normal;
use crate::viewport::mesh::MeshData;

/// Depth below which an extrusion is clamped
pub const MIN_DEPTH: f64 = 0.01;

/// Longest allowed miter, in multiples of the bevel size
const MITER_LIMIT: f64 = 4.0;

/// Extrude a counter-clockwise outline and recenter the volume on its
/// bounding-box centroid.
pub fn extrude(outline: &[Point], profile: &ExtrusionProfile) -> MeshData {
    let mut mesh = MeshData::new();
    let n = outline.len();
    if n < 3 {
        return mesh;
    }

    let depth = profile.depth.max(MIN_DEPTH);
    let miters = miter_vectors(outline);

    let rings: Vec<Vec<Vec3>> = layers(profile, depth)
        .into_iter()
        .map(|(z, offset)| {
            outline
                .iter()
                .zip(&miters)
                .map(|(p, m)| {
                    let q = *p + *m * offset;
                    Vec3::new(q.x as f32, q.y as f32, z as f32)
                })
                .collect()
        })
        .collect();

    for pair in rings.windows(2) {
        let (lo, hi) = (&pair[0], &pair[1]);
        for i in 0..n {
            let j = (i + 1) % n;
            mesh.push_flat_triangle(lo[i], lo[j], hi[j]);
            mesh.push_flat_triangle(lo[i], hi[j], hi[i]);
        }
    }

    let caps = triangulate(outline);
    if let (Some(front), Some(back)) = (rings.first(), rings.last()) {
        for [a, b, c] in caps {
            mesh.push_flat_triangle(back[a], back[b], back[c]);
            mesh.push_flat_triangle(front[a], front[c], front[b]);
        }
    }

    if let Some(aabb) = mesh.aabb() {
        mesh.translate(-aabb.center());
    }
    mesh
}

/// (z, outward offset) for each ring from front to back
fn layers(profile: &ExtrusionProfile, depth: f64) -> Vec<(f64, f64)> {
    if !profile.bevel_enabled {
        return vec![(0.0, 0.0), (depth, 0.0)];
    }

    let thickness = profile.bevel_thickness.max(0.0);
    let size = profile.bevel_size.max(0.0);
    let segments = profile
        .bevel_segments
        .clamp(1, ExtrusionProfile::MAX_BEVEL_SEGMENTS);

    let curve = |i: u32| {
        let t = i as f64 / segments as f64 * FRAC_PI_2;
        (thickness * t.cos(), size * t.sin())
    };

    let mut out = Vec::with_capacity(2 * (segments as usize + 1));
    for i in 0..=segments {
        let (bz, bs) = curve(i);
        out.push((-bz, bs));
    }
    for i in (0..=segments).rev() {
        let (bz, bs) = curve(i);
        out.push((depth + bz, bs));
    }
    out
}

/// Per-vertex offset direction whose projection on both adjacent edge
/// normals is one unit
fn miter_vectors(outline: &[Point]) -> Vec<Vec2> {
    let n = outline.len();
    (0..n)
        .map(|i| {
            let prev = outline[(i + n - 1) % n];
            let cur = outline[i];
            let next = outline[(i + 1) % n];
            let n_in = edge_normal(prev, cur);
            let n_out = edge_normal(cur, next);

            let sum = n_in + n_out;
            if sum.hypot() < 1e-9 {
                return n_out;
            }
            let dir = sum.normalize();
            let cos = dir.dot(n_out).max(1.0 / MITER_LIMIT);
            dir / cos
        })
        .collect()
}

/// Ear-clipping triangulation of a simple counter-clockwise polygon.
/// Returns counter-clockwise index triples.
pub fn triangulate(points: &[Point]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut out = Vec::with_capacity(n - 2);

    while remaining.len() > 3 {
        let m = remaining.len();
        let mut clipped = false;

        for i in 0..m {
            let prev = remaining[(i + m - 1) % m];
            let cur = remaining[i];
            let next = remaining[(i + 1) % m];
            let (a, b, c) = (points[prev], points[cur], points[next]);

            let turn = (b - a).cross(c - b);
            if turn.abs() < 1e-12 {
                // Collinear vertex contributes no area
                remaining.remove(i);
                clipped = true;
                break;
            }
            if turn < 0.0 {
                continue;
            }

            let blocked = remaining
                .iter()
                .filter(|&&j| j != prev && j != cur && j != next)
                .any(|&j| strictly_inside(points[j], a, b, c));
            if blocked {
                continue;
            }

            out.push([prev, cur, next]);
            remaining.remove(i);
            clipped = true;
            break;
        }

        if !clipped {
            // Self-intersecting input: fan whatever is left
            tracing::debug!(vertices = remaining.len(), "ear clipping stalled, falling back to fan");
            for k in 1..remaining.len() - 1 {
                out.push([remaining[0], remaining[k], remaining[k + 1]]);
            }
            return out;
        }
    }

    if remaining.len() == 3 {
        out.push([remaining[0], remaining[1], remaining[2]]);
    }
    out
}

fn strictly_inside(p: Point, a: Point, b: Point, c: Point) -> bool {
    const EPS: f64 = 1e-12;
    (b - a).cross(p - a) > EPS && (c - b).cross(p - b) > EPS && (a - c).cross(p - c) > EPS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::profiles::{outline, signed_area2};
    use crate::validation::MeshValidator;
    use shared::ShapeType;

    fn flat(depth: f64) -> ExtrusionProfile {
        ExtrusionProfile {
            depth,
            bevel_enabled: false,
            ..ExtrusionProfile::default()
        }
    }

    fn triangulated_area(points: &[Point]) -> f64 {
        triangulate(points)
            .iter()
            .map(|t| signed_area2(&[points[t[0]], points[t[1]], points[t[2]]]))
            .sum::<f64>()
    }

    #[test]
    fn test_triangulate_square() {
        let sq = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert_eq!(triangulate(&sq).len(), 2);
        assert!((triangulated_area(&sq) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_triangulate_concave_profiles_preserves_area() {
        for shape in [ShapeType::Star, ShapeType::Heart] {
            let pts = outline(shape).unwrap();
            let tris = triangulate(&pts);
            assert!(!tris.is_empty());
            let expected = signed_area2(&pts);
            assert!(
                (triangulated_area(&pts) - expected).abs() < 1e-6,
                "{shape:?}"
            );
            for t in &tris {
                assert!(signed_area2(&[pts[t[0]], pts[t[1]], pts[t[2]]]) >= 0.0);
            }
        }
    }

    #[test]
    fn test_flat_rectangle_volume() {
        let pts = outline(ShapeType::Rectangle).unwrap();
        let mesh = extrude(&pts, &flat(0.4));
        let v = MeshValidator::new(&mesh);
        assert!(v.validate_all().is_empty());
        assert!((v.signed_volume() - 0.28).abs() < 1e-4);
        assert!(v.assert_dimensions_approx([1.0, 0.7, 0.4], 1e-4));
    }

    #[test]
    fn test_extrusion_is_centered() {
        let pts = outline(ShapeType::Heart).unwrap();
        let mesh = extrude(&pts, &ExtrusionProfile::default());
        let center = mesh.aabb().unwrap().center();
        assert!(center.length() < 1e-5);
    }

    #[test]
    fn test_bevel_grows_footprint() {
        let pts = outline(ShapeType::Hexagon).unwrap();
        let profile = ExtrusionProfile::default();
        let mesh = extrude(&pts, &profile);
        let dims = MeshValidator::new(&mesh).dimensions();
        // depth plus a bevel on each side
        let expected_z = (profile.depth + 2.0 * profile.bevel_thickness) as f32;
        assert!((dims[2] - expected_z).abs() < 1e-4);
        // hexagon width across corners is 1.0, plus the bevel size on each side
        assert!(dims[0] > 1.0 + profile.bevel_size as f32);
    }

    #[test]
    fn test_all_profiles_wind_outward() {
        for shape in ShapeType::PROFILES {
            let pts = outline(shape).unwrap();
            let mesh = extrude(&pts, &ExtrusionProfile::default());
            let v = MeshValidator::new(&mesh);
            assert!(v.validate_all().is_empty(), "{shape:?}");
            assert!(v.signed_volume() > 0.0, "{shape:?}");
        }
    }

    #[test]
    fn test_depth_clamped() {
        let pts = outline(ShapeType::Circle).unwrap();
        let mesh = extrude(&pts, &flat(-3.0));
        let dims = MeshValidator::new(&mesh).dimensions();
        assert!((dims[2] - MIN_DEPTH as f32).abs() < 1e-5);
    }

    #[test]
    fn test_bevel_segments_capped_in_builder() {
        let profile = ExtrusionProfile {
            bevel_segments: u32::MAX,
            ..ExtrusionProfile::default()
        };
        let rings = layers(&profile, profile.depth);
        assert_eq!(rings.len(), 2 * (ExtrusionProfile::MAX_BEVEL_SEGMENTS as usize + 1));
    }
}
