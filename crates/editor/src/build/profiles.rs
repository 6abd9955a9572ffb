//! Fixed library of 2D outlines for extruded shapes.

use std::f64::consts::{FRAC_PI_2, TAU};

use kurbo::{CubicBez, ParamCurve, Point, Vec2};
use shared::ShapeType;

const CIRCLE_SEGMENTS: usize = 32;
const CURVE_STEPS: usize = 12;
const STAR_POINTS: usize = 5;

/// Closed outline for a profile shape, counter-clockwise, last point not repeated.
/// `None` for shapes that are not profiles.
pub fn outline(shape: ShapeType) -> Option<Vec<Point>> {
    let points = match shape {
        ShapeType::Rectangle => rectangle(1.0, 0.7),
        ShapeType::Circle => regular_polygon(0.5, CIRCLE_SEGMENTS, 0.0),
        ShapeType::Triangle => regular_polygon(0.6, 3, FRAC_PI_2),
        ShapeType::Hexagon => regular_polygon(0.5, 6, 0.0),
        ShapeType::Star => star(0.5, 0.2, STAR_POINTS),
        ShapeType::Heart => heart(),
        _ => return None,
    };
    Some(normalize(points))
}

fn rectangle(w: f64, h: f64) -> Vec<Point> {
    let (hw, hh) = (w / 2.0, h / 2.0);
    vec![
        Point::new(-hw, -hh),
        Point::new(hw, -hh),
        Point::new(hw, hh),
        Point::new(-hw, hh),
    ]
}

fn regular_polygon(radius: f64, sides: usize, start: f64) -> Vec<Point> {
    (0..sides)
        .map(|i| {
            let a = start + TAU * i as f64 / sides as f64;
            Point::new(radius * a.cos(), radius * a.sin())
        })
        .collect()
}

/// Alternating outer and inner vertices, starting at the top
fn star(outer: f64, inner: f64, points: usize) -> Vec<Point> {
    (0..points * 2)
        .map(|i| {
            let r = if i % 2 == 0 { outer } else { inner };
            let a = FRAC_PI_2 + TAU * i as f64 / (points * 2) as f64;
            Point::new(r * a.cos(), r * a.sin())
        })
        .collect()
}

/// Classic six-segment Bézier heart, scaled down and flipped so the tip points down
fn heart() -> Vec<Point> {
    let p = |x: f64, y: f64| Point::new(x * 0.05, -y * 0.05);
    let segments = [
        CubicBez::new(p(5.0, 5.0), p(5.0, 5.0), p(4.0, 0.0), p(0.0, 0.0)),
        CubicBez::new(p(0.0, 0.0), p(-6.0, 0.0), p(-6.0, 7.0), p(-6.0, 7.0)),
        CubicBez::new(p(-6.0, 7.0), p(-6.0, 11.0), p(-3.0, 15.4), p(5.0, 19.0)),
        CubicBez::new(p(5.0, 19.0), p(12.0, 15.4), p(16.0, 11.0), p(16.0, 7.0)),
        CubicBez::new(p(16.0, 7.0), p(16.0, 7.0), p(16.0, 0.0), p(10.0, 0.0)),
        CubicBez::new(p(10.0, 0.0), p(7.0, 0.0), p(5.0, 5.0), p(5.0, 5.0)),
    ];

    let mut points = Vec::with_capacity(segments.len() * CURVE_STEPS);
    for seg in &segments {
        // Each segment's end point is the next one's start
        for i in 0..CURVE_STEPS {
            points.push(seg.eval(i as f64 / CURVE_STEPS as f64));
        }
    }
    points
}

/// Twice the signed area; positive for counter-clockwise
pub fn signed_area2(points: &[Point]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// Drop duplicate consecutive points, wind counter-clockwise, center on the bounding box
fn normalize(mut points: Vec<Point>) -> Vec<Point> {
    points.dedup_by(|a, b| a.distance(*b) < 1e-9);
    while points.len() > 1 && points[0].distance(points[points.len() - 1]) < 1e-9 {
        points.pop();
    }
    if signed_area2(&points) < 0.0 {
        points.reverse();
    }

    let (min, max) = points.iter().fold(
        (Point::new(f64::MAX, f64::MAX), Point::new(f64::MIN, f64::MIN)),
        |(lo, hi), p| {
            (
                Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        },
    );
    let center = min.midpoint(max).to_vec2();
    points.into_iter().map(|p| p - center).collect()
}

/// Outward normal of the edge a→b on a counter-clockwise outline
pub fn edge_normal(a: Point, b: Point) -> Vec2 {
    let d = b - a;
    let len = d.hypot();
    if len < 1e-12 {
        return Vec2::ZERO;
    }
    Vec2::new(d.y / len, -d.x / len)
}
