//! Small shared helpers for input coercion and display.

use shared::Color;

/// Colors assigned to newly added objects
pub const PALETTE: [Color; 8] = [
    Color([0xff, 0x6b, 0x6b]),
    Color([0x4e, 0xcd, 0xc4]),
    Color([0x45, 0xb7, 0xd1]),
    Color([0x96, 0xce, 0xb4]),
    Color([0xff, 0xea, 0xa7]),
    Color([0xdd, 0xa0, 0xdd]),
    Color([0x98, 0xd8, 0xc8]),
    Color([0xf7, 0xdc, 0x6f]),
];

/// Parse a real number from free-form text input.
/// Anything unparsable or non-finite becomes 0.
pub fn parse_real(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// First 8 characters of an id, for logs and listings
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Linear blend between two colors, `t` in 0..=1
pub fn blend_rgb(from: [f32; 3], to: [f32; 3], t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        from[0] + (to[0] - from[0]) * t,
        from[1] + (to[1] - from[1]) * t,
        from[2] + (to[2] - from[2]) * t,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_real() {
        assert_eq!(parse_real("1.5"), 1.5);
        assert_eq!(parse_real("  -2 "), -2.0);
        assert_eq!(parse_real("not-a-number"), 0.0);
        assert_eq!(parse_real(""), 0.0);
        assert_eq!(parse_real("inf"), 0.0);
        assert_eq!(parse_real("NaN"), 0.0);
        assert_eq!(parse_real("1e3"), 1000.0);
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_blend_rgb() {
        assert_eq!(blend_rgb([0.0; 3], [1.0; 3], 0.5), [0.5; 3]);
        assert_eq!(blend_rgb([0.2; 3], [1.0; 3], 2.0), [1.0; 3]);
    }
}
