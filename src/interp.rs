use crate::types::{Point, Value};

// Return the interpolation factor t at which the edge v0 -> v1 crosses iso_val.
//
// The factor is clamped to [0, 1]. Flat edges cross at their midpoint and an
// infinite corner pushes the crossing onto the finite corner.
pub fn find_t(v0: Value, v1: Value, iso_val: Value) -> Value {
    let t = match (v0.is_finite(), v1.is_finite()) {
        (true, true) if v0 != v1 => (iso_val - v0) / (v1 - v0),
        (false, true) => 1.0,
        (true, false) => 0.0,
        _ => 0.5,
    };

    if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) }
}

// Linear interpolation
pub fn lerp(a: Value, b: Value, t: Value) -> Value {
    a + (b - a) * t
}

// Linearly interpolate between two points by factor t
pub fn interpolate_points(p0: Point, p1: Point, t: Value) -> Point {
    Point::new(lerp(p0.x, p1.x, t), lerp(p0.y, p1.y, t))
}
