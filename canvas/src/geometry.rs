//! Plane geometry on source-image points.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use crate::viewport::SourcePoint;

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: SourcePoint, b: SourcePoint) -> f64 {
    a.distance_to(b)
}

/// Unsigned area of the triangle `a b c` (shoelace formula).
#[must_use]
pub fn triangle_area(a: SourcePoint, b: SourcePoint, c: SourcePoint) -> f64 {
    ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs() / 2.0
}

/// Height of the triangle over the base `base1 base2`, derived from its area.
///
/// Returns 0 when the base has zero length.
#[must_use]
pub fn triangle_height(base1: SourcePoint, base2: SourcePoint, apex: SourcePoint) -> f64 {
    let base = distance(base1, base2);
    if base > 0.0 { 2.0 * triangle_area(base1, base2, apex) / base } else { 0.0 }
}

/// Midpoint of a segment.
#[must_use]
pub fn midpoint(a: SourcePoint, b: SourcePoint) -> SourcePoint {
    SourcePoint::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}
