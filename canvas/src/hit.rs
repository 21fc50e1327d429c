#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::triangle::TriangleSolid;
use crate::viewport::{Viewport, ViewPoint};

/// Which vertex (if any) is under `view_pt`.
///
/// Vertices are projected into view space and compared there, so the grab
/// radius stays constant on screen regardless of zoom. The earliest vertex
/// in insertion order wins when several are in range.
#[must_use]
pub fn hit_vertex(view_pt: ViewPoint, triangle: &TriangleSolid, viewport: &Viewport, radius_px: f64) -> Option<usize> {
    triangle
        .vertices()
        .iter()
        .position(|&v| viewport.to_view(v).distance_to(view_pt) < radius_px)
}
