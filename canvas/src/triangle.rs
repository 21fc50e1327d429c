//! Triangle model: up to three source-space vertices and the cone estimate
//! derived from them.
//!
//! Vertices are labelled A, B, C by insertion order. The editing state machine
//! is `Empty -> Partial(1) -> Partial(2) -> Complete`; only a complete triangle
//! accepts drags and produces an estimate, and it refuses further insertion
//! until cleared.
//!
//! All lengths are measured in source-image pixels before the physical pixel
//! size is applied, so measurements do not depend on the current zoom.

#[cfg(test)]
#[path = "triangle_test.rs"]
mod triangle_test;

use std::f64::consts::PI;

use serde::Serialize;

use crate::calibration::Calibration;
use crate::geometry::{distance, triangle_height};
use crate::viewport::SourcePoint;

/// Number of vertices in a complete triangle.
pub const VERTEX_COUNT: usize = 3;

/// Labels for vertices in insertion order.
pub const VERTEX_LABELS: [&str; VERTEX_COUNT] = ["A", "B", "C"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolidError {
    #[error("need exactly 3 vertices, have {0}")]
    InvalidVertexCount(usize),
    #[error("vertex index {index} out of range for {count} vertices")]
    IndexOutOfRange { index: usize, count: usize },
}

/// Editing state derived from the vertex count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangleState {
    Empty,
    /// One or two vertices placed.
    Partial(usize),
    Complete,
}

/// One of the three ordered triangle edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Edge {
    AB,
    BC,
    CA,
}

impl Edge {
    /// Fixed enumeration order; also the tie-break order for base selection.
    pub const ALL: [Edge; 3] = [Edge::AB, Edge::BC, Edge::CA];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::AB => "AB",
            Self::BC => "BC",
            Self::CA => "CA",
        }
    }

    /// Indices of the edge's two endpoints.
    #[must_use]
    pub fn endpoints(self) -> (usize, usize) {
        match self {
            Self::AB => (0, 1),
            Self::BC => (1, 2),
            Self::CA => (2, 0),
        }
    }

    /// Index of the vertex not on this edge.
    #[must_use]
    pub fn opposite(self) -> usize {
        match self {
            Self::AB => 2,
            Self::BC => 0,
            Self::CA => 1,
        }
    }
}

/// Measured length of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Side {
    pub name: &'static str,
    pub length_px: f64,
    pub length_m: f64,
}

/// Cone estimate derived from a complete triangle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolidEstimate {
    pub sides: Vec<Side>,
    /// Edge taken as the cone's base (the most nearly horizontal one).
    pub base_edge: Edge,
    pub base_length_px: f64,
    pub base_length_m: f64,
    pub height_px: f64,
    /// Cone height in meters.
    pub height: f64,
    /// Base radius in meters.
    pub radius: f64,
    /// Volume in cubic meters, after `k_vol`.
    pub volume: f64,
    /// Mass in tonnes (`volume * k_den`).
    pub mass: f64,
}

/// The operator's triangle, in source-image coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleSolid {
    vertices: Vec<SourcePoint>,
}

impl TriangleSolid {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn vertices(&self) -> &[SourcePoint] {
        &self.vertices
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.vertices.len() == VERTEX_COUNT
    }

    #[must_use]
    pub fn state(&self) -> TriangleState {
        match self.vertices.len() {
            0 => TriangleState::Empty,
            VERTEX_COUNT => TriangleState::Complete,
            n => TriangleState::Partial(n),
        }
    }

    /// Append a vertex. Returns its index, or `None` if the triangle is
    /// already complete.
    pub fn add_vertex(&mut self, p: SourcePoint) -> Option<usize> {
        if self.is_complete() {
            return None;
        }
        self.vertices.push(p);
        let index = self.vertices.len() - 1;
        tracing::debug!(index, x = p.x, y = p.y, "vertex added");
        Some(index)
    }

    /// Replace vertex `index` of a complete triangle.
    ///
    /// # Errors
    ///
    /// [`SolidError::InvalidVertexCount`] if the triangle is incomplete,
    /// [`SolidError::IndexOutOfRange`] if `index` is not 0, 1 or 2.
    pub fn move_vertex(&mut self, index: usize, p: SourcePoint) -> Result<(), SolidError> {
        if !self.is_complete() {
            return Err(SolidError::InvalidVertexCount(self.vertices.len()));
        }
        let count = self.vertices.len();
        let slot = self.vertices.get_mut(index).ok_or(SolidError::IndexOutOfRange { index, count })?;
        *slot = p;
        Ok(())
    }

    /// Replace all vertices at once, e.g. with detector output.
    ///
    /// # Errors
    ///
    /// [`SolidError::InvalidVertexCount`] unless exactly three points are given.
    pub fn replace(&mut self, points: &[SourcePoint]) -> Result<(), SolidError> {
        if points.len() != VERTEX_COUNT {
            return Err(SolidError::InvalidVertexCount(points.len()));
        }
        self.vertices.clear();
        self.vertices.extend_from_slice(points);
        Ok(())
    }

    /// First vertex, in insertion order, strictly within `radius` of `p`.
    #[must_use]
    pub fn hit_test(&self, p: SourcePoint, radius: f64) -> Option<usize> {
        self.vertices.iter().position(|v| v.distance_to(p) < radius)
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    /// Edge lengths: AB, BC, CA for a complete triangle, AB alone while two
    /// vertices are placed, nothing otherwise.
    #[must_use]
    pub fn side_lengths(&self, pixel_size_m: f64) -> Vec<Side> {
        let edges: &[Edge] = match self.vertices.len() {
            VERTEX_COUNT => &Edge::ALL,
            2 => &Edge::ALL[..1],
            _ => &[],
        };
        edges.iter().map(|&edge| self.side(edge, pixel_size_m)).collect()
    }

    /// Estimate the cone whose silhouette is this triangle.
    ///
    /// # Errors
    ///
    /// [`SolidError::InvalidVertexCount`] unless the triangle is complete.
    pub fn estimate_solid(&self, calibration: &Calibration) -> Result<SolidEstimate, SolidError> {
        if !self.is_complete() {
            return Err(SolidError::InvalidVertexCount(self.vertices.len()));
        }
        let pixel_size_m = calibration.pixel_size_m;

        let base_edge = self.base_edge();
        let (i, j) = base_edge.endpoints();
        let (base1, base2, apex) = (self.vertices[i], self.vertices[j], self.vertices[base_edge.opposite()]);

        let base_length_px = distance(base1, base2);
        let base_length_m = base_length_px * pixel_size_m;
        let radius = base_length_m / 2.0;

        let height_px = triangle_height(base1, base2, apex);
        let height = height_px * pixel_size_m;

        let volume = if radius > 0.0 && height > 0.0 {
            (PI / 3.0) * radius * radius * height * calibration.k_vol
        } else {
            0.0
        };
        let mass = volume * calibration.k_den;

        tracing::debug!(base = base_edge.name(), radius, height, volume, mass, "cone estimated");

        Ok(SolidEstimate {
            sides: self.side_lengths(pixel_size_m),
            base_edge,
            base_length_px,
            base_length_m,
            height_px,
            height,
            radius,
            volume,
            mass,
        })
    }

    /// Edge with the smallest vertical extent; the earliest edge wins ties.
    fn base_edge(&self) -> Edge {
        let mut best = Edge::AB;
        let mut best_dy = f64::INFINITY;
        for edge in Edge::ALL {
            let (i, j) = edge.endpoints();
            let dy = (self.vertices[j].y - self.vertices[i].y).abs();
            if dy < best_dy {
                best = edge;
                best_dy = dy;
            }
        }
        best
    }

    fn side(&self, edge: Edge, pixel_size_m: f64) -> Side {
        let (i, j) = edge.endpoints();
        let length_px = distance(self.vertices[i], self.vertices[j]);
        Side { name: edge.name(), length_px, length_m: length_px * pixel_size_m }
    }
}
