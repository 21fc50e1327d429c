//! Shared numeric constants for the canvas crate.

// ── Zoom ────────────────────────────────────────────────────────

/// Smallest user zoom multiplier.
pub const MIN_ZOOM: f64 = 0.5;

/// Largest user zoom multiplier.
pub const MAX_ZOOM: f64 = 5.0;

/// Multiplier applied by a single zoom-in step (and divided by zoom-out).
pub const ZOOM_STEP: f64 = 1.2;

// ── Hit-testing ─────────────────────────────────────────────────

/// View-space radius in pixels within which a press grabs a vertex.
pub const VERTEX_HIT_RADIUS_PX: f64 = 10.0;

// ── Rendering ───────────────────────────────────────────────────

/// Radius of the filled vertex marker, in view pixels.
pub const VERTEX_MARKER_RADIUS_PX: f64 = 5.0;

/// Offset of a vertex label from its marker, in view pixels.
pub const VERTEX_LABEL_OFFSET_PX: f64 = 10.0;

// ── Calibration defaults ────────────────────────────────────────

/// Physical size of one source-image pixel, in meters.
pub const DEFAULT_PIXEL_SIZE_M: f64 = 0.1;

/// Volume correction coefficient applied to the ideal cone.
pub const DEFAULT_K_VOL: f64 = 1.0;

/// Bulk density used to turn cubic meters into tonnes.
pub const DEFAULT_K_DEN: f64 = 1.7;
