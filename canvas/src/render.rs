//! Rendering: turns engine state into view-space primitives and draws them.
//!
//! [`build_scene`] is pure and produces a [`Scene`] of already-projected
//! shapes, so everything about *what* is drawn is testable natively.
//! [`draw`] is the only place that touches [`web_sys::CanvasRenderingContext2d`];
//! it paints a scene and mutates no application state.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use crate::consts::{VERTEX_LABEL_OFFSET_PX, VERTEX_MARKER_RADIUS_PX};
use crate::engine::EngineCore;
use crate::geometry::midpoint;
use crate::triangle::{Edge, VERTEX_LABELS};
use crate::viewport::{ViewPoint, ViewRect};

// ── Palette ────────────────────────────────────────────────────

const OUTLINE_STROKE: &str = "#00ff00";
const OUTLINE_FILL: &str = "rgba(0, 255, 0, 0.1)";
const OUTLINE_WIDTH_PX: f64 = 2.0;
const VERTEX_FILL: &str = "#ff0000";
const VERTEX_HOVER_FILL: &str = "#00ff00";
const LABEL_FONT: &str = "bold 14px Arial";
const LABEL_FILL: &str = "#ffffff";
const LABEL_HALO: &str = "#000000";
const LABEL_HALO_WIDTH_PX: f64 = 3.0;
const EDGE_LABEL_FONT: &str = "bold 12px Arial";
const EDGE_LABEL_FILL: &str = "#ffff00";
const EDGE_LABEL_BACKING: &str = "rgba(0, 0, 0, 0.7)";
const EDGE_LABEL_PAD_PX: f64 = 4.0;
const EDGE_LABEL_BOX_HEIGHT_PX: f64 = 20.0;

/// Polyline through the placed vertices, in view space.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub points: Vec<ViewPoint>,
    /// Closed and filled once the triangle is complete.
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexMarker {
    pub center: ViewPoint,
    pub label: &'static str,
    /// Under the pointer or being dragged.
    pub highlighted: bool,
}

/// Measurement text centered on an edge midpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLabel {
    pub anchor: ViewPoint,
    pub text: String,
}

/// Everything one frame draws, bottom layer first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub image: Option<ViewRect>,
    pub outline: Option<Outline>,
    pub markers: Vec<VertexMarker>,
    pub edge_labels: Vec<EdgeLabel>,
}

/// Project the engine's image and triangle into view space.
///
/// An engine without a loaded image yields an empty scene.
#[must_use]
pub fn build_scene(core: &EngineCore) -> Scene {
    let Some(viewport) = core.viewport() else {
        return Scene::default();
    };
    let points = core.vertices_in_view();
    let highlighted = core.input.dragging().or(core.ui.hovered);

    let outline = (points.len() >= 2).then(|| Outline { points: points.clone(), closed: core.triangle().is_complete() });

    let markers = points
        .iter()
        .zip(VERTEX_LABELS)
        .enumerate()
        .map(|(i, (&center, label))| VertexMarker { center, label, highlighted: highlighted == Some(i) })
        .collect();

    let vertices = core.triangle().vertices();
    let edge_labels = if core.triangle().is_complete() {
        Edge::ALL
            .iter()
            .zip(core.side_lengths())
            .map(|(edge, side)| {
                let (i, j) = edge.endpoints();
                EdgeLabel {
                    anchor: viewport.to_view(midpoint(vertices[i], vertices[j])),
                    text: edge_label_text(side.name, side.length_px, side.length_m),
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    Scene { image: Some(viewport.image_rect()), outline, markers, edge_labels }
}

/// `"AB: 100px (5.00 m)"`.
#[must_use]
pub fn edge_label_text(name: &str, length_px: f64, length_m: f64) -> String {
    format!("{name}: {length_px:.0}px ({length_m:.2} m)")
}

/// Draw a scene over the (optional) image.
///
/// `view_w` and `view_h` are in CSS pixels. `dpr` is the device pixel ratio.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(
    ctx: &CanvasRenderingContext2d,
    scene: &Scene,
    image: Option<&HtmlImageElement>,
    view_w: f64,
    view_h: f64,
    dpr: f64,
) -> Result<(), JsValue> {
    // Layer 1: clear.
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, view_w, view_h);

    // Layer 2: photograph.
    if let (Some(rect), Some(image)) = (scene.image, image) {
        ctx.draw_image_with_html_image_element_and_dw_and_dh(image, rect.x, rect.y, rect.width, rect.height)?;
    }

    // Layer 3: triangle.
    if let Some(outline) = &scene.outline {
        draw_outline(ctx, outline);
    }
    for marker in &scene.markers {
        draw_marker(ctx, marker)?;
    }

    // Layer 4: measurements.
    for label in &scene.edge_labels {
        draw_edge_label(ctx, label)?;
    }

    Ok(())
}

// =============================================================
// Primitive renderers
// =============================================================

fn draw_outline(ctx: &CanvasRenderingContext2d, outline: &Outline) {
    let Some((first, rest)) = outline.points.split_first() else {
        return;
    };
    ctx.begin_path();
    ctx.move_to(first.x, first.y);
    for p in rest {
        ctx.line_to(p.x, p.y);
    }
    if outline.closed {
        ctx.close_path();
        ctx.set_fill_style_str(OUTLINE_FILL);
        ctx.fill();
    }
    ctx.set_stroke_style_str(OUTLINE_STROKE);
    ctx.set_line_width(OUTLINE_WIDTH_PX);
    ctx.stroke();
}

fn draw_marker(ctx: &CanvasRenderingContext2d, marker: &VertexMarker) -> Result<(), JsValue> {
    let ViewPoint { x, y } = marker.center;

    ctx.begin_path();
    ctx.arc(x, y, VERTEX_MARKER_RADIUS_PX, 0.0, 2.0 * PI)?;
    ctx.set_fill_style_str(if marker.highlighted { VERTEX_HOVER_FILL } else { VERTEX_FILL });
    ctx.fill();

    ctx.set_font(LABEL_FONT);
    ctx.set_text_align("left");
    ctx.set_text_baseline("alphabetic");
    let (lx, ly) = (x + VERTEX_LABEL_OFFSET_PX, y - VERTEX_LABEL_OFFSET_PX);
    ctx.set_stroke_style_str(LABEL_HALO);
    ctx.set_line_width(LABEL_HALO_WIDTH_PX);
    ctx.stroke_text(marker.label, lx, ly)?;
    ctx.set_fill_style_str(LABEL_FILL);
    ctx.fill_text(marker.label, lx, ly)?;
    Ok(())
}

fn draw_edge_label(ctx: &CanvasRenderingContext2d, label: &EdgeLabel) -> Result<(), JsValue> {
    ctx.set_font(EDGE_LABEL_FONT);
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");

    let width = measured_text_width(ctx, &label.text);
    let ViewPoint { x, y } = label.anchor;
    ctx.set_fill_style_str(EDGE_LABEL_BACKING);
    ctx.fill_rect(
        x - width / 2.0 - EDGE_LABEL_PAD_PX,
        y - EDGE_LABEL_BOX_HEIGHT_PX / 2.0,
        width + 2.0 * EDGE_LABEL_PAD_PX,
        EDGE_LABEL_BOX_HEIGHT_PX,
    );
    ctx.set_fill_style_str(EDGE_LABEL_FILL);
    ctx.fill_text(&label.text, x, y)?;
    Ok(())
}

fn measured_text_width(ctx: &CanvasRenderingContext2d, text: &str) -> f64 {
    match ctx.measure_text(text) {
        Ok(metrics) => metrics.width(),
        Err(_) => 0.0,
    }
}
