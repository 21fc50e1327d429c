use serde::{Deserialize, Serialize};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::calibration::{Calibration, CalibrationError};
use crate::consts::VERTEX_HIT_RADIUS_PX;
use crate::hit::hit_vertex;
use crate::input::{Button, Cursor, InputState, UiState};
use crate::render::{self, Scene};
use crate::triangle::{Side, SolidError, SolidEstimate, TriangleSolid};
use crate::viewport::{Size, SourcePoint, ViewPoint, Viewport, ViewportError};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    VertexPlaced { index: usize, point: SourcePoint },
    VertexMoved { index: usize, point: SourcePoint },
    TriangleCleared,
    /// The triangle is complete and its estimate changed.
    EstimateUpdated(SolidEstimate),
    SetCursor(Cursor),
    RenderNeeded,
}

/// A recordable engine mutation. One JSON object per command, tagged by `op`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    ResizeView {
        width: f64,
        height: f64,
    },
    LoadImage {
        width: f64,
        height: f64,
    },
    PointerDown {
        x: f64,
        y: f64,
        #[serde(default)]
        button: Button,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerUp {
        x: f64,
        y: f64,
        #[serde(default)]
        button: Button,
    },
    ZoomIn,
    ZoomOut,
    ResetZoom,
    SetZoom {
        zoom: f64,
    },
    Clear,
    SetCalibration(Calibration),
    /// Candidate vertices from an external detector, in source-image space.
    Detected {
        vertices: Vec<SourcePoint>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no image loaded")]
    NoImage,
    #[error(transparent)]
    Viewport(#[from] ViewportError),
    #[error(transparent)]
    Solid(#[from] SolidError),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error("invalid command: {0}")]
    InvalidCommand(#[from] serde_json::Error),
}

/// Core engine state: all logic that does not depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
#[derive(Debug, Clone)]
pub struct EngineCore {
    /// Present once an image has been loaded.
    pub viewport: Option<Viewport>,
    pub triangle: TriangleSolid,
    pub calibration: Calibration,
    pub ui: UiState,
    pub input: InputState,
    /// View surface size in CSS pixels; zero until the host reports it.
    pub view_size: Size,
    /// Last pointer position seen, used to refresh hover when the view moves
    /// under a stationary pointer.
    pub pointer: Option<ViewPoint>,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self {
            viewport: None,
            triangle: TriangleSolid::new(),
            calibration: Calibration::default(),
            ui: UiState::default(),
            input: InputState::default(),
            view_size: Size::new(0.0, 0.0),
            pointer: None,
        }
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- View / image ---

    /// Track the view surface size. Vertices stay put in source space.
    pub fn set_view_size(&mut self, width: f64, height: f64) -> Vec<Action> {
        let size = Size::new(width, height);
        if !size.is_valid() {
            tracing::warn!(width, height, "ignoring invalid view size");
            return Vec::new();
        }
        let Some(viewport) = self.viewport.as_mut() else {
            self.view_size = size;
            return Vec::new();
        };
        if let Err(error) = viewport.resize_view(size) {
            tracing::warn!(%error, width, height, "view resize rejected");
            return Vec::new();
        }
        tracing::debug!(width, height, base_scale = viewport.base_scale(), "view resized");
        self.view_size = size;

        let mut actions = vec![Action::RenderNeeded];
        self.refresh_hover(&mut actions);
        actions
    }

    /// Start working on a new image: fill the view with it and drop the
    /// previous triangle.
    ///
    /// # Errors
    ///
    /// [`EngineError::Viewport`] if the image size is invalid or no view
    /// size has been reported yet.
    pub fn load_image(&mut self, width: f64, height: f64) -> Result<Vec<Action>, EngineError> {
        let viewport = Viewport::fill(Size::new(width, height), self.view_size)?;
        tracing::info!(width, height, base_scale = viewport.base_scale(), "image loaded");
        self.viewport = Some(viewport);

        let mut actions = Vec::new();
        self.reset_editing(&mut actions);
        actions.push(Action::RenderNeeded);
        Ok(actions)
    }

    // --- Pointer input ---

    /// Place a vertex, or start dragging one once the triangle is complete.
    pub fn on_pointer_down(&mut self, view_pt: ViewPoint, button: Button) -> Vec<Action> {
        self.pointer = Some(view_pt);
        if button != Button::Primary || self.input.dragging().is_some() {
            return Vec::new();
        }
        let Some(viewport) = self.viewport else {
            tracing::debug!("pointer down ignored: no image loaded");
            return Vec::new();
        };

        let mut actions = Vec::new();
        if self.triangle.is_complete() {
            if let Some(index) = hit_vertex(view_pt, &self.triangle, &viewport, VERTEX_HIT_RADIUS_PX) {
                tracing::debug!(index, "vertex drag started");
                self.input = InputState::DraggingVertex { index };
                self.ui.hovered = Some(index);
                self.set_cursor(Cursor::Move, &mut actions);
            }
            return actions;
        }

        let point = match viewport.to_source(view_pt) {
            Ok(point) => point,
            Err(error) => {
                tracing::warn!(%error, "pointer down ignored");
                return actions;
            }
        };
        if let Some(index) = self.triangle.add_vertex(point) {
            actions.push(Action::VertexPlaced { index, point });
            if self.triangle.is_complete() {
                tracing::info!("triangle complete");
                self.push_estimate(&mut actions);
            }
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    /// Move the dragged vertex, or update hover feedback.
    pub fn on_pointer_move(&mut self, view_pt: ViewPoint) -> Vec<Action> {
        self.pointer = Some(view_pt);
        let Some(viewport) = self.viewport else {
            return Vec::new();
        };
        let mut actions = Vec::new();

        if let Some(index) = self.input.dragging() {
            let point = match viewport.to_source(view_pt) {
                Ok(point) => point,
                Err(error) => {
                    tracing::warn!(%error, "drag move ignored");
                    return actions;
                }
            };
            if let Err(error) = self.triangle.move_vertex(index, point) {
                tracing::warn!(%error, index, "drag move rejected");
                self.input = InputState::Idle;
                return actions;
            }
            actions.push(Action::VertexMoved { index, point });
            self.push_estimate(&mut actions);
            actions.push(Action::RenderNeeded);
            return actions;
        }

        let hovered = self.hover_at(view_pt);
        self.update_hover(hovered, &mut actions);
        actions
    }

    /// End a drag session.
    pub fn on_pointer_up(&mut self, view_pt: ViewPoint, button: Button) -> Vec<Action> {
        self.pointer = Some(view_pt);
        if button != Button::Primary {
            return Vec::new();
        }
        let Some(index) = self.input.dragging() else {
            return Vec::new();
        };
        tracing::debug!(index, "vertex drag finished");
        self.input = InputState::Idle;

        let mut actions = Vec::new();
        let hovered = self.hover_at(view_pt);
        self.update_hover(hovered, &mut actions);
        actions
    }

    // --- Zoom ---

    pub fn zoom_in(&mut self) -> Vec<Action> {
        self.with_viewport(Viewport::zoom_in)
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        self.with_viewport(Viewport::zoom_out)
    }

    pub fn reset_zoom(&mut self) -> Vec<Action> {
        self.with_viewport(Viewport::reset_zoom)
    }

    /// Set an absolute zoom; out-of-range values are clamped.
    pub fn set_zoom(&mut self, zoom: f64) -> Vec<Action> {
        self.with_viewport(|viewport| viewport.set_zoom(zoom))
    }

    // --- Triangle ---

    /// Remove all vertices.
    pub fn clear(&mut self) -> Vec<Action> {
        tracing::info!("clearing triangle");
        let mut actions = Vec::new();
        self.reset_editing(&mut actions);
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Replace the calibration and re-estimate.
    ///
    /// # Errors
    ///
    /// [`EngineError::Calibration`] if the calibration is invalid; the
    /// previous calibration stays in effect.
    pub fn set_calibration(&mut self, calibration: Calibration) -> Result<Vec<Action>, EngineError> {
        calibration.validate()?;
        self.calibration = calibration;
        tracing::debug!(
            pixel_size_m = calibration.pixel_size_m,
            k_vol = calibration.k_vol,
            k_den = calibration.k_den,
            "calibration updated"
        );

        let mut actions = Vec::new();
        self.push_estimate(&mut actions);
        actions.push(Action::RenderNeeded);
        Ok(actions)
    }

    /// Adopt a triangle proposed by an external detector.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoImage`] without a loaded image,
    /// [`EngineError::Solid`] unless exactly three candidates are given.
    pub fn apply_detected(&mut self, vertices: &[SourcePoint]) -> Result<Vec<Action>, EngineError> {
        if self.viewport.is_none() {
            return Err(EngineError::NoImage);
        }
        self.triangle.replace(vertices)?;
        if let Some(index) = self.input.dragging() {
            tracing::debug!(index, "vertex drag cancelled by detection");
        }
        self.input = InputState::Idle;
        tracing::info!(?vertices, "triangle detected");

        let mut actions: Vec<Action> = vertices
            .iter()
            .enumerate()
            .map(|(index, &point)| Action::VertexPlaced { index, point })
            .collect();
        self.refresh_hover(&mut actions);
        self.push_estimate(&mut actions);
        actions.push(Action::RenderNeeded);
        Ok(actions)
    }

    // --- Commands ---

    /// Apply one recorded command.
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying operation.
    pub fn apply(&mut self, command: Command) -> Result<Vec<Action>, EngineError> {
        let actions = match command {
            Command::ResizeView { width, height } => self.set_view_size(width, height),
            Command::LoadImage { width, height } => self.load_image(width, height)?,
            Command::PointerDown { x, y, button } => self.on_pointer_down(ViewPoint::new(x, y), button),
            Command::PointerMove { x, y } => self.on_pointer_move(ViewPoint::new(x, y)),
            Command::PointerUp { x, y, button } => self.on_pointer_up(ViewPoint::new(x, y), button),
            Command::ZoomIn => self.zoom_in(),
            Command::ZoomOut => self.zoom_out(),
            Command::ResetZoom => self.reset_zoom(),
            Command::SetZoom { zoom } => self.set_zoom(zoom),
            Command::Clear => self.clear(),
            Command::SetCalibration(calibration) => self.set_calibration(calibration)?,
            Command::Detected { vertices } => self.apply_detected(&vertices)?,
        };
        Ok(actions)
    }

    /// Parse and apply one JSON command.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidCommand`] for malformed JSON, otherwise as [`Self::apply`].
    pub fn apply_json(&mut self, json: &str) -> Result<Vec<Action>, EngineError> {
        let command = serde_json::from_str::<Command>(json)?;
        self.apply(command)
    }

    // --- Queries ---

    #[must_use]
    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    #[must_use]
    pub fn triangle(&self) -> &TriangleSolid {
        &self.triangle
    }

    #[must_use]
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Current vertices projected into view space for drawing.
    #[must_use]
    pub fn vertices_in_view(&self) -> Vec<ViewPoint> {
        match &self.viewport {
            Some(viewport) => self.triangle.vertices().iter().map(|&v| viewport.to_view(v)).collect(),
            None => Vec::new(),
        }
    }

    #[must_use]
    pub fn side_lengths(&self) -> Vec<Side> {
        self.triangle.side_lengths(self.calibration.pixel_size_m)
    }

    /// Cone estimate for the current triangle and calibration.
    ///
    /// # Errors
    ///
    /// [`SolidError::InvalidVertexCount`] while the triangle is incomplete.
    pub fn estimate(&self) -> Result<SolidEstimate, SolidError> {
        self.triangle.estimate_solid(&self.calibration)
    }

    /// Renderable view-space primitives for the current state.
    #[must_use]
    pub fn scene(&self) -> Scene {
        render::build_scene(self)
    }

    // --- Helpers ---

    fn with_viewport(&mut self, op: impl FnOnce(&mut Viewport)) -> Vec<Action> {
        let Some(viewport) = self.viewport.as_mut() else {
            tracing::debug!("zoom ignored: no image loaded");
            return Vec::new();
        };
        op(viewport);
        tracing::debug!(zoom = viewport.zoom(), scale = viewport.effective_scale(), "zoom changed");
        let mut actions = vec![Action::RenderNeeded];
        self.refresh_hover(&mut actions);
        actions
    }

    fn reset_editing(&mut self, actions: &mut Vec<Action>) {
        if !self.triangle.is_empty() {
            self.triangle.clear();
            actions.push(Action::TriangleCleared);
        }
        self.input = InputState::Idle;
        self.ui.hovered = None;
        self.set_cursor(Cursor::Crosshair, actions);
    }

    fn push_estimate(&self, actions: &mut Vec<Action>) {
        match self.estimate() {
            Ok(estimate) => actions.push(Action::EstimateUpdated(estimate)),
            Err(error) => tracing::debug!(%error, "no estimate"),
        }
    }

    /// Vertex that would be hovered at `view_pt`; only a complete triangle
    /// offers drag targets.
    fn hover_at(&self, view_pt: ViewPoint) -> Option<usize> {
        let viewport = self.viewport.as_ref()?;
        if !self.triangle.is_complete() {
            return None;
        }
        hit_vertex(view_pt, &self.triangle, viewport, VERTEX_HIT_RADIUS_PX)
    }

    /// Re-run hover against the last pointer position after the vertices
    /// moved on screen without pointer motion. A drag keeps its highlight.
    fn refresh_hover(&mut self, actions: &mut Vec<Action>) {
        if self.input.dragging().is_some() {
            return;
        }
        let hovered = self.pointer.and_then(|p| self.hover_at(p));
        self.update_hover(hovered, actions);
    }

    fn update_hover(&mut self, hovered: Option<usize>, actions: &mut Vec<Action>) {
        if self.ui.hovered != hovered {
            self.ui.hovered = hovered;
            if !actions.contains(&Action::RenderNeeded) {
                actions.push(Action::RenderNeeded);
            }
        }
        let cursor = if hovered.is_some() { Cursor::Move } else { Cursor::Crosshair };
        self.set_cursor(cursor, actions);
    }

    fn set_cursor(&mut self, cursor: Cursor, actions: &mut Vec<Action>) {
        if self.ui.cursor != cursor {
            self.ui.cursor = cursor;
            actions.push(Action::SetCursor(cursor));
        }
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas
/// element plus the decoded image supplied by the host.
pub struct Engine {
    canvas: HtmlCanvasElement,
    image: Option<HtmlImageElement>,
    dpr: f64,
    pub core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self { canvas, image: None, dpr: 1.0, core: EngineCore::new() }
    }

    // --- Viewport ---

    /// Update view dimensions (CSS pixels) and device pixel ratio, resizing
    /// the canvas backing store to match.
    ///
    /// Invalid sizes leave both the canvas and the engine untouched.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Vec<Action> {
        let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        let Some((width_px, height_px)) = backing_store_size(width_css, height_css, dpr) else {
            tracing::warn!(width_css, height_css, dpr, "ignoring invalid viewport");
            return Vec::new();
        };
        let actions = self.core.set_view_size(width_css, height_css);
        if self.core.view_size != Size::new(width_css, height_css) {
            return actions;
        }
        self.dpr = dpr;
        self.canvas.set_width(width_px);
        self.canvas.set_height(height_px);
        actions
    }

    /// Show a decoded image and start a new measurement on it.
    ///
    /// # Errors
    ///
    /// See [`EngineCore::load_image`].
    pub fn load_image(&mut self, image: HtmlImageElement) -> Result<Vec<Action>, EngineError> {
        let width = f64::from(image.natural_width());
        let height = f64::from(image.natural_height());
        let actions = self.core.load_image(width, height)?;
        self.image = Some(image);
        Ok(actions)
    }

    // --- Delegated input ---

    pub fn on_pointer_down(&mut self, view_pt: ViewPoint, button: Button) -> Vec<Action> {
        self.core.on_pointer_down(view_pt, button)
    }

    pub fn on_pointer_move(&mut self, view_pt: ViewPoint) -> Vec<Action> {
        self.core.on_pointer_move(view_pt)
    }

    pub fn on_pointer_up(&mut self, view_pt: ViewPoint, button: Button) -> Vec<Action> {
        self.core.on_pointer_up(view_pt, button)
    }

    pub fn zoom_in(&mut self) -> Vec<Action> {
        self.core.zoom_in()
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        self.core.zoom_out()
    }

    pub fn reset_zoom(&mut self) -> Vec<Action> {
        self.core.reset_zoom()
    }

    pub fn clear(&mut self) -> Vec<Action> {
        self.core.clear()
    }

    /// # Errors
    ///
    /// See [`EngineCore::set_calibration`].
    pub fn set_calibration(&mut self, calibration: Calibration) -> Result<Vec<Action>, EngineError> {
        self.core.set_calibration(calibration)
    }

    /// # Errors
    ///
    /// See [`EngineCore::apply_detected`].
    pub fn apply_detected(&mut self, vertices: &[SourcePoint]) -> Result<Vec<Action>, EngineError> {
        self.core.apply_detected(vertices)
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a `Canvas2D` call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(JsValue::from)?;
        let view = self.core.view_size;
        render::draw(&ctx, &self.core.scene(), self.image.as_ref(), view.width, view.height, self.dpr)
    }

    // --- Delegated queries ---

    /// # Errors
    ///
    /// See [`EngineCore::estimate`].
    pub fn estimate(&self) -> Result<SolidEstimate, SolidError> {
        self.core.estimate()
    }

    #[must_use]
    pub fn viewport(&self) -> Option<&Viewport> {
        self.core.viewport()
    }
}

/// Device-pixel size of the canvas backing store for a CSS size, or `None`
/// if the CSS size is not a valid view size or does not fit a `u32`.
#[must_use]
pub fn backing_store_size(width_css: f64, height_css: f64, dpr: f64) -> Option<(u32, u32)> {
    if !Size::new(width_css, height_css).is_valid() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let to_px = |css: f64| {
        let px = (css * dpr).round();
        (px.is_finite() && px >= 1.0 && px <= f64::from(u32::MAX)).then(|| px as u32)
    };
    Some((to_px(width_css)?, to_px(height_css)?))
}
