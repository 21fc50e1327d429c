//! Viewport: the affine mapping between source-image space and view space.
//!
//! Vertices live in *source-image space* (pixels of the loaded photograph);
//! pointer events and drawing happen in *view space* (pixels of the on-screen
//! canvas). The two are separate types so that crossing between them always
//! goes through [`Viewport::to_view`] or [`Viewport::to_source`].
//!
//! The mapping is `view = source * effective_scale + offset`, where
//! `effective_scale = base_scale * zoom`.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};

/// A point in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SourcePoint {
    pub x: f64,
    pub y: f64,
}

impl SourcePoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in source pixels.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// A point in view (canvas) pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewPoint {
    pub x: f64,
    pub y: f64,
}

impl ViewPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in view pixels.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions are finite and strictly positive.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned rectangle in view space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewportError {
    #[error("invalid {what} size {width}x{height}")]
    InvalidSize { what: &'static str, width: f64, height: f64 },
    #[error("viewport scale is degenerate ({0})")]
    DegenerateScale(f64),
}

/// Pan/zoom state for one loaded image on one view surface.
///
/// Created by [`Viewport::fill`] when an image is loaded. `offset` is the
/// view-space position of the image's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    base_scale: f64,
    zoom: f64,
    offset: ViewPoint,
    view_size: Size,
    image_size: Size,
}

impl Viewport {
    /// Load an image into a view: scale so the image covers the whole view
    /// (overflow is cropped), zoom 1, centered.
    ///
    /// # Errors
    ///
    /// Returns [`ViewportError::InvalidSize`] if either size is not positive,
    /// or [`ViewportError::DegenerateScale`] if the sizes are so far apart
    /// that the mapping cannot be represented.
    pub fn fill(image_size: Size, view_size: Size) -> Result<Self, ViewportError> {
        check_size("image", image_size)?;
        check_size("view", view_size)?;

        let base_scale = (view_size.width / image_size.width).max(view_size.height / image_size.height);
        check_scale(base_scale, image_size)?;
        let mut viewport = Self { base_scale, zoom: 1.0, offset: ViewPoint::default(), view_size, image_size };
        viewport.center();
        Ok(viewport)
    }

    /// Track a new view size: rescale so the whole image fits without ever
    /// upscaling, keep the user zoom, and re-center.
    ///
    /// Source-space content is unaffected; only its projection moves.
    ///
    /// # Errors
    ///
    /// Returns [`ViewportError::InvalidSize`] if `view_size` is not positive,
    /// or [`ViewportError::DegenerateScale`] if the fitted scale cannot be
    /// represented. The viewport is left unchanged in either case.
    pub fn resize_view(&mut self, view_size: Size) -> Result<(), ViewportError> {
        check_size("view", view_size)?;
        let base_scale = fit_scale(self.image_size, view_size);
        check_scale(base_scale, self.image_size)?;

        self.view_size = view_size;
        self.base_scale = base_scale;
        self.center();
        Ok(())
    }

    /// Set the user zoom (clamped to `[MIN_ZOOM, MAX_ZOOM]`), keeping the
    /// source point under the view center fixed, then clamp the pan.
    pub fn set_zoom(&mut self, zoom: f64) {
        let target = if zoom.is_nan() { self.zoom } else { zoom.clamp(MIN_ZOOM, MAX_ZOOM) };

        let center = self.view_center();
        let anchor = self.unproject(center);

        self.zoom = target;
        let scale = self.effective_scale();
        self.offset = ViewPoint::new(center.x - anchor.x * scale, center.y - anchor.y * scale);
        self.clamp_pan();
    }

    /// Multiply the current zoom by `factor`.
    pub fn zoom_by(&mut self, factor: f64) {
        self.set_zoom(self.zoom * factor);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / ZOOM_STEP);
    }

    /// Return to zoom 1 with the same center anchoring as [`Self::set_zoom`].
    pub fn reset_zoom(&mut self) {
        self.set_zoom(1.0);
    }

    /// Project a source-image point into view space.
    #[must_use]
    pub fn to_view(&self, p: SourcePoint) -> ViewPoint {
        let scale = self.effective_scale();
        ViewPoint::new(p.x * scale + self.offset.x, p.y * scale + self.offset.y)
    }

    /// Map a view point back into source-image space.
    ///
    /// # Errors
    ///
    /// Returns [`ViewportError::DegenerateScale`] if the effective scale is
    /// not positive.
    pub fn to_source(&self, p: ViewPoint) -> Result<SourcePoint, ViewportError> {
        let scale = self.effective_scale();
        if !(scale.is_finite() && scale > 0.0) {
            return Err(ViewportError::DegenerateScale(scale));
        }
        Ok(self.unproject(p))
    }

    /// View-space rectangle covered by the scaled image.
    #[must_use]
    pub fn image_rect(&self) -> ViewRect {
        let scaled = self.scaled_image_size();
        ViewRect { x: self.offset.x, y: self.offset.y, width: scaled.width, height: scaled.height }
    }

    #[must_use]
    pub fn view_center(&self) -> ViewPoint {
        ViewPoint::new(self.view_size.width / 2.0, self.view_size.height / 2.0)
    }

    #[must_use]
    pub fn base_scale(&self) -> f64 {
        self.base_scale
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub fn effective_scale(&self) -> f64 {
        self.base_scale * self.zoom
    }

    #[must_use]
    pub fn offset(&self) -> ViewPoint {
        self.offset
    }

    #[must_use]
    pub fn view_size(&self) -> Size {
        self.view_size
    }

    #[must_use]
    pub fn image_size(&self) -> Size {
        self.image_size
    }

    fn scaled_image_size(&self) -> Size {
        let scale = self.effective_scale();
        Size::new(self.image_size.width * scale, self.image_size.height * scale)
    }

    fn unproject(&self, p: ViewPoint) -> SourcePoint {
        let scale = self.effective_scale();
        SourcePoint::new((p.x - self.offset.x) / scale, (p.y - self.offset.y) / scale)
    }

    fn center(&mut self) {
        let scaled = self.scaled_image_size();
        self.offset = ViewPoint::new(
            (self.view_size.width - scaled.width) / 2.0,
            (self.view_size.height - scaled.height) / 2.0,
        );
    }

    /// Keep image content covering the view on axes where the image is larger,
    /// and center it on axes where it is smaller.
    fn clamp_pan(&mut self) {
        let scaled = self.scaled_image_size();
        self.offset.x = clamp_axis(self.offset.x, scaled.width, self.view_size.width);
        self.offset.y = clamp_axis(self.offset.y, scaled.height, self.view_size.height);
    }
}

fn clamp_axis(offset: f64, scaled: f64, view: f64) -> f64 {
    let overflow = scaled - view;
    if overflow > 0.0 { offset.clamp(-overflow, 0.0) } else { (view - scaled) / 2.0 }
}

fn fit_scale(image: Size, view: Size) -> f64 {
    (view.width / image.width).min(view.height / image.height).min(1.0)
}

/// The scale must stay finite and positive across the whole zoom range, and
/// the scaled image must stay finite.
fn check_scale(base_scale: f64, image: Size) -> Result<(), ViewportError> {
    let usable = |scale: f64| {
        scale.is_finite() && scale > 0.0 && (image.width * scale).is_finite() && (image.height * scale).is_finite()
    };
    if usable(base_scale * MIN_ZOOM) && usable(base_scale * MAX_ZOOM) {
        Ok(())
    } else {
        Err(ViewportError::DegenerateScale(base_scale))
    }
}

fn check_size(what: &'static str, size: Size) -> Result<(), ViewportError> {
    if size.is_valid() {
        Ok(())
    } else {
        Err(ViewportError::InvalidSize { what, width: size.width, height: size.height })
    }
}
