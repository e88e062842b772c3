//! Coordinate-transform engine – the WYSIWYG capture contract.
//!
//! Export does not re-frame the drawing: it takes whatever world-space
//! rectangle is currently visible inside the on-screen print boundary and
//! reproduces exactly that framing in the output area. The derivation is a
//! pure function of its four inputs — calling it twice with the same
//! boundary, view, canvas, and output area yields bit-identical parameters,
//! and every backend must be driven by a single invocation's result.
//!
//! World y increases upward; screen and output y increase downward. The
//! inversion and the forward map both carry the sign flip.

use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::geometry::{Point, Rect, Size};

/// The interactive view's world→screen parameters: uniform zoom scale plus
/// the world point currently at the canvas center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Screen pixels per world unit.
    pub scale: f64,
    /// World coordinates of the canvas center.
    pub centroid: Point,
}

impl ViewState {
    pub fn new(scale: f64, centroid: Point) -> Self {
        Self { scale, centroid }
    }

    pub fn world_to_screen(&self, canvas: Size, p: Point) -> Point {
        Point::new(
            canvas.width / 2.0 + (p.x - self.centroid.x) * self.scale,
            canvas.height / 2.0 - (p.y - self.centroid.y) * self.scale,
        )
    }

    pub fn screen_to_world(&self, canvas: Size, p: Point) -> Point {
        Point::new(
            self.centroid.x + (p.x - canvas.width / 2.0) / self.scale,
            self.centroid.y - (p.y - canvas.height / 2.0) / self.scale,
        )
    }
}

/// Fully determines a world→output affine mapping: uniform scale, y-axis
/// flip, translate-then-center. Recomputed per export cycle, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformParams {
    pub scale: f64,
    pub offset: Point,
    pub centroid: Point,
}

/// The committed export transform: parameters plus the scaled content size,
/// exposing the forward and inverse maps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportTransform {
    pub params: TransformParams,
    pub scaled_width: f64,
    pub scaled_height: f64,
    /// The visible world rectangle the capture was derived from
    /// (min-corner origin, y up).
    pub world_bounds: Rect,
}

impl ExportTransform {
    /// Map a world point into output coordinates (y down).
    pub fn world_to_output(&self, x: f64, y: f64) -> Point {
        let p = &self.params;
        Point::new(
            (x - p.centroid.x) * p.scale + p.offset.x + self.scaled_width / 2.0,
            -(y - p.centroid.y) * p.scale + p.offset.y + self.scaled_height / 2.0,
        )
    }

    /// Algebraic inverse of [`Self::world_to_output`].
    pub fn output_to_world(&self, x: f64, y: f64) -> Point {
        let p = &self.params;
        Point::new(
            p.centroid.x + (x - p.offset.x - self.scaled_width / 2.0) / p.scale,
            p.centroid.y - (y - p.offset.y - self.scaled_height / 2.0) / p.scale,
        )
    }

    /// The output-space rectangle actually covered by content (the scaled
    /// size centered in the output area).
    pub fn content_rect(&self) -> Rect {
        Rect::new(
            self.params.offset.x,
            self.params.offset.y,
            self.scaled_width,
            self.scaled_height,
        )
    }
}

/// Derive the export transform from the live view.
///
/// `boundary` is the print-safe inner rectangle in canvas pixels,
/// `output_area` the destination rectangle (print-area mm or device px).
/// The current world→screen mapping is inverted at the boundary corners to
/// recover the visible world rectangle; that rectangle is then fit inside
/// the output area with a uniform scale (never distorting, possibly
/// underfilling one axis) and centered.
pub fn derive_export_transform(
    boundary: &Rect,
    view: &ViewState,
    canvas: Size,
    output_area: &Rect,
) -> Result<ExportTransform, TransformError> {
    if view.scale <= 0.0 {
        return Err(TransformError::NonPositiveScale(view.scale));
    }
    if output_area.width <= 0.0 || output_area.height <= 0.0 {
        return Err(TransformError::DegenerateOutput {
            width: output_area.width,
            height: output_area.height,
        });
    }

    // Invert the live mapping at the four boundary corners. The y flip
    // makes the screen-space top edge the world-space max y.
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for corner in boundary.corners() {
        let w = view.screen_to_world(canvas, corner);
        min_x = min_x.min(w.x);
        max_x = max_x.max(w.x);
        min_y = min_y.min(w.y);
        max_y = max_y.max(w.y);
    }

    let data_width = max_x - min_x;
    let data_height = max_y - min_y;
    if data_width <= 0.0 || data_height <= 0.0 {
        // Nothing valid to export.
        return Err(TransformError::DegenerateBounds {
            width: data_width,
            height: data_height,
        });
    }

    let scale = (output_area.width / data_width).min(output_area.height / data_height);
    let scaled_width = data_width * scale;
    let scaled_height = data_height * scale;
    let offset = Point::new(
        output_area.x + (output_area.width - scaled_width) / 2.0,
        output_area.y + (output_area.height - scaled_height) / 2.0,
    );
    let centroid = Point::new(min_x + data_width / 2.0, min_y + data_height / 2.0);

    Ok(ExportTransform {
        params: TransformParams {
            scale,
            offset,
            centroid,
        },
        scaled_width,
        scaled_height,
        world_bounds: Rect::new(min_x, min_y, data_width, data_height),
    })
}
