//! Render-backend contract and the shared composer.
//!
//! Both output surfaces (raster bitmap, vector PDF) implement
//! [`RenderBackend`]: primitive sinks taking page-millimetre coordinates
//! with a top-left origin. A backend owns only *how* a rectangle, line,
//! circle, glyph, or image is emitted — never *where*. Placement lives
//! here, in the composer functions, which walk the resolved layout and the
//! scene exactly once per export and feed both backends identical numbers.
//! Neither backend ever recomputes scale or offset; that is the whole of
//! the WYSIWYG parity contract.

use crate::content::{CaptureImage, ContentProvider};
use crate::error::ExportError;
use crate::geometry::{Point, Rect};
use crate::scene::{Entity, Scene};
use crate::template::CellContent;
use crate::transform::ExportTransform;
use crate::zone::ResolvedLayout;

/// RGBA color, components in [0, 1].
pub type Color = [f32; 4];

pub const WHITE: Color = [1.0, 1.0, 1.0, 1.0];
pub const BLACK: Color = [0.0, 0.0, 0.0, 1.0];
pub const FRAME_GRAY: Color = [0.45, 0.45, 0.45, 1.0];
pub const LABEL_GRAY: Color = [0.55, 0.55, 0.55, 1.0];
pub const DATA_GRAY: Color = [0.25, 0.25, 0.25, 1.0];
pub const HOLE_RED: Color = [0.78, 0.12, 0.12, 1.0];

/// Hole markers are drawn at physical size but never smaller than this —
/// a 115 mm bit at 1:500 would otherwise vanish.
const MIN_HOLE_RADIUS_MM: f64 = 1.2;

/// Stroke widths in output millimetres.
const FRAME_WIDTH_MM: f64 = 0.5;
const CELL_WIDTH_MM: f64 = 0.2;
const DATA_WIDTH_MM: f64 = 0.35;

/// A drawing sink. All coordinates are page millimetres, top-left origin;
/// the backend maps them to its device space with a fixed device scale
/// (px/mm for raster, pt/mm for vector) and nothing else.
pub trait RenderBackend {
    fn fill_rect(&mut self, rect: &Rect, color: Color);
    fn stroke_rect(&mut self, rect: &Rect, color: Color, width_mm: f64);
    fn line(&mut self, from: Point, to: Point, color: Color, width_mm: f64);
    fn polyline(&mut self, points: &[Point], closed: bool, color: Color, width_mm: f64);
    fn circle(&mut self, center: Point, radius_mm: f64, color: Color, filled: bool, width_mm: f64);
    /// `anchor` is the text baseline start; `size_mm` the cap height.
    fn text(&mut self, anchor: Point, text: &str, size_mm: f64, color: Color);
    /// Embed an opaque raster asset into `rect` (already aspect-fit).
    fn image(&mut self, rect: &Rect, image: &CaptureImage);
    /// Consume the backend and produce the encoded output bytes.
    fn finish(self: Box<Self>) -> Result<Vec<u8>, ExportError>;
}

/// Aspect-fit an intrinsic pixel size into a target rectangle, centered.
/// Shared rectangle math so raster and vector place assets identically.
pub fn aspect_fit(px_width: u32, px_height: u32, target: &Rect) -> Rect {
    if px_width == 0 || px_height == 0 || target.width <= 0.0 || target.height <= 0.0 {
        return *target;
    }
    let aspect = px_width as f64 / px_height as f64;
    let (w, h) = if target.width / target.height > aspect {
        (target.height * aspect, target.height)
    } else {
        (target.width, target.width / aspect)
    };
    Rect::new(
        target.x + (target.width - w) / 2.0,
        target.y + (target.height - h) / 2.0,
        w,
        h,
    )
}

/// Stage 3: page background and zone fills.
pub fn draw_background(backend: &mut dyn RenderBackend, layout: &ResolvedLayout) {
    let page = Rect::new(0.0, 0.0, layout.page.width, layout.page.height);
    backend.fill_rect(&page, WHITE);
}

/// Stage 4: zone borders, footer rows, cell chrome and cell content.
pub fn draw_frame(
    backend: &mut dyn RenderBackend,
    layout: &ResolvedLayout,
    content: &dyn ContentProvider,
) {
    backend.stroke_rect(&layout.map.outer, BLACK, FRAME_WIDTH_MM);
    backend.stroke_rect(&layout.map.inner, FRAME_GRAY, CELL_WIDTH_MM);
    backend.stroke_rect(&layout.footer, BLACK, FRAME_WIDTH_MM);

    for section in &layout.footer_sections {
        backend.stroke_rect(&section.rect, FRAME_GRAY, CELL_WIDTH_MM);
        for cell in &section.cells {
            backend.stroke_rect(&cell.rect, FRAME_GRAY, CELL_WIDTH_MM);
            if let Some(label) = &cell.label {
                backend.text(
                    Point::new(cell.rect.x + 1.5, cell.rect.y + 4.0),
                    label,
                    2.2,
                    LABEL_GRAY,
                );
            }
            draw_cell_content(backend, cell.rect, &cell.id, &cell.content, content);
        }
    }
}

fn draw_cell_content(
    backend: &mut dyn RenderBackend,
    rect: Rect,
    id: &str,
    cell: &CellContent,
    content: &dyn ContentProvider,
) {
    match cell {
        CellContent::Stat => {
            let text = content.cell_text(id).unwrap_or_else(|| "-".to_string());
            backend.text(
                Point::new(rect.x + 1.5, rect.y + rect.height * 0.72),
                &text,
                3.0,
                BLACK,
            );
        }
        CellContent::Label(text) => {
            backend.text(
                Point::new(rect.x + 1.5, rect.y + rect.height * 0.72),
                text,
                3.0,
                BLACK,
            );
        }
        CellContent::Capture(kind) => match content.capture(*kind) {
            Some(img) => {
                let target = aspect_fit(img.px_width, img.px_height, &rect.inset(1.0));
                backend.image(&target, &img);
            }
            None => {
                // Asset errors are non-fatal: log and fall back to text.
                log::warn!("capture asset {kind:?} missing for cell '{id}', drawing fallback");
                backend.text(
                    Point::new(rect.x + rect.width * 0.4, rect.y + rect.height * 0.6),
                    kind.fallback_text(),
                    4.0,
                    LABEL_GRAY,
                );
            }
        },
    }
}

/// Stage 5: world data through the committed transform.
///
/// The visible world rectangle maps exactly onto the transform's content
/// rect, so clipping against it reproduces the on-screen print-boundary
/// clip. Point entities are filtered per point; polylines per segment.
pub fn draw_data(backend: &mut dyn RenderBackend, transform: &ExportTransform, scene: &Scene) {
    let clip = transform.content_rect();

    for entity in &scene.entities {
        match entity {
            Entity::Hole(hole) => {
                let collar = transform.world_to_output(hole.collar.x, hole.collar.y);
                if !clip.contains_point(collar) {
                    continue;
                }
                if let Some(toe) = &hole.toe {
                    let toe_pt = transform.world_to_output(toe.x, toe.y);
                    if clip.contains_point(toe_pt) {
                        backend.line(collar, toe_pt, HOLE_RED, DATA_WIDTH_MM * 0.6);
                    }
                }
                let radius =
                    (hole.diameter_mm / 2000.0 * transform.params.scale).max(MIN_HOLE_RADIUS_MM);
                backend.circle(collar, radius, HOLE_RED, false, DATA_WIDTH_MM);
                if let Some(label) = &hole.label {
                    backend.text(
                        Point::new(collar.x + radius + 0.8, collar.y + 1.0),
                        label,
                        2.5,
                        DATA_GRAY,
                    );
                }
            }
            Entity::Polyline { points, closed } => {
                let projected: Vec<Point> = points
                    .iter()
                    .map(|p| transform.world_to_output(p.x, p.y))
                    .collect();
                draw_clipped_polyline(backend, &projected, *closed, &clip);
            }
            Entity::Text {
                position,
                text,
                size,
            } => {
                let anchor = transform.world_to_output(position.x, position.y);
                if clip.contains_point(anchor) {
                    backend.text(anchor, text, size * transform.params.scale, DATA_GRAY);
                }
            }
        }
    }
}

/// Emit only the segments whose both endpoints are inside the clip rect.
/// Coarse, but identical for every backend because it happens here.
fn draw_clipped_polyline(
    backend: &mut dyn RenderBackend,
    points: &[Point],
    closed: bool,
    clip: &Rect,
) {
    if points.len() < 2 {
        return;
    }
    if points.iter().all(|p| clip.contains_point(*p)) {
        backend.polyline(points, closed, DATA_GRAY, DATA_WIDTH_MM);
        return;
    }
    let mut segments: Vec<(Point, Point)> = points.windows(2).map(|w| (w[0], w[1])).collect();
    if closed {
        segments.push((points[points.len() - 1], points[0]));
    }
    for (a, b) in segments {
        if clip.contains_point(a) && clip.contains_point(b) {
            backend.line(a, b, DATA_GRAY, DATA_WIDTH_MM);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_fit_centers_wide_image_in_tall_cell() {
        let target = Rect::new(10.0, 10.0, 20.0, 40.0);
        let fitted = aspect_fit(200, 100, &target);
        assert!((fitted.width - 20.0).abs() < 1e-9);
        assert!((fitted.height - 10.0).abs() < 1e-9);
        assert!((fitted.y - 25.0).abs() < 1e-9, "vertically centered");
        assert!(target.contains_rect(&fitted));
    }

    #[test]
    fn aspect_fit_degenerate_input_returns_target() {
        let target = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(aspect_fit(0, 100, &target), target);
    }
}
