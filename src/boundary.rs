//! Boundary service – maps the resolved page layout into interactive-canvas
//! pixel space for the on-screen preview, and derives the print boundary
//! that WYSIWYG capture keys off.
//!
//! The page is aspect-fit into the canvas minus a uniform margin, centered,
//! and every millimetre rectangle is carried across with one scale factor.
//! `scale_x` and `scale_y` are equal by construction of the fit; they are
//! kept separate for clarity at the call sites.

use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Size};
use crate::zone::{ResolvedCell, ResolvedLayout};

/// The full-page preview in canvas-pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct FullPreview {
    /// The page outline.
    pub page: Rect,
    /// The map zone.
    pub map: Rect,
    /// The print-safe inner rectangle of the map zone.
    pub map_inner: Rect,
    /// The footer zone outline.
    pub footer: Rect,
    /// Every footer cell, rectangles in canvas pixels.
    pub footer_cells: Vec<ResolvedCell>,
    /// Footer section row outlines, top to bottom.
    pub title_rows: Vec<Rect>,
    pub scale_x: f64,
    pub scale_y: f64,
}

/// The boundary the capture pipeline treats uniformly: outer map zone,
/// print-safe inner rectangle, and the margin as a fraction of the outer
/// width — regardless of whether the margin came from a template constant
/// or a computed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrintBoundary {
    pub outer: Rect,
    pub inner: Rect,
    pub margin_percent: f64,
}

/// Aspect-fit the resolved layout into `canvas` minus `margin` px per side
/// and map every rectangle into canvas pixels. `None` when the canvas is
/// too small to hold any preview.
pub fn compute_full_preview(
    layout: &ResolvedLayout,
    canvas: Size,
    margin: f64,
) -> Option<FullPreview> {
    let avail_w = canvas.width - 2.0 * margin;
    let avail_h = canvas.height - 2.0 * margin;
    if avail_w <= 0.0 || avail_h <= 0.0 {
        return None;
    }

    let aspect = layout.page.aspect_ratio();
    // Wider-than-page canvas: height is the binding constraint.
    let (preview_w, preview_h) = if avail_w / avail_h > aspect {
        (avail_h * aspect, avail_h)
    } else {
        (avail_w, avail_w / aspect)
    };

    let origin_x = (canvas.width - preview_w) / 2.0;
    let origin_y = (canvas.height - preview_h) / 2.0;
    let scale_x = preview_w / layout.page.width;
    let scale_y = preview_h / layout.page.height;

    let to_px = |r: &Rect| -> Rect {
        Rect::new(
            origin_x + r.x * scale_x,
            origin_y + r.y * scale_y,
            r.width * scale_x,
            r.height * scale_y,
        )
    };

    let page = Rect::new(origin_x, origin_y, preview_w, preview_h);
    let footer_cells = layout
        .footer_sections
        .iter()
        .flat_map(|section| section.cells.iter())
        .map(|cell| ResolvedCell {
            id: cell.id.clone(),
            content: cell.content.clone(),
            label: cell.label.clone(),
            rect: to_px(&cell.rect),
        })
        .collect();
    let title_rows = layout
        .footer_sections
        .iter()
        .map(|section| to_px(&section.rect))
        .collect();

    Some(FullPreview {
        page,
        map: to_px(&layout.map.outer),
        map_inner: to_px(&layout.map.inner),
        footer: to_px(&layout.footer),
        footer_cells,
        title_rows,
        scale_x,
        scale_y,
    })
}

/// Derive the print boundary from the preview. The margin fraction is
/// recovered from the mapped rectangles so downstream capture code never
/// needs to know where the safe margin came from.
pub fn print_boundary(layout: &ResolvedLayout, canvas: Size, margin: f64) -> Option<PrintBoundary> {
    let preview = compute_full_preview(layout, canvas, margin)?;
    let outer = preview.map;
    let inner = preview.map_inner;
    if outer.width <= 0.0 {
        return None;
    }
    Some(PrintBoundary {
        outer,
        inner,
        margin_percent: (inner.x - outer.x) / outer.width,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PrintSettings;
    use crate::template::TemplateCatalog;
    use crate::zone::resolve_layout;

    fn layout() -> ResolvedLayout {
        let catalog = TemplateCatalog::builtin();
        let settings = PrintSettings::default(); // A4 landscape, 2D
        let template = catalog
            .get(settings.render_mode, settings.orientation)
            .unwrap();
        resolve_layout(template, settings.page_size())
    }

    #[test]
    fn preview_preserves_page_aspect() {
        let layout = layout();
        for canvas in [
            Size::new(1920.0, 1080.0),
            Size::new(800.0, 1200.0),
            Size::new(500.0, 500.0),
        ] {
            let p = compute_full_preview(&layout, canvas, 20.0).unwrap();
            let page_aspect = layout.page.aspect_ratio();
            let preview_aspect = p.page.width / p.page.height;
            assert!(
                (page_aspect - preview_aspect).abs() < 1e-9,
                "aspect drifted for canvas {canvas:?}"
            );
            assert!((p.scale_x - p.scale_y).abs() < 1e-9);
        }
    }

    #[test]
    fn preview_is_centered_within_canvas() {
        let layout = layout();
        let canvas = Size::new(1600.0, 900.0);
        let p = compute_full_preview(&layout, canvas, 24.0).unwrap();
        let left = p.page.x;
        let right = canvas.width - p.page.right();
        let top = p.page.y;
        let bottom = canvas.height - p.page.bottom();
        assert!((left - right).abs() < 1e-9);
        assert!((top - bottom).abs() < 1e-9);
        assert!(p.page.width <= canvas.width - 2.0 * 24.0 + 1e-9);
    }

    #[test]
    fn zones_stay_inside_the_page_outline() {
        let layout = layout();
        let p = compute_full_preview(&layout, Size::new(1280.0, 800.0), 16.0).unwrap();
        assert!(p.page.contains_rect(&p.map));
        assert!(p.map.contains_rect(&p.map_inner));
        assert!(p.page.contains_rect(&p.footer));
        for cell in &p.footer_cells {
            assert!(
                p.footer.contains_rect(&cell.rect),
                "cell '{}' escapes the footer",
                cell.id
            );
        }
    }

    #[test]
    fn boundary_margin_percent_matches_template() {
        let layout = layout();
        let b = print_boundary(&layout, Size::new(1280.0, 800.0), 16.0).unwrap();
        assert!(b.outer.contains_rect(&b.inner));
        // The 2D templates declare print_safe_margin = 0.02.
        assert!((b.margin_percent - 0.02).abs() < 1e-9);
    }

    #[test]
    fn tiny_canvas_yields_no_preview() {
        let layout = layout();
        assert!(compute_full_preview(&layout, Size::new(20.0, 20.0), 16.0).is_none());
        assert!(print_boundary(&layout, Size::new(10.0, 10.0), 16.0).is_none());
    }
}
