//! Raster backend – renders the plot into a tiny-skia pixmap and encodes
//! it as PNG.
//!
//! The device mapping is a single constant: pixels per millimetre from the
//! requested DPI. Everything else — placement, sizes, clipping — arrives
//! from the composer already decided. The target is sized and validated
//! before any drawing begins; an oversized paper/DPI combination aborts
//! with an error naming the offending paper size.

use std::io::Cursor;
use std::sync::OnceLock;

use rusttype::{point as rt_point, Font, Scale};
use tiny_skia::{
    FillRule, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

use crate::backend::{Color, RenderBackend};
use crate::content::CaptureImage;
use crate::error::ExportError;
use crate::geometry::{PageSize, Point, Rect};

/// Maximum device-pixel dimension of the raster target.
pub const MAX_RASTER_DIM: u32 = 10_000;

/// Glyph cap height is roughly 0.72 em for the sans faces we query.
const CAP_HEIGHT_EM: f64 = 0.72;

/// Bitmap sink for one plot page.
#[derive(Debug)]
pub struct RasterBackend {
    pixmap: Pixmap,
    px_per_mm: f32,
}

impl RasterBackend {
    /// Allocate and validate the raster target. The resource-limit check
    /// runs here, before any drawing: `paper_label` names the offending
    /// paper size in the error.
    pub fn new(page: PageSize, dpi: f64, paper_label: &str) -> Result<Self, ExportError> {
        let px_per_mm = dpi / 25.4;
        let width_px = (page.width * px_per_mm).round() as u32;
        let height_px = (page.height * px_per_mm).round() as u32;
        if width_px == 0 || height_px == 0 || width_px > MAX_RASTER_DIM || height_px > MAX_RASTER_DIM
        {
            return Err(ExportError::RasterTooLarge {
                paper: paper_label.to_string(),
                dpi,
                width_px,
                height_px,
                max_px: MAX_RASTER_DIM,
            });
        }
        let pixmap = Pixmap::new(width_px, height_px)
            .ok_or_else(|| ExportError::Backend("pixmap allocation failed".to_string()))?;
        Ok(Self {
            pixmap,
            px_per_mm: px_per_mm as f32,
        })
    }

    pub fn width_px(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height_px(&self) -> u32 {
        self.pixmap.height()
    }

    fn px(&self, mm: f64) -> f32 {
        mm as f32 * self.px_per_mm
    }

    fn paint(color: Color) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(
            tiny_skia::Color::from_rgba(
                color[0].clamp(0.0, 1.0),
                color[1].clamp(0.0, 1.0),
                color[2].clamp(0.0, 1.0),
                color[3].clamp(0.0, 1.0),
            )
            .unwrap_or(tiny_skia::Color::BLACK),
        );
        paint.anti_alias = true;
        paint
    }

    fn rect_path(&self, rect: &Rect) -> Option<tiny_skia::Path> {
        let r = tiny_skia::Rect::from_xywh(
            self.px(rect.x),
            self.px(rect.y),
            self.px(rect.width),
            self.px(rect.height),
        )?;
        Some(PathBuilder::from_rect(r))
    }

    fn stroke(&self, width_mm: f64) -> Stroke {
        Stroke {
            width: self.px(width_mm).max(1.0),
            ..Default::default()
        }
    }

    /// Source-over blend of one glyph coverage sample.
    fn blend_pixel(&mut self, x: i32, y: i32, color: Color, coverage: f32) {
        if x < 0 || y < 0 || x >= self.pixmap.width() as i32 || y >= self.pixmap.height() as i32 {
            return;
        }
        let idx = (y as usize * self.pixmap.width() as usize + x as usize) * 4;
        let data = self.pixmap.data_mut();
        let a = (color[3] * coverage).clamp(0.0, 1.0);
        for c in 0..3 {
            let src = color[c] * a;
            let dst = data[idx + c] as f32 / 255.0;
            data[idx + c] = ((src + dst * (1.0 - a)) * 255.0).round() as u8;
        }
        let dst_a = data[idx + 3] as f32 / 255.0;
        data[idx + 3] = ((a + dst_a * (1.0 - a)) * 255.0).round() as u8;
    }
}

impl RenderBackend for RasterBackend {
    fn fill_rect(&mut self, rect: &Rect, color: Color) {
        if let Some(path) = self.rect_path(rect) {
            self.pixmap.fill_path(
                &path,
                &Self::paint(color),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    fn stroke_rect(&mut self, rect: &Rect, color: Color, width_mm: f64) {
        if let Some(path) = self.rect_path(rect) {
            let stroke = self.stroke(width_mm);
            self.pixmap.stroke_path(
                &path,
                &Self::paint(color),
                &stroke,
                Transform::identity(),
                None,
            );
        }
    }

    fn line(&mut self, from: Point, to: Point, color: Color, width_mm: f64) {
        let mut pb = PathBuilder::new();
        pb.move_to(self.px(from.x), self.px(from.y));
        pb.line_to(self.px(to.x), self.px(to.y));
        if let Some(path) = pb.finish() {
            let stroke = self.stroke(width_mm);
            self.pixmap.stroke_path(
                &path,
                &Self::paint(color),
                &stroke,
                Transform::identity(),
                None,
            );
        }
    }

    fn polyline(&mut self, points: &[Point], closed: bool, color: Color, width_mm: f64) {
        if points.len() < 2 {
            return;
        }
        let mut pb = PathBuilder::new();
        pb.move_to(self.px(points[0].x), self.px(points[0].y));
        for p in &points[1..] {
            pb.line_to(self.px(p.x), self.px(p.y));
        }
        if closed {
            pb.close();
        }
        if let Some(path) = pb.finish() {
            let stroke = self.stroke(width_mm);
            self.pixmap.stroke_path(
                &path,
                &Self::paint(color),
                &stroke,
                Transform::identity(),
                None,
            );
        }
    }

    fn circle(&mut self, center: Point, radius_mm: f64, color: Color, filled: bool, width_mm: f64) {
        let Some(path) =
            PathBuilder::from_circle(self.px(center.x), self.px(center.y), self.px(radius_mm))
        else {
            return;
        };
        if filled {
            self.pixmap.fill_path(
                &path,
                &Self::paint(color),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        } else {
            let stroke = self.stroke(width_mm);
            self.pixmap.stroke_path(
                &path,
                &Self::paint(color),
                &stroke,
                Transform::identity(),
                None,
            );
        }
    }

    fn text(&mut self, anchor: Point, text: &str, size_mm: f64, color: Color) {
        let Some(font) = plot_font() else {
            log::warn!("no system sans font available, skipping raster text '{text}'");
            return;
        };
        let scale = Scale::uniform(self.px(size_mm / CAP_HEIGHT_EM));
        let start = rt_point(self.px(anchor.x), self.px(anchor.y));
        let glyphs: Vec<_> = font.layout(text, scale, start).collect();
        for glyph in glyphs {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, v| {
                    self.blend_pixel(bb.min.x + gx as i32, bb.min.y + gy as i32, color, v);
                });
            }
        }
    }

    fn image(&mut self, rect: &Rect, image: &CaptureImage) {
        let decoded = match image::load_from_memory(&image.bytes) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                log::warn!("skipping capture image, decode error: {e}");
                return;
            }
        };
        let (w, h) = (decoded.width(), decoded.height());
        let mut data = decoded.into_raw();
        // tiny-skia wants premultiplied RGBA.
        for px in data.chunks_exact_mut(4) {
            let a = px[3] as u16;
            px[0] = (px[0] as u16 * a / 255) as u8;
            px[1] = (px[1] as u16 * a / 255) as u8;
            px[2] = (px[2] as u16 * a / 255) as u8;
        }
        let Some(size) = IntSize::from_wh(w, h) else {
            return;
        };
        let Some(src) = Pixmap::from_vec(data, size) else {
            return;
        };
        let sx = self.px(rect.width) / w as f32;
        let sy = self.px(rect.height) / h as f32;
        let transform =
            Transform::from_scale(sx, sy).post_translate(self.px(rect.x), self.px(rect.y));
        self.pixmap.draw_pixmap(
            0,
            0,
            src.as_ref(),
            &PixmapPaint::default(),
            transform,
            None,
        );
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, ExportError> {
        let width = self.pixmap.width();
        let height = self.pixmap.height();
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for px in self.pixmap.pixels() {
            let c = px.demultiply();
            rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        let buffer = image::RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| ExportError::Backend("raster buffer size mismatch".to_string()))?;
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(buffer)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| ExportError::Backend(format!("PNG encode failed: {e}")))?;
        Ok(bytes)
    }
}

/// Default plot face: the system sans-serif, loaded once. `None` when the
/// host has no usable system fonts; raster text is then skipped (the
/// parity contract compares placement, not glyph pixels).
fn plot_font() -> Option<&'static Font<'static>> {
    static FONT: OnceLock<Option<Font<'static>>> = OnceLock::new();
    FONT.get_or_init(load_system_sans).as_ref()
}

fn load_system_sans() -> Option<Font<'static>> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let query = fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        weight: fontdb::Weight::NORMAL,
        stretch: fontdb::Stretch::Normal,
        style: fontdb::Style::Normal,
    };
    let id = db.query(&query)?;
    let (source, index) = db.face_source(id)?;
    let data: Vec<u8> = match source {
        fontdb::Source::Binary(bin) => bin.as_ref().as_ref().to_vec(),
        fontdb::Source::File(path) => std::fs::read(path).ok()?,
        fontdb::Source::SharedFile(path, _) => std::fs::read(path).ok()?,
    };
    Font::try_from_vec_and_index(data, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BLACK, WHITE};

    fn a4_landscape() -> PageSize {
        PageSize::new(297.0, 210.0)
    }

    #[test]
    fn target_dimensions_follow_dpi() {
        let b = RasterBackend::new(a4_landscape(), 150.0, "A4 landscape").unwrap();
        // 297mm at 150dpi = 1754 px.
        assert_eq!(b.width_px(), 1754);
        assert_eq!(b.height_px(), 1240);
    }

    #[test]
    fn oversized_target_is_rejected_before_drawing() {
        let err = RasterBackend::new(PageSize::new(1189.0, 841.0), 600.0, "A0 landscape")
            .unwrap_err();
        match err {
            ExportError::RasterTooLarge { paper, .. } => assert_eq!(paper, "A0 landscape"),
            other => panic!("expected RasterTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn finish_encodes_png() {
        let mut b = RasterBackend::new(a4_landscape(), 50.0, "A4 landscape").unwrap();
        b.fill_rect(&Rect::new(0.0, 0.0, 297.0, 210.0), WHITE);
        b.circle(Point::new(50.0, 50.0), 3.0, BLACK, false, 0.5);
        let bytes = Box::new(b).finish().unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn drawing_is_deterministic() {
        let render = || {
            let mut b = RasterBackend::new(a4_landscape(), 50.0, "A4 landscape").unwrap();
            b.fill_rect(&Rect::new(0.0, 0.0, 297.0, 210.0), WHITE);
            b.line(Point::new(10.0, 10.0), Point::new(200.0, 120.0), BLACK, 0.35);
            Box::new(b).finish().unwrap()
        };
        assert_eq!(render(), render());
    }
}
