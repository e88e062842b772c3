//! Vector backend – emits the plot as PDF drawing ops via `printpdf`
//! (v0.8 ops-based API).
//!
//! Composer coordinates arrive in page millimetres with a top-left origin;
//! PDF pages have a bottom-left origin, so every y is flipped against the
//! page height. Apart from that fixed device mapping the backend does no
//! geometry of its own.

use std::collections::HashMap;

use printpdf::*;

use crate::backend::{Color as RgbaColor, RenderBackend};
use crate::content::CaptureImage;
use crate::error::ExportError;
use crate::geometry::{PageSize, Point as MmPoint, Rect};

/// pt → mm factor; 1 pt = 1/72 inch.
const MM_PER_PT: f32 = 0.352778;

#[derive(Clone)]
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// PDF op-stream sink for one plot page.
pub struct VectorBackend {
    page: PageSize,
    doc: PdfDocument,
    ops: Vec<Op>,
    images: HashMap<Vec<u8>, ImageResource>,
    img_warnings: Vec<PdfWarnMsg>,
}

impl VectorBackend {
    pub fn new(page: PageSize, title: &str) -> Self {
        Self {
            page,
            doc: PdfDocument::new(title),
            ops: Vec::new(),
            images: HashMap::new(),
            img_warnings: Vec::new(),
        }
    }

    fn pt(&self, mm: f64) -> Pt {
        Pt(mm as f32 / MM_PER_PT)
    }

    /// Flip a top-left-origin y into PDF space.
    fn pdf_y(&self, y_mm: f64) -> Pt {
        self.pt(self.page.height - y_mm)
    }

    fn rgb(color: RgbaColor) -> Color {
        Color::Rgb(Rgb {
            r: color[0],
            g: color[1],
            b: color[2],
            icc_profile: None,
        })
    }

    fn line_points(&self, points: &[MmPoint]) -> Vec<LinePoint> {
        points
            .iter()
            .map(|p| LinePoint {
                p: Point {
                    x: self.pt(p.x),
                    y: self.pdf_y(p.y),
                },
                bezier: false,
            })
            .collect()
    }

    fn stroke_ops(&mut self, color: RgbaColor, width_mm: f64) {
        self.ops.push(Op::SetOutlineColor {
            col: Self::rgb(color),
        });
        self.ops.push(Op::SetOutlineThickness {
            pt: self.pt(width_mm),
        });
    }

    /// Register an image XObject once per unique byte string.
    fn image_resource(&mut self, image: &CaptureImage) -> Option<ImageResource> {
        if !self.images.contains_key(&image.bytes) {
            let raw = match RawImage::decode_from_bytes(&image.bytes, &mut self.img_warnings) {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("skipping capture image, PDF encode error: {e}");
                    return None;
                }
            };
            let xobj_id = self.doc.add_image(&raw);
            self.images.insert(
                image.bytes.clone(),
                ImageResource {
                    xobj_id,
                    px_width: image.px_width,
                    px_height: image.px_height,
                },
            );
        }
        self.images.get(&image.bytes).cloned()
    }
}

impl RenderBackend for VectorBackend {
    fn fill_rect(&mut self, rect: &Rect, color: RgbaColor) {
        self.ops.push(Op::SetFillColor {
            col: Self::rgb(color),
        });
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: self.line_points(&rect.corners()),
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    fn stroke_rect(&mut self, rect: &Rect, color: RgbaColor, width_mm: f64) {
        self.stroke_ops(color, width_mm);
        self.ops.push(Op::DrawLine {
            line: Line {
                points: self.line_points(&rect.corners()),
                is_closed: true,
            },
        });
    }

    fn line(&mut self, from: MmPoint, to: MmPoint, color: RgbaColor, width_mm: f64) {
        self.stroke_ops(color, width_mm);
        self.ops.push(Op::DrawLine {
            line: Line {
                points: self.line_points(&[from, to]),
                is_closed: false,
            },
        });
    }

    fn polyline(&mut self, points: &[MmPoint], closed: bool, color: RgbaColor, width_mm: f64) {
        if points.len() < 2 {
            return;
        }
        self.stroke_ops(color, width_mm);
        self.ops.push(Op::DrawLine {
            line: Line {
                points: self.line_points(points),
                is_closed: closed,
            },
        });
    }

    fn circle(
        &mut self,
        center: MmPoint,
        radius_mm: f64,
        color: RgbaColor,
        filled: bool,
        width_mm: f64,
    ) {
        // 32-gon approximation; at plot scale the deviation is far below
        // printer resolution.
        let points: Vec<MmPoint> = (0..32)
            .map(|i| {
                let angle = i as f64 / 32.0 * std::f64::consts::TAU;
                MmPoint::new(
                    center.x + radius_mm * angle.cos(),
                    center.y + radius_mm * angle.sin(),
                )
            })
            .collect();
        if filled {
            self.ops.push(Op::SetFillColor {
                col: Self::rgb(color),
            });
            self.ops.push(Op::DrawPolygon {
                polygon: Polygon {
                    rings: vec![PolygonRing {
                        points: self.line_points(&points),
                    }],
                    mode: PaintMode::Fill,
                    winding_order: WindingOrder::NonZero,
                },
            });
        } else {
            self.stroke_ops(color, width_mm);
            self.ops.push(Op::DrawLine {
                line: Line {
                    points: self.line_points(&points),
                    is_closed: true,
                },
            });
        }
    }

    fn text(&mut self, anchor: MmPoint, text: &str, size_mm: f64, color: RgbaColor) {
        if text.is_empty() {
            return;
        }
        let font = BuiltinFont::Helvetica;
        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetTextCursor {
            pos: Point {
                x: self.pt(anchor.x),
                y: self.pdf_y(anchor.y),
            },
        });
        self.ops.push(Op::SetFontSizeBuiltinFont {
            size: self.pt(size_mm),
            font,
        });
        self.ops.push(Op::SetFillColor {
            col: Self::rgb(color),
        });
        self.ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(to_winansi(text))],
            font,
        });
        self.ops.push(Op::EndTextSection);
    }

    fn image(&mut self, rect: &Rect, image: &CaptureImage) {
        let Some(res) = self.image_resource(image) else {
            return;
        };
        // At dpi=72 printpdf renders 1 px = 1 pt, so scale = target_pt / px.
        let scale_x = if res.px_width > 0 {
            (rect.width as f32 / MM_PER_PT) / res.px_width as f32
        } else {
            1.0
        };
        let scale_y = if res.px_height > 0 {
            (rect.height as f32 / MM_PER_PT) / res.px_height as f32
        } else {
            1.0
        };
        let translate_x = Some(self.pt(rect.x));
        let translate_y = Some(self.pdf_y(rect.bottom()));
        self.ops.push(Op::UseXobject {
            id: res.xobj_id,
            transform: XObjectTransform {
                translate_x,
                translate_y,
                dpi: Some(72.0),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                rotate: None,
            },
        });
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, ExportError> {
        let mut doc = self.doc;
        let page = PdfPage::new(
            Mm(self.page.width as f32),
            Mm(self.page.height as f32),
            self.ops,
        );
        doc.with_pages(vec![page]);
        let bytes = doc.save(&PdfSaveOptions::default(), &mut Vec::new());
        Ok(bytes)
    }
}

/// Builtin fonts use WinAnsiEncoding; map the typographic characters a plot
/// footer actually contains and replace the rest of the non-Latin-1 range.
fn to_winansi(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{00A0}' => 0x20, // non-breaking space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // Intentionally non-UTF-8 for 0x80-0x9F; printpdf writes the bytes
    // straight into the stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}
