//! Integration tests for the blastprint pipeline.
//!
//! These tests validate:
//! - Dimension resolution shorthands against known values
//! - Zone/cell geometry (containment, tiling, auto height)
//! - Preview aspect fit and the print boundary
//! - The WYSIWYG capture contract (round trip, fit-inside, purity)
//! - Raster/vector backend parity via recorded placement
//! - End-to-end PDF and PNG export

use sha2::{Digest, Sha256};

use blastprint::backend::{self, Color, RenderBackend};
use blastprint::boundary::{compute_full_preview, print_boundary};
use blastprint::content::{CaptureImage, StaticContent};
use blastprint::error::ExportError;
use blastprint::geometry::{PageSize, Point, Rect, Size};
use blastprint::pipeline::{export_plot, ExportConfig, OutputFormat};
use blastprint::scene::Scene;
use blastprint::settings::{Orientation, PaperSize, PrintSettings, RenderMode};
use blastprint::template::{CaptureKind, TemplateCatalog};
use blastprint::transform::{derive_export_transform, ViewState};
use blastprint::value::{resolve, Dim, Resolved};
use blastprint::zone::{resolve_layout, resolve_map_safe_area, LayoutCache};

// =====================================================================
// Helpers
// =====================================================================

/// 1x1 transparent PNG.
const TEST_PNG_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

fn assert_valid_png(bytes: &[u8]) {
    assert!(bytes.len() > 50, "PNG too small: {} bytes", bytes.len());
    assert_eq!(&bytes[1..4], b"PNG", "Missing PNG header");
}

fn demo_layout(settings: &PrintSettings) -> blastprint::zone::ResolvedLayout {
    let catalog = TemplateCatalog::builtin();
    let template = catalog
        .get(settings.render_mode, settings.orientation)
        .unwrap();
    resolve_layout(template, settings.page_size())
}

fn demo_view() -> ViewState {
    ViewState::new(8.0, Point::new(66.0, 22.0))
}

fn demo_config(format: OutputFormat) -> ExportConfig {
    ExportConfig {
        format,
        ..ExportConfig::default()
    }
}

/// Backend test double that records every primitive with full placement
/// precision. Backend parity is verified on these records, not on pixels.
#[derive(Default)]
struct RecordingBackend {
    commands: Vec<String>,
}

impl RecordingBackend {
    fn pt(p: Point) -> String {
        format!("({:.9},{:.9})", p.x, p.y)
    }

    fn rect(r: &Rect) -> String {
        format!("[{:.9},{:.9},{:.9},{:.9}]", r.x, r.y, r.width, r.height)
    }
}

impl RenderBackend for RecordingBackend {
    fn fill_rect(&mut self, rect: &Rect, color: Color) {
        self.commands.push(format!("fill {} {color:?}", Self::rect(rect)));
    }

    fn stroke_rect(&mut self, rect: &Rect, color: Color, width_mm: f64) {
        self.commands
            .push(format!("stroke {} {color:?} {width_mm}", Self::rect(rect)));
    }

    fn line(&mut self, from: Point, to: Point, color: Color, width_mm: f64) {
        self.commands.push(format!(
            "line {} {} {color:?} {width_mm}",
            Self::pt(from),
            Self::pt(to)
        ));
    }

    fn polyline(&mut self, points: &[Point], closed: bool, color: Color, width_mm: f64) {
        let pts: Vec<String> = points.iter().map(|p| Self::pt(*p)).collect();
        self.commands.push(format!(
            "polyline {} closed={closed} {color:?} {width_mm}",
            pts.join(" ")
        ));
    }

    fn circle(&mut self, center: Point, radius_mm: f64, color: Color, filled: bool, width_mm: f64) {
        self.commands.push(format!(
            "circle {} r={radius_mm:.9} filled={filled} {color:?} {width_mm}",
            Self::pt(center)
        ));
    }

    fn text(&mut self, anchor: Point, text: &str, size_mm: f64, color: Color) {
        self.commands.push(format!(
            "text {} {text:?} {size_mm:.9} {color:?}",
            Self::pt(anchor)
        ));
    }

    fn image(&mut self, rect: &Rect, image: &CaptureImage) {
        self.commands.push(format!(
            "image {} {}x{}",
            Self::rect(rect),
            image.px_width,
            image.px_height
        ));
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, ExportError> {
        Ok(self.commands.join("\n").into_bytes())
    }
}

// =====================================================================
// Dimension resolution
// =====================================================================

#[test]
fn resolver_shorthands_match_reference_values() {
    assert_eq!(resolve(&Dim::percent("50%"), 200.0), Resolved::Length(100.0));
    assert_eq!(resolve(&Dim::Length(-10.0), 200.0), Resolved::Length(190.0));
    assert_eq!(resolve(&Dim::Length(0.25), 200.0), Resolved::Length(50.0));
    assert_eq!(resolve(&Dim::Length(150.0), 200.0), Resolved::Length(150.0));
    assert_eq!(resolve(&Dim::auto(), 200.0), Resolved::Defer);
}

// =====================================================================
// Zone geometry
// =====================================================================

#[test]
fn a4_landscape_map_zone_reference_geometry() {
    let settings = PrintSettings::default(); // A4 landscape, 2D
    let layout = demo_layout(&settings);
    let map = layout.map.outer;
    assert!((map.x - 5.94).abs() < 1e-9);
    assert!((map.y - 4.2).abs() < 1e-9);
    assert!((map.width - 178.2).abs() < 1e-9);
    assert!((map.height - 201.6).abs() < 1e-9, "mirrored margins");
}

#[test]
fn every_builtin_template_produces_contained_geometry() {
    let catalog = TemplateCatalog::builtin();
    for template in catalog.all() {
        for paper in [PaperSize::A4, PaperSize::A3, PaperSize::A1, PaperSize::Letter] {
            let settings = PrintSettings {
                paper,
                orientation: template.orientation,
                render_mode: template.render_mode,
            };
            let layout = resolve_layout(template, settings.page_size());
            let page = Rect::new(0.0, 0.0, layout.page.width, layout.page.height);

            assert!(
                page.contains_rect(&layout.map.outer),
                "{}: map escapes {} page",
                template.name,
                paper.name()
            );
            assert!(layout.map.outer.contains_rect(&layout.map.inner));
            assert!(layout.map.inner.width > 0.0 && layout.map.inner.height > 0.0);
            assert!(page.contains_rect(&layout.footer));

            for section in &layout.footer_sections {
                assert!(
                    layout.footer.contains_rect(&section.rect),
                    "{}: section '{}' escapes the footer",
                    template.name,
                    section.name
                );
                for cell in &section.cells {
                    assert!(section.rect.contains_rect(&cell.rect));
                }
            }
        }
    }
}

#[test]
fn full_width_sections_tile_without_gaps() {
    let catalog = TemplateCatalog::builtin();
    for template in catalog.all() {
        let layout = resolve_layout(template, PageSize::new(297.0, 210.0));
        for (name, spec) in &template.footer_zone.sections {
            let sum: f64 = spec.cells.iter().map(|c| c.width_percent).sum();
            if (sum - 1.0).abs() > 1e-9 {
                continue;
            }
            let section = layout
                .footer_sections
                .iter()
                .find(|s| &s.name == name)
                .unwrap();
            let mut next_x = layout.footer.x;
            for cell in &section.cells {
                assert!(
                    (cell.rect.x - next_x).abs() < 1e-6,
                    "{}/{}: gap before '{}'",
                    template.name,
                    name,
                    cell.id
                );
                next_x = cell.rect.right();
            }
            assert!((next_x - layout.footer.right()).abs() < 1e-6);
        }
    }
}

#[test]
fn safe_area_containment_across_margin_range() {
    let outer = Rect::new(5.94, 4.2, 178.2, 201.6);
    for i in 0..50 {
        let margin = i as f64 * 0.01; // [0, 0.5)
        let safe = resolve_map_safe_area(&outer, margin);
        assert!(safe.outer.contains_rect(&safe.inner), "margin {margin}");
        assert!(safe.inner.width > 0.0);
        assert!(safe.inner.height > 0.0);
    }
}

#[test]
fn layout_cache_tracks_every_setting() {
    let catalog = TemplateCatalog::builtin();
    let mut cache = LayoutCache::new();
    assert!(cache.is_empty());

    let base = PrintSettings::default();
    let landscape_page = cache.layout(&catalog, &base).unwrap().page;

    let portrait = PrintSettings {
        orientation: Orientation::Portrait,
        ..base
    };
    let portrait_page = cache.layout(&catalog, &portrait).unwrap().page;
    assert!(portrait_page.height > portrait_page.width);
    assert!(landscape_page.width > landscape_page.height);

    let three_d = PrintSettings {
        render_mode: RenderMode::ThreeD,
        ..base
    };
    let name = cache.layout(&catalog, &three_d).unwrap().template_name.clone();
    assert!(name.contains("3d"), "expected 3D template, got '{name}'");
}

// =====================================================================
// Preview / boundary
// =====================================================================

#[test]
fn preview_fits_both_canvas_shapes() {
    let layout = demo_layout(&PrintSettings::default());
    // Proportionally wider than the page: fit by height.
    let wide = compute_full_preview(&layout, Size::new(3000.0, 800.0), 20.0).unwrap();
    assert!((wide.page.height - (800.0 - 40.0)).abs() < 1e-9);
    // Proportionally taller: fit by width.
    let tall = compute_full_preview(&layout, Size::new(600.0, 2000.0), 20.0).unwrap();
    assert!((tall.page.width - (600.0 - 40.0)).abs() < 1e-9);
}

#[test]
fn boundary_margin_is_uniform_for_capture() {
    let layout = demo_layout(&PrintSettings::default());
    let b = print_boundary(&layout, Size::new(1280.0, 800.0), 16.0).unwrap();
    assert!((b.margin_percent - 0.02).abs() < 1e-9);
    // Same fraction on screen as on paper.
    let paper_fraction = (layout.map.inner.x - layout.map.outer.x) / layout.map.outer.width;
    assert!((b.margin_percent - paper_fraction).abs() < 1e-9);
}

// =====================================================================
// Capture contract
// =====================================================================

#[test]
fn capture_round_trip_holds_against_real_boundary() {
    let settings = PrintSettings::default();
    let layout = demo_layout(&settings);
    let canvas = Size::new(1280.0, 800.0);
    let boundary = print_boundary(&layout, canvas, 16.0).unwrap();
    let view = demo_view();

    let t = derive_export_transform(&boundary.inner, &view, canvas, &layout.map.inner).unwrap();

    for &(x, y) in &[(10.0, 5.0), (66.0, 22.0), (120.0, 44.0), (0.1, 0.1)] {
        let out = t.world_to_output(x, y);
        let back = t.output_to_world(out.x, out.y);
        assert!((back.x - x).abs() < 1e-6);
        assert!((back.y - y).abs() < 1e-6);
    }

    // Fit-inside: the scaled content never overflows the print-safe area.
    assert!(t.scaled_width <= layout.map.inner.width + 1e-9);
    assert!(t.scaled_height <= layout.map.inner.height + 1e-9);
    assert!(layout.map.inner.contains_rect(&t.content_rect()));
}

#[test]
fn capture_is_pure_across_repeated_derivation() {
    let settings = PrintSettings::default();
    let layout = demo_layout(&settings);
    let canvas = Size::new(1280.0, 800.0);
    let boundary = print_boundary(&layout, canvas, 16.0).unwrap();
    let view = demo_view();

    let a = derive_export_transform(&boundary.inner, &view, canvas, &layout.map.inner).unwrap();
    let b = derive_export_transform(&boundary.inner, &view, canvas, &layout.map.inner).unwrap();
    assert_eq!(a.params, b.params);
}

// =====================================================================
// Backend parity
// =====================================================================

#[test]
fn composer_placement_is_identical_across_runs() {
    let settings = PrintSettings {
        render_mode: RenderMode::ThreeD,
        ..PrintSettings::default()
    };
    let layout = demo_layout(&settings);
    let canvas = Size::new(1280.0, 800.0);
    let boundary = print_boundary(&layout, canvas, 16.0).unwrap();
    let view = demo_view();
    let transform =
        derive_export_transform(&boundary.inner, &view, canvas, &layout.map.inner).unwrap();
    let scene = Scene::demo();
    let capture = blastprint::content::decode_data_uri(TEST_PNG_URI).unwrap();
    let content = StaticContent::demo(&scene, &settings)
        .with_capture(CaptureKind::NorthArrow, capture.clone())
        .with_capture(CaptureKind::QrCode, capture);

    let record = || {
        let mut rec = Box::<RecordingBackend>::default();
        backend::draw_background(rec.as_mut(), &layout);
        backend::draw_frame(rec.as_mut(), &layout, &content);
        backend::draw_data(rec.as_mut(), &transform, &scene);
        rec.finish().unwrap()
    };

    // Same resolved rects, same transform invocation: placement must be
    // byte-identical no matter which backend consumes it.
    assert_eq!(record(), record());
}

#[test]
fn raster_and_vector_commit_the_same_transform() {
    let catalog = TemplateCatalog::builtin();
    let scene = Scene::demo();
    let settings = PrintSettings::default();
    let content = StaticContent::demo(&scene, &settings);

    let pdf = export_plot(
        &catalog,
        demo_config(OutputFormat::Pdf),
        demo_view(),
        &scene,
        &content,
    )
    .unwrap();
    let png = export_plot(
        &catalog,
        demo_config(OutputFormat::Png { dpi: 96.0 }),
        demo_view(),
        &scene,
        &content,
    )
    .unwrap();

    // Identical inputs: bit-identical committed parameters and boundary.
    assert_eq!(pdf.params, png.params);
    assert_eq!(pdf.boundary, png.boundary);
}

// =====================================================================
// End-to-end export
// =====================================================================

#[test]
fn pdf_export_all_templates() {
    let catalog = TemplateCatalog::builtin();
    let scene = Scene::demo();
    for mode in [RenderMode::TwoD, RenderMode::ThreeD] {
        for orientation in [Orientation::Landscape, Orientation::Portrait] {
            let settings = PrintSettings {
                paper: PaperSize::A4,
                orientation,
                render_mode: mode,
            };
            let content = StaticContent::demo(&scene, &settings);
            let config = ExportConfig {
                settings,
                ..demo_config(OutputFormat::Pdf)
            };
            let out = export_plot(&catalog, config, demo_view(), &scene, &content)
                .unwrap_or_else(|e| panic!("{mode:?}/{orientation:?}: {e}"));
            assert_valid_pdf(&out.bytes);
        }
    }
}

#[test]
fn png_export_with_captures() {
    let catalog = TemplateCatalog::builtin();
    let scene = Scene::demo();
    let settings = PrintSettings {
        render_mode: RenderMode::ThreeD,
        ..PrintSettings::default()
    };
    let capture = blastprint::content::decode_data_uri(TEST_PNG_URI).unwrap();
    let content = StaticContent::demo(&scene, &settings)
        .with_capture(CaptureKind::NorthArrow, capture.clone())
        .with_capture(CaptureKind::OrientationGizmo, capture.clone())
        .with_capture(CaptureKind::QrCode, capture);
    let config = ExportConfig {
        settings,
        ..demo_config(OutputFormat::Png { dpi: 120.0 })
    };
    let out = export_plot(&catalog, config, demo_view(), &scene, &content).unwrap();
    assert_valid_png(&out.bytes);
}

#[test]
fn missing_captures_fall_back_without_aborting() {
    let catalog = TemplateCatalog::builtin();
    let scene = Scene::demo();
    let settings = PrintSettings {
        render_mode: RenderMode::ThreeD,
        ..PrintSettings::default()
    };
    // No captures registered at all: cells draw their text fallback.
    let content = StaticContent::demo(&scene, &settings);
    let config = ExportConfig {
        settings,
        ..demo_config(OutputFormat::Pdf)
    };
    let out = export_plot(&catalog, config, demo_view(), &scene, &content).unwrap();
    assert_valid_pdf(&out.bytes);
}

#[test]
fn raster_export_is_deterministic() {
    let catalog = TemplateCatalog::builtin();
    let scene = Scene::demo();
    let settings = PrintSettings::default();
    let content = StaticContent::demo(&scene, &settings);

    let digest = || {
        let out = export_plot(
            &catalog,
            demo_config(OutputFormat::Png { dpi: 96.0 }),
            demo_view(),
            &scene,
            &content,
        )
        .unwrap();
        Sha256::digest(&out.bytes)
    };

    assert_eq!(digest(), digest());
}

#[test]
fn pdf_export_is_stable_in_size() {
    let catalog = TemplateCatalog::builtin();
    let scene = Scene::demo();
    let settings = PrintSettings::default();
    let content = StaticContent::demo(&scene, &settings);
    let run = || {
        export_plot(
            &catalog,
            demo_config(OutputFormat::Pdf),
            demo_view(),
            &scene,
            &content,
        )
        .unwrap()
        .bytes
    };
    let a = run();
    let b = run();
    // printpdf embeds timestamps, so byte-exact equality isn't guaranteed.
    let diff = (a.len() as i64 - b.len() as i64).unsigned_abs();
    assert!(diff < 200, "PDF outputs differ significantly: {} vs {}", a.len(), b.len());
}

#[test]
fn empty_scene_still_exports_frame() {
    let catalog = TemplateCatalog::builtin();
    let scene = Scene::default();
    let settings = PrintSettings::default();
    let content = StaticContent::demo(&scene, &settings);
    let out = export_plot(
        &catalog,
        demo_config(OutputFormat::Pdf),
        demo_view(),
        &scene,
        &content,
    )
    .unwrap();
    assert_valid_pdf(&out.bytes);
}

// =====================================================================
// Settings persistence
// =====================================================================

#[test]
fn settings_survive_json_round_trip() {
    let settings = PrintSettings {
        paper: PaperSize::Tabloid,
        orientation: Orientation::Portrait,
        render_mode: RenderMode::ThreeD,
    };
    let json = serde_json::to_string(&settings).unwrap();
    let back: PrintSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(settings, back);
    assert_eq!(settings.structural_hash(), back.structural_hash());
}
