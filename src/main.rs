//! blastprint – command-line plan exporter.
//!
//! Usage:
//!   blastprint <output.pdf|output.png> [--paper a3] [--portrait] [--mode 3d]
//!              [--dpi 300] [--title "Bench 1040"]
//!
//! Renders the built-in demo bench through the full preview/capture/export
//! pipeline, so the output exercises exactly the code path the editor uses.

use std::{env, fs, path::PathBuf, process};

use blastprint::boundary::print_boundary;
use blastprint::content::StaticContent;
use blastprint::geometry::{Point, Size};
use blastprint::pipeline::{ExportConfig, ExportJob, OutputFormat, ProgressEvent};
use blastprint::scene::Scene;
use blastprint::settings::{Orientation, PaperSize, PrintSettings, RenderMode};
use blastprint::template::TemplateCatalog;
use blastprint::transform::ViewState;
use blastprint::zone::resolve_layout;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut output_path: Option<PathBuf> = None;
    let mut paper = PaperSize::A4;
    let mut orientation = Orientation::Landscape;
    let mut render_mode = RenderMode::TwoD;
    let mut dpi = 300.0f64;
    let mut title: Option<String> = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--paper" | "-p" => match iter.next().and_then(|v| PaperSize::parse(v)) {
                Some(p) => paper = p,
                None => {
                    eprintln!("Error: --paper needs a size (a0..a4, letter, tabloid).");
                    process::exit(1);
                }
            },
            "--portrait" => orientation = Orientation::Portrait,
            "--landscape" => orientation = Orientation::Landscape,
            "--mode" | "-m" => match iter.next().map(|v| v.to_ascii_lowercase()) {
                Some(v) if v == "2d" => render_mode = RenderMode::TwoD,
                Some(v) if v == "3d" => render_mode = RenderMode::ThreeD,
                _ => {
                    eprintln!("Error: --mode must be 2d or 3d.");
                    process::exit(1);
                }
            },
            "--dpi" => match iter.next().and_then(|v| v.parse::<f64>().ok()) {
                Some(v) if v > 0.0 => dpi = v,
                _ => {
                    eprintln!("Error: --dpi needs a positive number.");
                    process::exit(1);
                }
            },
            "--title" | "-t" => match iter.next() {
                Some(v) => title = Some(v.clone()),
                None => {
                    eprintln!("Error: --title needs a value.");
                    process::exit(1);
                }
            },
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                if output_path.is_some() {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(&args[0]);
                    process::exit(1);
                }
                output_path = Some(PathBuf::from(path));
            }
        }
    }

    let output = match output_path {
        Some(p) => p,
        None => {
            eprintln!("Error: no output file specified.");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    let format = match output.extension().and_then(|e| e.to_str()) {
        Some("pdf") => OutputFormat::Pdf,
        Some("png") => OutputFormat::Png { dpi },
        other => {
            eprintln!(
                "Error: unsupported output extension {:?} (use .pdf or .png).",
                other.unwrap_or("")
            );
            process::exit(1);
        }
    };

    let settings = PrintSettings {
        paper,
        orientation,
        render_mode,
    };
    let catalog = TemplateCatalog::builtin();
    let scene = Scene::demo();
    let content = StaticContent::demo(&scene, &settings);
    let canvas = Size::new(1280.0, 800.0);
    let preview_margin = 16.0;

    // Frame the demo bench in the preview the way an operator would before
    // exporting: fit its bounds into the print-safe boundary with some air.
    let view = match frame_scene(&catalog, &settings, &scene, canvas, preview_margin) {
        Some(v) => v,
        None => {
            eprintln!("Error: could not frame the scene for {}.", settings.paper_label());
            process::exit(1);
        }
    };

    let config = ExportConfig {
        title: title.unwrap_or_else(|| "blastprint demo".to_string()),
        settings,
        canvas,
        preview_margin,
        format,
    };

    let mut observer = |e: &ProgressEvent| eprintln!("[{:3}%] {}", e.percent, e.label);
    let job = ExportJob::new(&catalog, config, view, &scene, &content);
    match job.run(&mut observer) {
        Ok(out) => {
            if let Err(e) = fs::write(&output, &out.bytes) {
                eprintln!("Error writing '{}': {e}", output.display());
                process::exit(1);
            }
            eprintln!(
                "Wrote '{}' ({} bytes, {})",
                output.display(),
                out.bytes.len(),
                settings.paper_label()
            );
        }
        Err(e) => {
            eprintln!("Error exporting plan: {e}");
            process::exit(1);
        }
    }
}

/// Build a view state whose visible print-safe area covers the scene bounds
/// with a 10% margin.
fn frame_scene(
    catalog: &TemplateCatalog,
    settings: &PrintSettings,
    scene: &Scene,
    canvas: Size,
    preview_margin: f64,
) -> Option<ViewState> {
    let template = catalog.get(settings.render_mode, settings.orientation)?;
    let layout = resolve_layout(template, settings.page_size());
    let boundary = print_boundary(&layout, canvas, preview_margin)?;
    let bounds = scene.bounds()?;
    if bounds.width <= 0.0 || bounds.height <= 0.0 {
        return None;
    }
    let scale = (boundary.inner.width / bounds.width)
        .min(boundary.inner.height / bounds.height)
        * 0.9;
    // The view centroid is the world point at the canvas center; shift it
    // so the scene centers inside the (off-center) print boundary instead.
    let inner_center = boundary.inner.center();
    let centroid = Point::new(
        bounds.center().x - (inner_center.x - canvas.width / 2.0) / scale,
        bounds.center().y + (inner_center.y - canvas.height / 2.0) / scale,
    );
    Some(ViewState::new(scale, centroid))
}

fn print_usage(prog: &str) {
    eprintln!("blastprint – blast-plan print exporter");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <output.pdf|output.png> [flags]");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --paper, -p    Paper size: a0..a4, letter, tabloid (default: a4)");
    eprintln!("  --portrait     Portrait orientation (default: landscape)");
    eprintln!("  --mode, -m     Sheet template: 2d or 3d (default: 2d)");
    eprintln!("  --dpi          Raster resolution for .png output (default: 300)");
    eprintln!("  --title, -t    Document title in PDF metadata");
    eprintln!("  --help         Print this message");
}
