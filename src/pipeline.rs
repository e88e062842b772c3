//! Export pipeline – sequences layout resolution, transform capture, and
//! drawing into named stages.
//!
//! Each [`ExportJob::step`] call runs exactly one stage synchronously,
//! reports a typed progress event, and hands control back, so a host UI
//! thread is never blocked for the whole export. A failing stage aborts the
//! remainder and surfaces a single terminal [`ExportError`]. There is no
//! mid-pipeline cancellation; callers serialize exports (disable the
//! trigger while a progress indicator is showing).

use crate::backend::{self, RenderBackend};
use crate::boundary::{print_boundary, PrintBoundary};
use crate::content::ContentProvider;
use crate::error::ExportError;
use crate::geometry::Size;
use crate::raster::RasterBackend;
use crate::scene::Scene;
use crate::settings::PrintSettings;
use crate::template::TemplateCatalog;
use crate::transform::{derive_export_transform, ExportTransform, TransformParams, ViewState};
use crate::vector::VectorBackend;
use crate::zone::{LayoutCache, ResolvedLayout};

/// Output surface selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    /// Vector PDF page.
    Pdf,
    /// Raster PNG at the given resolution.
    Png { dpi: f64 },
}

/// Configuration for one export run.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Document title embedded in PDF metadata.
    pub title: String,
    pub settings: PrintSettings,
    /// Interactive canvas size the view lives in, px.
    pub canvas: Size,
    /// Preview margin around the page in the canvas, px.
    pub preview_margin: f64,
    pub format: OutputFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: "blastprint output".to_string(),
            settings: PrintSettings::default(),
            canvas: Size::new(1280.0, 800.0),
            preview_margin: 16.0,
            format: OutputFormat::Pdf,
        }
    }
}

/// The named pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    ResolveLayout,
    CaptureTransform,
    DrawBackground,
    DrawFrame,
    DrawData,
    Finalize,
}

impl ExportStage {
    pub const ALL: [ExportStage; 6] = [
        ExportStage::ResolveLayout,
        ExportStage::CaptureTransform,
        ExportStage::DrawBackground,
        ExportStage::DrawFrame,
        ExportStage::DrawData,
        ExportStage::Finalize,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ExportStage::ResolveLayout => "resolving layout",
            ExportStage::CaptureTransform => "capturing view transform",
            ExportStage::DrawBackground => "drawing background",
            ExportStage::DrawFrame => "drawing frame",
            ExportStage::DrawData => "drawing data",
            ExportStage::Finalize => "finalizing output",
        }
    }

    pub fn percent(&self) -> u8 {
        match self {
            ExportStage::ResolveLayout => 10,
            ExportStage::CaptureTransform => 25,
            ExportStage::DrawBackground => 40,
            ExportStage::DrawFrame => 60,
            ExportStage::DrawData => 85,
            ExportStage::Finalize => 100,
        }
    }
}

/// Progress reported after a stage completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: ExportStage,
    pub percent: u8,
    pub label: &'static str,
}

/// Receives progress events; the host renders them however it likes.
pub trait ProgressObserver {
    fn progress(&mut self, event: &ProgressEvent);
}

impl<F: FnMut(&ProgressEvent)> ProgressObserver for F {
    fn progress(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

/// A finished export: the encoded bytes plus the committed transform
/// parameters (collaborators reuse them to place extra world content).
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub params: TransformParams,
    pub boundary: PrintBoundary,
}

/// One export run as an explicit stage queue.
pub struct ExportJob<'a> {
    config: ExportConfig,
    catalog: &'a TemplateCatalog,
    view: ViewState,
    scene: &'a Scene,
    content: &'a dyn ContentProvider,
    cache: LayoutCache,
    next: usize,
    done: bool,
    layout: Option<ResolvedLayout>,
    boundary: Option<PrintBoundary>,
    transform: Option<ExportTransform>,
    backend: Option<Box<dyn RenderBackend>>,
    bytes: Option<Vec<u8>>,
}

impl<'a> ExportJob<'a> {
    pub fn new(
        catalog: &'a TemplateCatalog,
        config: ExportConfig,
        view: ViewState,
        scene: &'a Scene,
        content: &'a dyn ContentProvider,
    ) -> Self {
        Self {
            config,
            catalog,
            view,
            scene,
            content,
            cache: LayoutCache::new(),
            next: 0,
            done: false,
            layout: None,
            boundary: None,
            transform: None,
            backend: None,
            bytes: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.done || self.next >= ExportStage::ALL.len()
    }

    /// Run the next stage. Returns the stage that ran, or `None` when the
    /// job is already finished. On error the job is dead: the remaining
    /// stages never run and further calls return `Ok(None)`.
    pub fn step(
        &mut self,
        observer: &mut dyn ProgressObserver,
    ) -> Result<Option<ExportStage>, ExportError> {
        if self.is_finished() {
            return Ok(None);
        }
        let stage = ExportStage::ALL[self.next];
        match self.run_stage(stage) {
            Ok(()) => {
                self.next += 1;
                observer.progress(&ProgressEvent {
                    stage,
                    percent: stage.percent(),
                    label: stage.label(),
                });
                Ok(Some(stage))
            }
            Err(e) => {
                self.done = true;
                self.backend = None;
                log::error!("export aborted during '{}': {e}", stage.label());
                Err(e)
            }
        }
    }

    /// Drive the job to completion and collect the output.
    pub fn run(mut self, observer: &mut dyn ProgressObserver) -> Result<ExportOutput, ExportError> {
        while self.step(observer)?.is_some() {}
        let bytes = self
            .bytes
            .take()
            .ok_or_else(|| ExportError::Backend("finalize produced no output".to_string()))?;
        Ok(ExportOutput {
            bytes,
            format: self.config.format,
            params: self.transform.expect("transform committed").params,
            boundary: self.boundary.expect("boundary committed"),
        })
    }

    fn run_stage(&mut self, stage: ExportStage) -> Result<(), ExportError> {
        match stage {
            ExportStage::ResolveLayout => {
                let layout = self
                    .cache
                    .layout(self.catalog, &self.config.settings)
                    .cloned()
                    .ok_or_else(|| {
                        ExportError::PreviewInactive(format!(
                            "no template for {}",
                            self.config.settings.paper_label()
                        ))
                    })?;
                let boundary =
                    print_boundary(&layout, self.config.canvas, self.config.preview_margin)
                        .ok_or_else(|| {
                            ExportError::PreviewInactive(format!(
                                "canvas {}x{} px is too small for the preview",
                                self.config.canvas.width, self.config.canvas.height
                            ))
                        })?;
                self.layout = Some(layout);
                self.boundary = Some(boundary);
            }
            ExportStage::CaptureTransform => {
                let layout = self.layout.as_ref().expect("layout resolved");
                let boundary = self.boundary.as_ref().expect("boundary resolved");
                // The destination is the print-safe area in page mm; both
                // backends are driven by this one derivation.
                let transform = derive_export_transform(
                    &boundary.inner,
                    &self.view,
                    self.config.canvas,
                    &layout.map.inner,
                )?;
                self.transform = Some(transform);
            }
            ExportStage::DrawBackground => {
                let layout = self.layout.as_ref().expect("layout resolved");
                let mut backend: Box<dyn RenderBackend> = match self.config.format {
                    OutputFormat::Pdf => {
                        Box::new(VectorBackend::new(layout.page, &self.config.title))
                    }
                    OutputFormat::Png { dpi } => Box::new(RasterBackend::new(
                        layout.page,
                        dpi,
                        &self.config.settings.paper_label(),
                    )?),
                };
                backend::draw_background(backend.as_mut(), layout);
                self.backend = Some(backend);
            }
            ExportStage::DrawFrame => {
                let layout = self.layout.as_ref().expect("layout resolved");
                let backend = self.backend.as_mut().expect("backend created");
                backend::draw_frame(backend.as_mut(), layout, self.content);
            }
            ExportStage::DrawData => {
                let transform = self.transform.as_ref().expect("transform committed");
                let backend = self.backend.as_mut().expect("backend created");
                backend::draw_data(backend.as_mut(), transform, self.scene);
            }
            ExportStage::Finalize => {
                let backend = self.backend.take().expect("backend created");
                self.bytes = Some(backend.finish()?);
            }
        }
        Ok(())
    }
}

/// Convenience wrapper: run the whole pipeline in one call.
pub fn export_plot(
    catalog: &TemplateCatalog,
    config: ExportConfig,
    view: ViewState,
    scene: &Scene,
    content: &dyn ContentProvider,
) -> Result<ExportOutput, ExportError> {
    ExportJob::new(catalog, config, view, scene, content).run(&mut |_: &ProgressEvent| {})
}
