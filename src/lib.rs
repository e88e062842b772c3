//! # blastprint – WYSIWYG print layout and export for blast-design plans
//!
//! This crate is the paper-output engine of an interactive blast-design
//! editor: what the operator sees in the preview is exactly what lands in
//! the exported file. The pipeline stages are:
//!
//! 1. **Resolve** – template specs → absolute page rectangles ([`zone`])
//! 2. **Preview** – page layout aspect-fit into the canvas ([`boundary`])
//! 3. **Capture** – live view → export transform ([`transform`])
//! 4. **Draw** – one composer drives either output surface ([`backend`],
//!    [`raster`], [`vector`])
//! 5. **Finalize** – PDF or PNG bytes ([`pipeline`])
//!
//! Templates are declarative data ([`template`]) resolved against immutable
//! [`settings::PrintSettings`]; dimension shorthands are handled by
//! [`value`].

pub mod backend;
pub mod boundary;
pub mod content;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod raster;
pub mod scene;
pub mod settings;
pub mod template;
pub mod transform;
pub mod value;
pub mod vector;
pub mod zone;

// Re-exports for convenience
pub use pipeline::{export_plot, ExportConfig, ExportJob, OutputFormat};
pub use settings::{Orientation, PaperSize, PrintSettings, RenderMode};
pub use transform::{derive_export_transform, ViewState};
