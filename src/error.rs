//! Error types for the layout, transform, and export layers.
//!
//! Geometry-layer lookups (unknown zone/section/cell names) return `None`
//! rather than an error so callers can fall back to a default instead of
//! aborting an export. Errors here cover the unrecoverable cases: malformed
//! templates, degenerate capture geometry, oversized raster targets, and
//! backend failures.

use thiserror::Error;

/// Rejected at template load time by [`crate::template::Template::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    /// A print-safe margin of 0.5 or more insets the inner rectangle to
    /// zero or negative size.
    #[error("zone '{zone}' has print_safe_margin {margin} (must be in [0, 0.5))")]
    MarginOutOfRange { zone: String, margin: f64 },

    /// Cell widths within one section must not exceed the zone width.
    #[error("section '{section}' cell widths sum to {sum} (must be <= 1)")]
    CellWidthOverflow { section: String, sum: f64 },

    /// A section row must lie within its zone (`y + height <= 1`).
    #[error("section '{section}' extends past its zone (y {y} + height {height} > 1)")]
    SectionOutOfBounds { section: String, y: f64, height: f64 },
}

/// Raised by [`crate::transform::derive_export_transform`] when there is
/// nothing valid to capture.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TransformError {
    /// The visible world rectangle has zero or negative extent.
    #[error("degenerate data bounds: {width} x {height} world units")]
    DegenerateBounds { width: f64, height: f64 },

    /// The interactive view scale must be positive to be invertible.
    #[error("view scale {0} is not positive")]
    NonPositiveScale(f64),

    /// The destination rectangle has zero or negative extent.
    #[error("degenerate output area: {width} x {height}")]
    DegenerateOutput { width: f64, height: f64 },
}

/// Failures decoding a capture asset (north arrow, gizmo, QR image).
/// These are non-fatal: the pipeline logs them and draws a text fallback.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssetError {
    #[error("image src must be a base64 data URI (e.g. `data:image/png;base64,...`)")]
    NotDataUri,

    #[error("invalid data URI: missing `,` separator between header and data")]
    MissingSeparator,

    #[error("only base64-encoded data URIs are supported")]
    NotBase64,

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("image decode error: {0}")]
    Decode(String),
}

/// Terminal export-pipeline error. A failing stage aborts the remaining
/// stages and surfaces exactly one of these.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The preview boundary could not be computed (canvas too small for the
    /// preview margin, or no template matches the settings).
    #[error("print preview is inactive: {0}")]
    PreviewInactive(String),

    /// Requested raster output exceeds the maximum device-pixel dimension.
    /// Aborted before any drawing begins.
    #[error(
        "raster target for {paper} at {dpi} dpi is {width_px}x{height_px} px \
         (maximum dimension is {max_px} px)"
    )]
    RasterTooLarge {
        paper: String,
        dpi: f64,
        width_px: u32,
        height_px: u32,
        max_px: u32,
    },

    /// Output-surface failure while finalizing (encoder errors and the like).
    #[error("backend error: {0}")]
    Backend(String),
}
