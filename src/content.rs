//! Collaborator interfaces: footer cell content and capture assets.
//!
//! The engine only ever supplies a rectangle; what goes inside comes from a
//! [`ContentProvider`]. Statistics arrive pre-formatted, capture assets
//! (north arrow, orientation gizmo, QR code) arrive as ready-to-place
//! encoded raster images. A missing or undecodable asset is non-fatal: the
//! pipeline logs it and draws the cell's text fallback instead.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

use crate::error::AssetError;
use crate::scene::Scene;
use crate::settings::PrintSettings;
use crate::template::CaptureKind;

/// A ready-to-place raster asset: the encoded bytes (PNG/JPEG) plus the
/// intrinsic pixel dimensions. Backends decode or embed as they need.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureImage {
    pub bytes: Vec<u8>,
    pub px_width: u32,
    pub px_height: u32,
}

/// Supplies footer cell text and capture images to the composer.
pub trait ContentProvider {
    /// Pre-formatted text for a statistics cell, looked up by cell id.
    fn cell_text(&self, id: &str) -> Option<String>;

    /// The capture image for an asset cell. `None` triggers the text
    /// fallback path.
    fn capture(&self, kind: CaptureKind) -> Option<CaptureImage>;
}

/// Parse a `data:<mime>;base64,<data>` URI into a decoded capture image.
///
/// Capture providers in the host editor hand assets across as data URIs;
/// dimensions are read with the `image` crate so backends can scale
/// placements without decoding twice.
pub fn decode_data_uri(src: &str) -> Result<CaptureImage, AssetError> {
    if !src.starts_with("data:") {
        return Err(AssetError::NotDataUri);
    }
    let rest = &src["data:".len()..];
    let comma = rest.find(',').ok_or(AssetError::MissingSeparator)?;
    if !rest[..comma].contains(";base64") {
        return Err(AssetError::NotBase64);
    }
    let bytes = BASE64_STD
        .decode(rest[comma + 1..].trim())
        .map_err(|e| AssetError::Base64(e.to_string()))?;

    let dims = image::load_from_memory(&bytes).map_err(|e| AssetError::Decode(e.to_string()))?;
    Ok(CaptureImage {
        px_width: dims.width(),
        px_height: dims.height(),
        bytes,
    })
}

/// A fixed in-memory provider, used by the CLI and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticContent {
    cells: HashMap<String, String>,
    captures: HashMap<CaptureKind, CaptureImage>,
}

impl StaticContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell(mut self, id: &str, text: &str) -> Self {
        self.cells.insert(id.to_string(), text.to_string());
        self
    }

    pub fn with_capture(mut self, kind: CaptureKind, image: CaptureImage) -> Self {
        self.captures.insert(kind, image);
        self
    }

    /// Demo content derived from a scene: the aggregation itself lives in
    /// the host; this mirrors what its statistics panel would hand over.
    pub fn demo(scene: &Scene, settings: &PrintSettings) -> Self {
        let holes = scene.holes().count();
        let drill: f64 = scene.holes().filter_map(|h| h.length()).sum();
        Self::new()
            .with_cell("project", &format!("Demo bench 1040 ({})", settings.paper_label()))
            .with_cell("scale", "1:500")
            .with_cell("holes", &holes.to_string())
            .with_cell("drill", &format!("{drill:.1} m"))
            .with_cell("charge", "2.4 t ANFO")
            .with_cell("pattern", "3.5 x 4.0 m")
            .with_cell("date", "2026-02-14")
            .with_cell("designer", "R. Ortiz")
    }
}

impl ContentProvider for StaticContent {
    fn cell_text(&self, id: &str) -> Option<String> {
        self.cells.get(id).cloned()
    }

    fn capture(&self, kind: CaptureKind) -> Option<CaptureImage> {
        self.captures.get(&kind).cloned()
    }
}
