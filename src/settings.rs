//! Print settings: paper size, orientation, and render mode.
//!
//! `PrintSettings` is an immutable value passed into every resolver and
//! boundary call — there is no global "current paper size". Cache
//! invalidation keys off [`PrintSettings::structural_hash`]: any change to
//! any of the three fields produces a different hash, and a stale resolved
//! layout is a correctness bug (cell geometry depends on all three).

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::geometry::PageSize;

/// ISO / ANSI paper sizes supported by the paper table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    A0,
    A1,
    A2,
    A3,
    A4,
    Letter,
    Tabloid,
}

impl PaperSize {
    /// Portrait dimensions in millimetres (width, height).
    pub fn portrait_mm(&self) -> (f64, f64) {
        match self {
            PaperSize::A0 => (841.0, 1189.0),
            PaperSize::A1 => (594.0, 841.0),
            PaperSize::A2 => (420.0, 594.0),
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Tabloid => (279.4, 431.8),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaperSize::A0 => "A0",
            PaperSize::A1 => "A1",
            PaperSize::A2 => "A2",
            PaperSize::A3 => "A3",
            PaperSize::A4 => "A4",
            PaperSize::Letter => "Letter",
            PaperSize::Tabloid => "Tabloid",
        }
    }

    /// Parse a user-supplied paper name ("a4", "Letter", ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a0" => Some(PaperSize::A0),
            "a1" => Some(PaperSize::A1),
            "a2" => Some(PaperSize::A2),
            "a3" => Some(PaperSize::A3),
            "a4" => Some(PaperSize::A4),
            "letter" => Some(PaperSize::Letter),
            "tabloid" => Some(PaperSize::Tabloid),
            _ => None,
        }
    }
}

/// Page orientation; swaps effective width/height when `Landscape`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Landscape: blast plans are wide by default.
    #[default]
    Landscape,
    Portrait,
}

/// Whether the interactive view the capture is taken from is the 2D plan
/// view or the 3D perspective view. Templates differ between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderMode {
    #[default]
    #[serde(rename = "2d")]
    TwoD,
    #[serde(rename = "3d")]
    ThreeD,
}

/// Immutable per-call print configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrintSettings {
    pub paper: PaperSize,
    pub orientation: Orientation,
    pub render_mode: RenderMode,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            paper: PaperSize::A4,
            orientation: Orientation::Landscape,
            render_mode: RenderMode::TwoD,
        }
    }
}

impl PrintSettings {
    /// Effective page size after applying orientation.
    pub fn page_size(&self) -> PageSize {
        let (w, h) = self.paper.portrait_mm();
        match self.orientation {
            Orientation::Portrait => PageSize::new(w, h),
            Orientation::Landscape => PageSize::new(h, w),
        }
    }

    /// Human-readable label ("A4 landscape") used in error messages.
    pub fn paper_label(&self) -> String {
        let orient = match self.orientation {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        };
        format!("{} {}", self.paper.name(), orient)
    }

    /// Structural hash over all three fields. Replaces ad hoc dirty flags:
    /// equal hash means the cached resolved layout is still valid.
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_swaps_dimensions() {
        let s = PrintSettings {
            paper: PaperSize::A4,
            orientation: Orientation::Landscape,
            render_mode: RenderMode::TwoD,
        };
        let page = s.page_size();
        assert_eq!(page.width, 297.0);
        assert_eq!(page.height, 210.0);
    }

    #[test]
    fn hash_changes_with_any_field() {
        let base = PrintSettings::default();
        let paper = PrintSettings {
            paper: PaperSize::A3,
            ..base
        };
        let orient = PrintSettings {
            orientation: Orientation::Portrait,
            ..base
        };
        let mode = PrintSettings {
            render_mode: RenderMode::ThreeD,
            ..base
        };
        assert_ne!(base.structural_hash(), paper.structural_hash());
        assert_ne!(base.structural_hash(), orient.structural_hash());
        assert_ne!(base.structural_hash(), mode.structural_hash());
    }

    #[test]
    fn settings_json_roundtrip() {
        let s = PrintSettings {
            paper: PaperSize::A2,
            orientation: Orientation::Portrait,
            render_mode: RenderMode::ThreeD,
        };
        let json = serde_json::to_string(&s).unwrap();
        let back: PrintSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn paper_parse_is_case_insensitive() {
        assert_eq!(PaperSize::parse("A4"), Some(PaperSize::A4));
        assert_eq!(PaperSize::parse("letter"), Some(PaperSize::Letter));
        assert_eq!(PaperSize::parse("b5"), None);
    }
}
