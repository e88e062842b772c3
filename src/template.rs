//! Print templates: the declarative layout data the zone resolver consumes.
//!
//! A template describes one page arrangement — a map zone holding the
//! captured view and a footer zone holding rows of labelled cells — keyed by
//! (render mode × orientation). The catalog is static data: templates are
//! loaded once and never mutated.
//!
//! Two footer shapes exist in the wild: the older single-strip footer (2D
//! plan sheets) and the multi-row footer with a title band (3D view sheets).
//! Both share one schema; [`FooterVariant`] records which shape a template
//! is, and a single resolver consumes either.

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::settings::{Orientation, RenderMode};
use crate::value::Dim;

/// Zone name of the map area.
pub const ZONE_MAP: &str = "map";
/// Zone name of the footer.
pub const ZONE_FOOTER: &str = "footer";

/// Capture assets a cell can ask a provider for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    NorthArrow,
    OrientationGizmo,
    QrCode,
}

impl CaptureKind {
    /// Fallback text drawn into the cell when the capture image is missing.
    pub fn fallback_text(&self) -> &'static str {
        match self {
            CaptureKind::NorthArrow => "N",
            CaptureKind::OrientationGizmo => "XYZ",
            CaptureKind::QrCode => "QR",
        }
    }
}

/// What a footer cell renders. The engine only supplies the rectangle;
/// content comes from collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellContent {
    /// Pre-formatted text from the statistics provider, looked up by cell id.
    Stat,
    /// Fixed text baked into the template.
    Label(String),
    /// An opaque raster image from the capture provider.
    Capture(CaptureKind),
}

/// The smallest addressable rectangle of the footer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSpec {
    pub id: String,
    pub content: CellContent,
    pub label: Option<String>,
    /// Fraction of the zone width. Per-section sums must stay <= 1.
    pub width_percent: f64,
}

impl CellSpec {
    pub fn stat(id: &str, label: &str, width_percent: f64) -> Self {
        Self {
            id: id.to_string(),
            content: CellContent::Stat,
            label: Some(label.to_string()),
            width_percent,
        }
    }

    pub fn label(id: &str, text: &str, width_percent: f64) -> Self {
        Self {
            id: id.to_string(),
            content: CellContent::Label(text.to_string()),
            label: None,
            width_percent,
        }
    }

    pub fn capture(id: &str, kind: CaptureKind, width_percent: f64) -> Self {
        Self {
            id: id.to_string(),
            content: CellContent::Capture(kind),
            label: None,
            width_percent,
        }
    }
}

/// A horizontal strip within a zone. `y` and `height` are fractions of the
/// zone's own height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub y: f64,
    pub height: f64,
    pub cells: Vec<CellSpec>,
}

/// A named rectangular region of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub x: Dim,
    pub y: Dim,
    pub width: Dim,
    pub height: Dim,
    /// Fraction of the zone width kept free of trim clipping on each side.
    pub print_safe_margin: Option<f64>,
    pub sections: Vec<(String, SectionSpec)>,
}

impl ZoneSpec {
    pub fn section(&self, name: &str) -> Option<&SectionSpec> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }
}

/// Which footer shape this template uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FooterVariant {
    /// One full-height strip of cells (2D plan sheets).
    SingleStrip,
    /// Title band plus stat and capture rows (3D view sheets).
    TitledRows,
}

/// One complete page arrangement. Identity is (render_mode, orientation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub render_mode: RenderMode,
    pub orientation: Orientation,
    /// The zone whose `"auto"` height fills the page between mirrored
    /// top/bottom margins. `None` when every zone height is explicit.
    pub auto_fill_zone: Option<String>,
    pub footer_variant: FooterVariant,
    pub map_zone: ZoneSpec,
    pub footer_zone: ZoneSpec,
}

impl Template {
    /// Look up a zone by name. Unknown names yield `None`, not an error.
    pub fn zone(&self, name: &str) -> Option<&ZoneSpec> {
        match name {
            ZONE_MAP => Some(&self.map_zone),
            ZONE_FOOTER => Some(&self.footer_zone),
            _ => None,
        }
    }

    /// Reject degenerate layout data at load time: a print-safe margin of
    /// 0.5 or more, a section outside its zone, or a cell row wider than
    /// its zone would otherwise silently produce broken geometry at export.
    pub fn validate(&self) -> Result<(), TemplateError> {
        for (zone_name, zone) in [(ZONE_MAP, &self.map_zone), (ZONE_FOOTER, &self.footer_zone)] {
            if let Some(margin) = zone.print_safe_margin {
                if !(0.0..0.5).contains(&margin) {
                    return Err(TemplateError::MarginOutOfRange {
                        zone: zone_name.to_string(),
                        margin,
                    });
                }
            }
            for (section_name, section) in &zone.sections {
                if section.y < 0.0 || section.height < 0.0 || section.y + section.height > 1.0 + 1e-9
                {
                    return Err(TemplateError::SectionOutOfBounds {
                        section: section_name.clone(),
                        y: section.y,
                        height: section.height,
                    });
                }
                let sum: f64 = section.cells.iter().map(|c| c.width_percent).sum();
                if sum > 1.0 + 1e-9 {
                    return Err(TemplateError::CellWidthOverflow {
                        section: section_name.clone(),
                        sum,
                    });
                }
            }
        }
        Ok(())
    }
}

/// The static template catalog: one template per (render mode, orientation).
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
}

impl TemplateCatalog {
    /// The built-in plan and view sheet templates. All four validate by
    /// construction; `debug_assert` guards regressions in the data below.
    pub fn builtin() -> Self {
        let templates = vec![
            plan_2d_landscape(),
            plan_2d_portrait(),
            view_3d_landscape(),
            view_3d_portrait(),
        ];
        for t in &templates {
            debug_assert!(t.validate().is_ok(), "built-in template '{}' invalid", t.name);
        }
        Self { templates }
    }

    pub fn get(&self, mode: RenderMode, orientation: Orientation) -> Option<&Template> {
        self.templates
            .iter()
            .find(|t| t.render_mode == mode && t.orientation == orientation)
    }

    pub fn all(&self) -> &[Template] {
        &self.templates
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Built-in template data
// ---------------------------------------------------------------------------

/// Single-strip stat row shared by the 2D sheets.
fn plan_footer_sections() -> Vec<(String, SectionSpec)> {
    vec![(
        "stats".to_string(),
        SectionSpec {
            y: 0.0,
            height: 1.0,
            cells: vec![
                CellSpec::stat("project", "Project", 0.3),
                CellSpec::stat("scale", "Scale", 0.2),
                CellSpec::stat("holes", "Holes", 0.2),
                CellSpec::stat("drill", "Drill length", 0.3),
            ],
        },
    )]
}

/// Title band, stat row, and capture row shared by the 3D sheets.
fn view_footer_sections() -> Vec<(String, SectionSpec)> {
    vec![
        (
            "title".to_string(),
            SectionSpec {
                y: 0.0,
                height: 0.25,
                cells: vec![
                    CellSpec::stat("project", "Project", 0.5),
                    CellSpec::stat("date", "Date", 0.25),
                    CellSpec::stat("designer", "Designer", 0.25),
                ],
            },
        ),
        (
            "stats".to_string(),
            SectionSpec {
                y: 0.25,
                height: 0.5,
                cells: vec![
                    CellSpec::stat("holes", "Holes", 0.25),
                    CellSpec::stat("drill", "Drill length", 0.25),
                    CellSpec::stat("charge", "Charge", 0.25),
                    CellSpec::stat("pattern", "Burden x spacing", 0.25),
                ],
            },
        ),
        (
            "captures".to_string(),
            SectionSpec {
                y: 0.75,
                height: 0.25,
                cells: vec![
                    CellSpec::capture("north", CaptureKind::NorthArrow, 0.34),
                    CellSpec::capture("gizmo", CaptureKind::OrientationGizmo, 0.33),
                    CellSpec::capture("qr", CaptureKind::QrCode, 0.33),
                ],
            },
        ),
    ]
}

/// Landscape sheets put the footer beside the map; the map's auto height
/// fills the page between mirrored top/bottom margins.
fn landscape_zones(safe_margin: f64, sections: Vec<(String, SectionSpec)>) -> (ZoneSpec, ZoneSpec) {
    let map = ZoneSpec {
        x: Dim::Length(0.02),
        y: Dim::Length(0.02),
        width: Dim::Length(0.60),
        height: Dim::auto(),
        print_safe_margin: Some(safe_margin),
        sections: Vec::new(),
    };
    let footer = ZoneSpec {
        x: Dim::percent("64%"),
        y: Dim::Length(0.02),
        width: Dim::percent("34%"),
        height: Dim::percent("96%"),
        print_safe_margin: None,
        sections,
    };
    (map, footer)
}

/// Portrait sheets stack the footer under the map as a fixed-height strip
/// anchored 70 mm from the bottom edge.
fn portrait_zones(safe_margin: f64, sections: Vec<(String, SectionSpec)>) -> (ZoneSpec, ZoneSpec) {
    let map = ZoneSpec {
        x: Dim::Length(0.02),
        y: Dim::Length(0.02),
        width: Dim::percent("96%"),
        height: Dim::Length(0.72),
        print_safe_margin: Some(safe_margin),
        sections: Vec::new(),
    };
    let footer = ZoneSpec {
        x: Dim::Length(0.02),
        y: Dim::Length(-70.0),
        width: Dim::percent("96%"),
        height: Dim::Length(64.0),
        print_safe_margin: None,
        sections,
    };
    (map, footer)
}

fn plan_2d_landscape() -> Template {
    let (map_zone, footer_zone) = landscape_zones(0.02, plan_footer_sections());
    Template {
        name: "plan-2d-landscape".to_string(),
        render_mode: RenderMode::TwoD,
        orientation: Orientation::Landscape,
        auto_fill_zone: Some(ZONE_MAP.to_string()),
        footer_variant: FooterVariant::SingleStrip,
        map_zone,
        footer_zone,
    }
}

fn plan_2d_portrait() -> Template {
    let (map_zone, footer_zone) = portrait_zones(0.02, plan_footer_sections());
    Template {
        name: "plan-2d-portrait".to_string(),
        render_mode: RenderMode::TwoD,
        orientation: Orientation::Portrait,
        auto_fill_zone: None,
        footer_variant: FooterVariant::SingleStrip,
        map_zone,
        footer_zone,
    }
}

fn view_3d_landscape() -> Template {
    let (map_zone, footer_zone) = landscape_zones(0.03, view_footer_sections());
    Template {
        name: "view-3d-landscape".to_string(),
        render_mode: RenderMode::ThreeD,
        orientation: Orientation::Landscape,
        auto_fill_zone: Some(ZONE_MAP.to_string()),
        footer_variant: FooterVariant::TitledRows,
        map_zone,
        footer_zone,
    }
}

fn view_3d_portrait() -> Template {
    let (map_zone, footer_zone) = portrait_zones(0.03, view_footer_sections());
    Template {
        name: "view-3d-portrait".to_string(),
        render_mode: RenderMode::ThreeD,
        orientation: Orientation::Portrait,
        auto_fill_zone: None,
        footer_variant: FooterVariant::TitledRows,
        map_zone,
        footer_zone,
    }
}
