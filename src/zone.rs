//! Zone resolver – turns a template plus a page size into absolute
//! millimetre rectangles for every zone, section row, and cell.
//!
//! Resolution is pure arithmetic over [`crate::value::resolve`]; the only
//! special case is the narrow auto-height rule: the template's designated
//! auto-fill zone gets `page_height − 2 × resolved_y` (mirrored top/bottom
//! margins — the zone is vertically centered by construction), any other
//! zone's `"auto"` height falls back to 90% of the page height. This is not
//! a general flex layout and does not try to be one.
//!
//! Lookups by unknown zone/section/cell name return `None` so an export can
//! draw a fallback instead of crashing.

use crate::geometry::{PageSize, Rect};
use crate::settings::PrintSettings;
use crate::template::{CellContent, FooterVariant, Template, TemplateCatalog, ZoneSpec, ZONE_FOOTER, ZONE_MAP};
use crate::value::{resolve, Resolved};

/// A cell rectangle with its identity and content tag, ready for a
/// collaborator to render into.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCell {
    pub id: String,
    pub content: CellContent,
    pub label: Option<String>,
    pub rect: Rect,
}

/// The print-safe inset of a zone: `inner` is `outer` inset by `margin`
/// (millimetres) on all four sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeArea {
    pub outer: Rect,
    pub inner: Rect,
    pub margin: f64,
}

/// Resolve a zone's rectangle against the page. `None` for unknown names.
pub fn resolve_zone(template: &Template, zone_name: &str, page: PageSize) -> Option<Rect> {
    let zone = template.zone(zone_name)?;
    let x = resolve(&zone.x, page.width).length_or(0.0);
    let y = resolve(&zone.y, page.height).length_or(0.0);
    let width = resolve(&zone.width, page.width).length_or(0.0);
    let height = match resolve(&zone.height, page.height) {
        Resolved::Length(h) => h,
        Resolved::Defer => {
            if template.auto_fill_zone.as_deref() == Some(zone_name) {
                // Mirrored top/bottom margins: the resolved y doubles as the
                // bottom margin, so the zone fills the space between them.
                page.height - 2.0 * y
            } else {
                page.height * 0.9
            }
        }
    };
    Some(Rect::new(x, y, width, height))
}

/// Resolve one section row of a zone. Fractions are of the zone's own height.
pub fn resolve_section(zone_rect: &Rect, zone: &ZoneSpec, section_name: &str) -> Option<Rect> {
    let section = zone.section(section_name)?;
    Some(Rect::new(
        zone_rect.x,
        zone_rect.y + zone_rect.height * section.y,
        zone_rect.width,
        zone_rect.height * section.height,
    ))
}

/// Resolve one cell of a section row. Cell x accumulates the widths of the
/// preceding cells in the row; widths are fractions of the zone width.
pub fn resolve_cell(
    zone_rect: &Rect,
    zone: &ZoneSpec,
    section_name: &str,
    cell_index: usize,
) -> Option<ResolvedCell> {
    let section = zone.section(section_name)?;
    let cell = section.cells.get(cell_index)?;

    let preceding: f64 = section.cells[..cell_index]
        .iter()
        .map(|c| c.width_percent)
        .sum();

    let rect = Rect::new(
        zone_rect.x + zone_rect.width * preceding,
        zone_rect.y + zone_rect.height * section.y,
        zone_rect.width * cell.width_percent,
        zone_rect.height * section.height,
    );

    Some(ResolvedCell {
        id: cell.id.clone(),
        content: cell.content.clone(),
        label: cell.label.clone(),
        rect,
    })
}

/// Inset a zone by its print-safe margin. `margin` is a fraction of the
/// outer width applied to all four sides. Deliberately does not clamp:
/// template validation rejects margins >= 0.5 at load time, and anything
/// that slips past renders degenerate rather than silently shifting.
pub fn resolve_map_safe_area(outer: &Rect, print_safe_margin: f64) -> SafeArea {
    let margin = outer.width * print_safe_margin;
    SafeArea {
        outer: *outer,
        inner: outer.inset(margin),
        margin,
    }
}

/// One resolved footer row with its cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSection {
    pub name: String,
    pub rect: Rect,
    pub cells: Vec<ResolvedCell>,
}

/// Every rectangle of a template resolved against one page size, in page
/// millimetres. This is the object the boundary service and the export
/// pipeline both consume.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLayout {
    pub template_name: String,
    pub footer_variant: FooterVariant,
    pub page: PageSize,
    pub map: SafeArea,
    pub footer: Rect,
    pub footer_sections: Vec<ResolvedSection>,
}

/// Resolve the full layout for a template on a page.
pub fn resolve_layout(template: &Template, page: PageSize) -> ResolvedLayout {
    // Both zones exist on every template, so these lookups cannot miss.
    let map_rect = resolve_zone(template, ZONE_MAP, page).unwrap_or_default();
    let footer_rect = resolve_zone(template, ZONE_FOOTER, page).unwrap_or_default();

    let safe_margin = template.map_zone.print_safe_margin.unwrap_or(0.0);
    let map = resolve_map_safe_area(&map_rect, safe_margin);

    let footer_sections = template
        .footer_zone
        .sections
        .iter()
        .map(|(name, section)| {
            let rect = resolve_section(&footer_rect, &template.footer_zone, name)
                .unwrap_or_default();
            let cells = (0..section.cells.len())
                .filter_map(|i| resolve_cell(&footer_rect, &template.footer_zone, name, i))
                .collect();
            ResolvedSection {
                name: name.clone(),
                rect,
                cells,
            }
        })
        .collect();

    ResolvedLayout {
        template_name: template.name.clone(),
        footer_variant: template.footer_variant,
        page,
        map,
        footer: footer_rect,
        footer_sections,
    }
}

/// Memoized resolved layout keyed by the settings' structural hash. Any
/// paper-size, orientation, or render-mode change recomputes; serving a
/// stale layout would be a correctness bug, not a performance one.
#[derive(Debug, Default)]
pub struct LayoutCache {
    entry: Option<(u64, ResolvedLayout)>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The resolved layout for `settings`, recomputing when the settings
    /// hash differs from the cached one. `None` when the catalog has no
    /// template for the settings' mode/orientation.
    pub fn layout(
        &mut self,
        catalog: &TemplateCatalog,
        settings: &PrintSettings,
    ) -> Option<&ResolvedLayout> {
        let key = settings.structural_hash();
        let stale = self.entry.as_ref().map_or(true, |(k, _)| *k != key);
        if stale {
            self.entry = None;
            let template = catalog.get(settings.render_mode, settings.orientation)?;
            let layout = resolve_layout(template, settings.page_size());
            self.entry = Some((key, layout));
        }
        self.entry.as_ref().map(|(_, layout)| layout)
    }

    /// Number of cached entries (0 or 1); used by invalidation tests.
    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Orientation, PaperSize, RenderMode};
    use crate::template::{CellSpec, SectionSpec};
    use crate::value::Dim;

    fn a4_landscape() -> PageSize {
        PageSize::new(297.0, 210.0)
    }

    fn catalog() -> TemplateCatalog {
        TemplateCatalog::builtin()
    }

    #[test]
    fn map_zone_resolves_a4_landscape() {
        // x=0.02, y=0.02, width=0.60, height=auto on a 297x210 page.
        let c = catalog();
        let t = c.get(RenderMode::TwoD, Orientation::Landscape).unwrap();
        let rect = resolve_zone(t, ZONE_MAP, a4_landscape()).unwrap();
        assert!((rect.x - 5.94).abs() < 1e-9);
        assert!((rect.y - 4.2).abs() < 1e-9);
        assert!((rect.width - 178.2).abs() < 1e-9);
        // Mirrored margins: 210 - 2*4.2.
        assert!((rect.height - 201.6).abs() < 1e-9);
    }

    #[test]
    fn auto_height_defaults_to_ninety_percent_elsewhere() {
        let c = catalog();
        let mut t = c.get(RenderMode::TwoD, Orientation::Landscape).unwrap().clone();
        t.footer_zone.height = Dim::auto();
        let rect = resolve_zone(&t, ZONE_FOOTER, a4_landscape()).unwrap();
        assert!((rect.height - 189.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_zone_and_cell_are_none() {
        let c = catalog();
        let t = c.get(RenderMode::TwoD, Orientation::Landscape).unwrap();
        assert!(resolve_zone(t, "legend", a4_landscape()).is_none());
        let footer = resolve_zone(t, ZONE_FOOTER, a4_landscape()).unwrap();
        assert!(resolve_cell(&footer, &t.footer_zone, "nope", 0).is_none());
        assert!(resolve_cell(&footer, &t.footer_zone, "stats", 99).is_none());
    }

    #[test]
    fn cells_tile_the_zone_width() {
        let c = catalog();
        let t = c.get(RenderMode::TwoD, Orientation::Landscape).unwrap();
        let page = a4_landscape();
        let footer = resolve_zone(t, ZONE_FOOTER, page).unwrap();

        let section = t.footer_zone.section("stats").unwrap();
        let mut total = 0.0;
        let mut next_x = footer.x;
        for i in 0..section.cells.len() {
            let cell = resolve_cell(&footer, &t.footer_zone, "stats", i).unwrap();
            assert!(
                (cell.rect.x - next_x).abs() < 1e-6,
                "cell {i} leaves a gap: {} vs {}",
                cell.rect.x,
                next_x
            );
            next_x = cell.rect.right();
            total += cell.rect.width;
        }
        // width_percent sums to 1.0 for this section, so the row tiles.
        assert!((total - footer.width).abs() < 1e-6);
    }

    #[test]
    fn safe_area_is_contained_for_valid_margins() {
        let outer = Rect::new(5.0, 5.0, 180.0, 200.0);
        for margin in [0.0, 0.01, 0.1, 0.25, 0.49] {
            let safe = resolve_map_safe_area(&outer, margin);
            assert!(safe.outer.contains_rect(&safe.inner), "margin {margin}");
            if margin < 0.49 {
                assert!(safe.inner.width > 0.0 && safe.inner.height > 0.0);
            }
            assert!((safe.inner.width - (safe.outer.width - 2.0 * safe.margin)).abs() < 1e-9);
        }
    }

    #[test]
    fn degenerate_margin_is_not_clamped() {
        let outer = Rect::new(0.0, 0.0, 100.0, 40.0);
        let safe = resolve_map_safe_area(&outer, 0.5);
        // margin = 50mm but the zone is only 40mm tall.
        assert!(safe.inner.height < 0.0);
    }

    #[test]
    fn section_row_spans_zone_width() {
        let zone_rect = Rect::new(10.0, 10.0, 100.0, 50.0);
        let zone = ZoneSpec {
            x: Dim::Length(10.0),
            y: Dim::Length(10.0),
            width: Dim::Length(100.0),
            height: Dim::Length(50.0),
            print_safe_margin: None,
            sections: vec![(
                "row".to_string(),
                SectionSpec {
                    y: 0.5,
                    height: 0.5,
                    cells: vec![CellSpec::stat("a", "A", 0.5)],
                },
            )],
        };
        let row = resolve_section(&zone_rect, &zone, "row").unwrap();
        assert_eq!(row, Rect::new(10.0, 35.0, 100.0, 25.0));
    }

    #[test]
    fn cache_invalidates_on_settings_change() {
        let c = catalog();
        let mut cache = LayoutCache::new();
        let a4 = PrintSettings::default();
        let first = cache.layout(&c, &a4).unwrap().page;
        assert_eq!(first.width, 297.0);

        let a3 = PrintSettings {
            paper: PaperSize::A3,
            ..a4
        };
        let second = cache.layout(&c, &a3).unwrap().page;
        assert_eq!(second.width, 420.0);

        // Unchanged settings hit the cache (same value back).
        let third = cache.layout(&c, &a3).unwrap().page;
        assert_eq!(second, third);
    }
}
