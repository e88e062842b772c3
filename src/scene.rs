//! World-space entities consumed by the export pipeline.
//!
//! The engine never draws these directly from world coordinates: every
//! position goes through the committed export transform first. Entities are
//! deliberately minimal — the host editor owns the real data model and
//! hands the pipeline an iterable snapshot.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point3, Rect};

/// A blast hole: collar position, optional toe (angled holes), and the
/// drilled diameter in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    pub id: String,
    pub collar: Point3,
    pub toe: Option<Point3>,
    pub diameter_mm: f64,
    pub label: Option<String>,
}

impl Hole {
    /// Drilled length, collar to toe. Vertical holes without a toe have
    /// no length to report.
    pub fn length(&self) -> Option<f64> {
        let toe = self.toe?;
        let dx = toe.x - self.collar.x;
        let dy = toe.y - self.collar.y;
        let dz = toe.z - self.collar.z;
        Some((dx * dx + dy * dy + dz * dz).sqrt())
    }
}

/// One drawable world entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    Hole(Hole),
    /// Open or closed line strings: bench crests, toes, free faces.
    Polyline { points: Vec<Point3>, closed: bool },
    /// A world-anchored annotation. `size` is in world units.
    Text {
        position: Point3,
        text: String,
        size: f64,
    },
}

/// A snapshot of the entities to plot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub entities: Vec<Entity>,
}

impl Scene {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn holes(&self) -> impl Iterator<Item = &Hole> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Hole(h) => Some(h),
            _ => None,
        })
    }

    /// Axis-aligned world bounds over all entity positions (x/y plane).
    /// `None` for an empty scene.
    pub fn bounds(&self) -> Option<Rect> {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut any = false;

        let mut visit = |p: &Point3| {
            any = true;
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        };

        for entity in &self.entities {
            match entity {
                Entity::Hole(h) => {
                    visit(&h.collar);
                    if let Some(toe) = &h.toe {
                        visit(toe);
                    }
                }
                Entity::Polyline { points, .. } => points.iter().for_each(&mut visit),
                Entity::Text { position, .. } => visit(position),
            }
        }

        any.then(|| Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// A small staggered-pattern demo bench used by the CLI and tests:
    /// two crest/toe polylines and a 5x4 grid of holes.
    pub fn demo() -> Self {
        let mut entities = vec![
            Entity::Polyline {
                points: vec![
                    Point3::new(0.0, 42.0, 100.0),
                    Point3::new(60.0, 44.0, 100.0),
                    Point3::new(120.0, 41.0, 100.0),
                ],
                closed: false,
            },
            Entity::Polyline {
                points: vec![
                    Point3::new(0.0, -2.0, 88.0),
                    Point3::new(60.0, 0.0, 88.0),
                    Point3::new(120.0, -1.5, 88.0),
                ],
                closed: false,
            },
        ];

        for row in 0..4 {
            for col in 0..5 {
                let stagger = if row % 2 == 0 { 0.0 } else { 12.0 };
                let x = 10.0 + col as f64 * 24.0 + stagger;
                let y = 8.0 + row as f64 * 9.0;
                let n = row * 5 + col + 1;
                entities.push(Entity::Hole(Hole {
                    id: format!("H{n:02}"),
                    collar: Point3::new(x, y, 100.0),
                    toe: Some(Point3::new(x, y + 1.5, 87.0)),
                    diameter_mm: 115.0,
                    label: Some(format!("{n}")),
                }));
            }
        }

        entities.push(Entity::Text {
            position: Point3::new(2.0, 46.0, 100.0),
            text: "Bench 1040".to_string(),
            size: 3.0,
        });

        Self { entities }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_collars_and_toes() {
        let scene = Scene::new(vec![Entity::Hole(Hole {
            id: "H01".to_string(),
            collar: Point3::new(10.0, 20.0, 100.0),
            toe: Some(Point3::new(14.0, 26.0, 88.0)),
            diameter_mm: 89.0,
            label: None,
        })]);
        let b = scene.bounds().unwrap();
        assert_eq!(b, Rect::new(10.0, 20.0, 4.0, 6.0));
    }

    #[test]
    fn empty_scene_has_no_bounds() {
        assert!(Scene::default().bounds().is_none());
    }

    #[test]
    fn hole_length_is_euclidean() {
        let hole = Hole {
            id: "H01".to_string(),
            collar: Point3::new(0.0, 0.0, 100.0),
            toe: Some(Point3::new(0.0, 3.0, 96.0)),
            diameter_mm: 89.0,
            label: None,
        };
        assert!((hole.length().unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn demo_scene_is_plottable() {
        let scene = Scene::demo();
        assert_eq!(scene.holes().count(), 20);
        let b = scene.bounds().unwrap();
        assert!(b.width > 0.0 && b.height > 0.0);
    }
}
