//! Element counts and bounds over an entity stream.

use geo::{Coord, Rect};
use routeforge_core::OsmEntity;
use serde::Serialize;

/// Summary of the entities seen by a summary target.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EntitySummary {
    /// Number of nodes, valid location or not.
    pub nodes: u64,
    /// Number of ways.
    pub ways: u64,
    /// Number of relations.
    pub relations: u64,
    /// Box covering every valid node location, if any node had one.
    pub bounds: Option<Bounds>,
}

/// Serialisable bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    /// Smallest longitude.
    pub left: f64,
    /// Smallest latitude.
    pub bottom: f64,
    /// Largest longitude.
    pub right: f64,
    /// Largest latitude.
    pub top: f64,
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Self {
            left: rect.min().x,
            bottom: rect.min().y,
            right: rect.max().x,
            top: rect.max().y,
        }
    }
}

impl Bounds {
    fn point(coord: Coord<f64>) -> Self {
        Rect::new(coord, coord).into()
    }

    fn include(&mut self, coord: Coord<f64>) {
        self.left = self.left.min(coord.x);
        self.bottom = self.bottom.min(coord.y);
        self.right = self.right.max(coord.x);
        self.top = self.top.max(coord.y);
    }
}

impl EntitySummary {
    /// Count `entity` and widen the bounds by node locations.
    pub fn record(&mut self, entity: &OsmEntity) {
        match entity {
            OsmEntity::Node(node) => {
                self.nodes += 1;
                if node.has_valid_location() {
                    match &mut self.bounds {
                        Some(bounds) => bounds.include(node.location),
                        None => self.bounds = Some(Bounds::point(node.location)),
                    }
                }
            }
            OsmEntity::Way(_) => self.ways += 1,
            OsmEntity::Relation(_) => self.relations += 1,
        }
    }
}
