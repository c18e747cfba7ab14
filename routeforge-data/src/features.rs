//! Feature extraction from an entity stream.

use std::fmt;

use geo::{Geometry, LineString, Point, Polygon};
use log::{debug, warn};
use routeforge_core::{EntityKind, Feature, Node, OsmEntity, Tags, Way};

use crate::node_store::{InMemoryNodeStore, NodeStore, NodeStoreError};

/// Counters describing what a [`FeatureBuilder`] produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureStats {
    /// Point features emitted for nodes.
    pub points: u64,
    /// Line string features emitted for open ways.
    pub lines: u64,
    /// Polygon features emitted for closed area ways.
    pub polygons: u64,
    /// Ways dropped because a referenced node had no location.
    pub incomplete_ways: u64,
    /// Relations passed over; multipolygon assembly is not supported.
    pub skipped_relations: u64,
}

/// Turns entities into geo features.
///
/// An entity is feature-worthy when it carries one of the configured tag
/// keys, or any tag when no keys are configured. Nodes become points, ways
/// become line strings, and closed ways tagged `area=yes` or `building`
/// become polygons. Node locations are recorded in a [`NodeStore`] so
/// later ways can be resolved; [`FeatureBuilder::with_node_store`] swaps the
/// default in-memory store for a memory-mapped one.
///
/// # Examples
/// ```
/// use routeforge_core::test_support::sample_town;
/// use routeforge_data::FeatureBuilder;
///
/// # fn main() -> Result<(), routeforge_data::NodeStoreError> {
/// let mut builder = FeatureBuilder::new(vec!["building".to_owned()]);
/// let mut features = Vec::new();
/// for entity in sample_town() {
///     features.extend(builder.feature(&entity)?);
/// }
/// assert_eq!(features.len(), 1);
/// assert_eq!(features[0].id, "way/103");
/// # Ok(())
/// # }
/// ```
pub struct FeatureBuilder {
    keys: Vec<String>,
    locations: Box<dyn NodeStore>,
    stats: FeatureStats,
}

impl fmt::Debug for FeatureBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureBuilder")
            .field("keys", &self.keys)
            .field("locations", &self.locations.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl FeatureBuilder {
    /// Builder selecting entities by `keys`; an empty list selects any tag.
    pub fn new(keys: Vec<String>) -> Self {
        Self::with_node_store(keys, Box::new(InMemoryNodeStore::new()))
    }

    /// Builder recording node locations in `locations`.
    pub fn with_node_store(keys: Vec<String>, locations: Box<dyn NodeStore>) -> Self {
        Self {
            keys,
            locations,
            stats: FeatureStats::default(),
        }
    }

    /// Tag keys that make an entity feature-worthy.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Counters so far.
    pub const fn stats(&self) -> FeatureStats {
        self.stats
    }

    fn selects(&self, tags: &Tags) -> bool {
        if self.keys.is_empty() {
            return !tags.is_empty();
        }
        self.keys.iter().any(|key| tags.contains_key(key))
    }

    /// The feature derived from `entity`, if any.
    ///
    /// Fails only when the node store cannot record a location.
    pub fn feature(&mut self, entity: &OsmEntity) -> Result<Option<Feature>, NodeStoreError> {
        match entity {
            OsmEntity::Node(node) => self.node_feature(node),
            OsmEntity::Way(way) => Ok(self.way_feature(way)),
            OsmEntity::Relation(relation) => {
                if self.selects(&relation.tags) {
                    self.stats.skipped_relations += 1;
                    debug!("relation {} has no feature geometry", relation.id);
                }
                Ok(None)
            }
        }
    }

    fn node_feature(&mut self, node: &Node) -> Result<Option<Feature>, NodeStoreError> {
        if !node.has_valid_location() {
            return Ok(None);
        }
        self.locations.insert(node.id, node.location)?;
        if !self.selects(&node.tags) {
            return Ok(None);
        }
        self.stats.points += 1;
        Ok(Some(Feature::new(
            EntityKind::Node,
            node.id,
            Geometry::Point(Point(node.location)),
            node.tags.clone(),
        )))
    }

    fn way_feature(&mut self, way: &Way) -> Option<Feature> {
        if !self.selects(&way.tags) {
            return None;
        }
        let Some(coords) = way
            .node_refs
            .iter()
            .map(|id| self.locations.get(*id))
            .collect::<Option<Vec<_>>>()
        else {
            self.stats.incomplete_ways += 1;
            return None;
        };
        if coords.len() < 2 {
            self.stats.incomplete_ways += 1;
            return None;
        }

        let line = LineString::new(coords);
        let geometry = if way.is_closed() && is_area(&way.tags) {
            self.stats.polygons += 1;
            Geometry::Polygon(Polygon::new(line, Vec::new()))
        } else {
            self.stats.lines += 1;
            Geometry::LineString(line)
        };
        Some(Feature::new(EntityKind::Way, way.id, geometry, way.tags.clone()))
    }

    /// Release the node store, deleting a memory-mapped one, and return the
    /// final counters.
    pub fn finish(&mut self) -> FeatureStats {
        let locations = std::mem::replace(&mut self.locations, Box::new(InMemoryNodeStore::new()));
        debug!("releasing {} cached node locations", locations.len());
        drop(locations);
        self.log_summary();
        self.stats
    }

    fn log_summary(&self) {
        let FeatureStats {
            points,
            lines,
            polygons,
            incomplete_ways,
            skipped_relations,
        } = self.stats;
        debug!("features: {points} points, {lines} lines, {polygons} polygons");
        if incomplete_ways > 0 {
            warn!("skipped {incomplete_ways} ways with unresolved node locations");
        }
        if skipped_relations > 0 {
            debug!("skipped {skipped_relations} relations");
        }
    }
}

fn is_area(tags: &Tags) -> bool {
    tags.get("area").is_some_and(|value| value == "yes") || tags.contains_key("building")
}
