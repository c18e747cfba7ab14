use std::collections::HashSet;

use geo::{Intersects, Rect};
use log::debug;
use routeforge_core::{EntityKind, OsmEntity};
use routeforge_data::FeatureBuilder;

use super::{TransformProcessor, unexpected};
use crate::error::StageFailure;
use crate::record::{Record, RecordKind};

/// Keeps entities inside a bounding box.
///
/// Nodes are kept when their location lies in the box, edges included.
/// Ways are kept when they reference a kept node, and relations when they
/// have a kept member. Members must precede the entities referencing them,
/// which holds for PBF files in the usual node, way, relation order.
pub struct BoundingBoxFilter {
    bounds: Rect<f64>,
    nodes: HashSet<i64>,
    ways: HashSet<i64>,
    relations: HashSet<i64>,
    dropped: u64,
}

impl BoundingBoxFilter {
    /// Filter for `bounds`.
    pub fn new(bounds: Rect<f64>) -> Self {
        Self {
            bounds,
            nodes: HashSet::new(),
            ways: HashSet::new(),
            relations: HashSet::new(),
            dropped: 0,
        }
    }

    fn keeps(&mut self, entity: &OsmEntity) -> bool {
        match entity {
            OsmEntity::Node(node) => {
                let inside = node.has_valid_location() && self.bounds.intersects(&node.location);
                if inside {
                    self.nodes.insert(node.id);
                }
                inside
            }
            OsmEntity::Way(way) => {
                let inside = way.node_refs.iter().any(|id| self.nodes.contains(id));
                if inside {
                    self.ways.insert(way.id);
                }
                inside
            }
            OsmEntity::Relation(relation) => {
                let inside = relation.members.iter().any(|member| {
                    let kept = match member.kind {
                        EntityKind::Node => &self.nodes,
                        EntityKind::Way => &self.ways,
                        EntityKind::Relation => &self.relations,
                    };
                    kept.contains(&member.id)
                });
                if inside {
                    self.relations.insert(relation.id);
                }
                inside
            }
        }
    }
}

impl TransformProcessor for BoundingBoxFilter {
    fn apply(&mut self, record: Record) -> Result<Option<Record>, StageFailure> {
        let Record::Entity(entity) = &record else {
            return Err(unexpected(RecordKind::Entity, &record));
        };
        if self.keeps(entity) {
            Ok(Some(record))
        } else {
            self.dropped += 1;
            Ok(None)
        }
    }

    fn finish(&mut self) {
        debug!(
            "bounding box kept {} nodes, {} ways and {} relations; dropped {}",
            self.nodes.len(),
            self.ways.len(),
            self.relations.len(),
            self.dropped
        );
    }
}

/// Turns entities into features.
pub struct FeatureTransform {
    builder: FeatureBuilder,
}

impl FeatureTransform {
    /// Transform driven by `builder`.
    pub const fn new(builder: FeatureBuilder) -> Self {
        Self { builder }
    }
}

impl TransformProcessor for FeatureTransform {
    fn apply(&mut self, record: Record) -> Result<Option<Record>, StageFailure> {
        match &record {
            Record::Entity(entity) => Ok(self.builder.feature(entity)?.map(Record::Feature)),
            Record::Feature(_) => Err(unexpected(RecordKind::Entity, &record)),
        }
    }

    fn finish(&mut self) {
        self.builder.finish();
    }
}
