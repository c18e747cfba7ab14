//! Core domain types for the routeforge OSM pipeline.
//!
//! The crate defines the entities and features that flow between pipeline
//! stages, the vehicle and contraction profiles consulted when a routing
//! graph is built, and the on-disk graph format. It performs no I/O beyond
//! reading and writing graph files.

#![forbid(unsafe_code)]

mod contraction;
mod entity;
mod feature;
pub mod graph;
mod vehicle;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use contraction::{ContractionProfile, ContractionRegistry, Metric};
pub use entity::{EntityKind, Member, Node, OsmEntity, Relation, Tags, Way, collect_tags};
pub use feature::Feature;
pub use graph::RoutingGraph;
pub use vehicle::{Access, VehicleProfile, VehicleRegistry};
