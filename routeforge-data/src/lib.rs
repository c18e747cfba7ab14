//! Data collaborators for the routeforge pipeline.
//!
//! Responsibilities:
//! - Decode OSM PBF files into a lazy entity stream.
//! - Store node coordinates in memory or in a memory-mapped file.
//! - Build routing graphs and geo features from entities.
//!
//! Boundaries:
//! - Do not parse command lines or wire stages together (lives in
//!   `routeforge-pipeline`).
//! - Domain types and the graph file format live in `routeforge-core`.
//!
//! Invariants:
//! - Nothing here buffers a whole input; memory is bounded by one PBF blob
//!   plus whatever the graph or feature builder retains.
#![deny(unsafe_code)]

mod features;
mod graph_builder;
pub mod node_store;
mod pbf;
mod summary;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[cfg(test)]
mod tests;

pub use features::{FeatureBuilder, FeatureStats};
pub use graph_builder::{GraphBuildError, GraphBuildStats, GraphBuilder};
pub use node_store::{InMemoryNodeStore, MappedNodeStore, NodeStore, NodeStoreError};
pub use pbf::{PbfEntityStream, PbfReadError};
pub use summary::{Bounds, EntitySummary};
