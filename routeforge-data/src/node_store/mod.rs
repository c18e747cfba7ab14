//! Node coordinate stores used while building routing graphs.
//!
//! Ways only reference node ids, so the graph builder records every node
//! location it sees and resolves way geometry from the store. Small extracts
//! fit an in-memory map; large ones can spill to a memory-mapped file.

mod mapped;

pub use mapped::MappedNodeStore;

use std::collections::HashMap;

use camino::Utf8PathBuf;
use geo::Coord;
use thiserror::Error;

/// Errors raised by node stores.
#[derive(Debug, Error)]
pub enum NodeStoreError {
    /// Creating, growing or flushing the backing file failed.
    #[error("node store I/O failed for {path}")]
    Io {
        /// Location of the backing file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The store would exceed the addressable size of the mapping.
    #[error("node store {path} cannot hold more than {max} records")]
    Full {
        /// Location of the backing file.
        path: Utf8PathBuf,
        /// Largest supported record count.
        max: usize,
    },
}

/// Keyed storage for node coordinates.
pub trait NodeStore {
    /// Record the location of node `id`. Later inserts for the same id win.
    fn insert(&mut self, id: i64, location: Coord<f64>) -> Result<(), NodeStoreError>;

    /// Location of node `id`, if it was recorded.
    fn get(&self, id: i64) -> Option<Coord<f64>>;

    /// Number of recorded nodes.
    fn len(&self) -> usize;

    /// Whether no node was recorded.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush any backing storage and release the store.
    fn finish(self: Box<Self>) -> Result<(), NodeStoreError>;
}

/// Node store backed by a hash map.
#[derive(Debug, Default)]
pub struct InMemoryNodeStore {
    nodes: HashMap<i64, Coord<f64>>,
}

impl InMemoryNodeStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeStore for InMemoryNodeStore {
    fn insert(&mut self, id: i64, location: Coord<f64>) -> Result<(), NodeStoreError> {
        self.nodes.insert(id, location);
        Ok(())
    }

    fn get(&self, id: i64) -> Option<Coord<f64>> {
        self.nodes.get(&id).copied()
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn finish(self: Box<Self>) -> Result<(), NodeStoreError> {
        Ok(())
    }
}
