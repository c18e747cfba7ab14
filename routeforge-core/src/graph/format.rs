//! Persisted routing graph file format.
//!
//! A graph file is the `RFGR` magic, a little-endian `u16` format version
//! and a `bincode` payload of [`RoutingGraph`].

use std::{
    fs::File,
    io::{BufReader, Read, Write},
    path::{Path, PathBuf},
};

use bincode::{deserialize_from, serialize_into};
use thiserror::Error;

use super::RoutingGraph;

/// File identifier for persisted routing graphs.
pub const GRAPH_MAGIC: [u8; 4] = *b"RFGR";

/// Supported version of the persisted graph format.
pub const GRAPH_VERSION: u16 = 1;

/// Error emitted when writing or reading a routing graph.
#[derive(Debug, Error)]
pub enum GraphFormatError {
    /// The graph file could not be opened.
    #[error("failed to open routing graph {path}")]
    Open {
        /// Location of the graph file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Reading or writing raw bytes failed.
    #[error("routing graph I/O failed")]
    Io(#[source] std::io::Error),
    /// The in-memory graph could not be encoded.
    #[error("failed to encode routing graph")]
    Encode(#[source] bincode::Error),
    /// The payload could not be decoded.
    #[error("failed to decode routing graph")]
    Decode(#[source] bincode::Error),
    /// The stream did not start with the expected header.
    #[error("invalid routing graph magic: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        /// Expected byte sequence identifying a graph file.
        expected: [u8; 4],
        /// Sequence read from the stream.
        found: [u8; 4],
    },
    /// The header names a format version this build cannot read.
    #[error("unsupported routing graph version {found}; supported version is {supported}")]
    UnsupportedVersion {
        /// Version present in the header.
        found: u16,
        /// Version written by this build.
        supported: u16,
    },
}

/// Serialise `graph` into `writer` behind the `RFGR` header.
///
/// The writer is flushed but not synced; callers owning a file decide when
/// the bytes become durable.
pub fn write_graph<W: Write>(writer: &mut W, graph: &RoutingGraph) -> Result<(), GraphFormatError> {
    writer.write_all(&GRAPH_MAGIC).map_err(GraphFormatError::Io)?;
    serialize_into(&mut *writer, &GRAPH_VERSION).map_err(GraphFormatError::Encode)?;
    serialize_into(&mut *writer, graph).map_err(GraphFormatError::Encode)?;
    writer.flush().map_err(GraphFormatError::Io)
}

/// Decode a routing graph from `reader`, validating the header first.
pub fn read_graph<R: Read>(reader: &mut R) -> Result<RoutingGraph, GraphFormatError> {
    let mut magic = [0_u8; 4];
    reader.read_exact(&mut magic).map_err(GraphFormatError::Io)?;
    if magic != GRAPH_MAGIC {
        return Err(GraphFormatError::InvalidMagic {
            expected: GRAPH_MAGIC,
            found: magic,
        });
    }

    let version: u16 = deserialize_from(&mut *reader).map_err(GraphFormatError::Decode)?;
    if version != GRAPH_VERSION {
        return Err(GraphFormatError::UnsupportedVersion {
            found: version,
            supported: GRAPH_VERSION,
        });
    }

    deserialize_from(reader).map_err(GraphFormatError::Decode)
}

/// Open and decode the graph stored at `path`.
pub fn load_graph(path: &Path) -> Result<RoutingGraph, GraphFormatError> {
    let file = File::open(path).map_err(|source| GraphFormatError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_graph(&mut BufReader::new(file))
}
