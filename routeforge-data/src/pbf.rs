//! Lazy OSM PBF entity stream.
//!
//! The stream decodes one blob at a time and hands out owned
//! [`OsmEntity`] values, so memory use is bounded by the largest blob rather
//! than by the extract.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;

use camino::{Utf8Path, Utf8PathBuf};
use geo::Coord;
use log::debug;
use osmpbf::{BlobDecode, BlobReader, Element, RelMemberType};
use routeforge_core::{EntityKind, Member, Node, OsmEntity, Relation, Way, collect_tags};
use thiserror::Error;

/// Errors returned while reading an OSM PBF file.
#[derive(Debug, Error)]
pub enum PbfReadError {
    /// The file could not be opened.
    #[error("failed to open OSM PBF file at {path}")]
    Open {
        /// Location of the input.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The path exists but is not a regular file.
    #[error("OSM PBF input {path} is not a file")]
    NotAFile {
        /// Location of the input.
        path: Utf8PathBuf,
    },
    /// A blob or element could not be decoded.
    #[error("failed to decode OSM PBF data at {path}")]
    Decode {
        /// Location of the input.
        path: Utf8PathBuf,
        /// Decoder error returned by `osmpbf`.
        #[source]
        source: osmpbf::Error,
    },
}

/// Forward-only, non-restartable sequence of entities read from a PBF file.
///
/// After the first error the stream is exhausted.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use routeforge_data::PbfEntityStream;
///
/// # fn main() -> Result<(), routeforge_data::PbfReadError> {
/// let mut ways = 0;
/// for entity in PbfEntityStream::open(Utf8Path::new("berlin.osm.pbf"))? {
///     if matches!(entity?, routeforge_core::OsmEntity::Way(_)) {
///         ways += 1;
///     }
/// }
/// println!("{ways} ways");
/// # Ok(())
/// # }
/// ```
pub struct PbfEntityStream {
    path: Utf8PathBuf,
    blobs: BlobReader<BufReader<File>>,
    pending: VecDeque<OsmEntity>,
    exhausted: bool,
}

impl PbfEntityStream {
    /// Open `path` for streaming. Nothing is decoded until the first pull.
    pub fn open(path: &Utf8Path) -> Result<Self, PbfReadError> {
        let open_error = |source| PbfReadError::Open {
            path: path.to_path_buf(),
            source,
        };
        if !routeforge_fs::file_is_file(path).map_err(open_error)? {
            return Err(PbfReadError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        let file = routeforge_fs::open_utf8_file(path).map_err(open_error)?;
        debug!("opened OSM PBF input {path}");
        Ok(Self {
            path: path.to_path_buf(),
            blobs: BlobReader::new(BufReader::new(file)),
            pending: VecDeque::new(),
            exhausted: false,
        })
    }

    /// Location of the input.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn decode_error(&self, source: osmpbf::Error) -> PbfReadError {
        PbfReadError::Decode {
            path: self.path.clone(),
            source,
        }
    }

    /// Decode blobs until one yields entities. Returns `false` at end of file.
    fn refill(&mut self) -> Result<bool, PbfReadError> {
        while let Some(blob) = self.blobs.next() {
            let blob = blob.map_err(|source| self.decode_error(source))?;
            match blob.decode().map_err(|source| self.decode_error(source))? {
                BlobDecode::OsmData(block) => {
                    for element in block.elements() {
                        let entity =
                            convert_element(element).map_err(|source| self.decode_error(source))?;
                        self.pending.push_back(entity);
                    }
                    if !self.pending.is_empty() {
                        return Ok(true);
                    }
                }
                BlobDecode::OsmHeader(_) => {}
                BlobDecode::Unknown(kind) => {
                    debug!("skipping unknown blob type {kind} in {}", self.path);
                }
            }
        }
        Ok(false)
    }
}

impl Iterator for PbfEntityStream {
    type Item = Result<OsmEntity, PbfReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(entity) = self.pending.pop_front() {
            return Some(Ok(entity));
        }
        if self.exhausted {
            return None;
        }
        match self.refill() {
            Ok(true) => self.pending.pop_front().map(Ok),
            Ok(false) => {
                self.exhausted = true;
                None
            }
            Err(err) => {
                self.exhausted = true;
                self.pending.clear();
                Some(Err(err))
            }
        }
    }
}

fn convert_element(element: Element<'_>) -> Result<OsmEntity, osmpbf::Error> {
    let entity = match element {
        Element::Node(node) => OsmEntity::Node(Node::new(
            node.id(),
            Coord {
                x: node.lon(),
                y: node.lat(),
            },
            collect_tags(node.tags()),
        )),
        Element::DenseNode(node) => OsmEntity::Node(Node::new(
            node.id(),
            Coord {
                x: node.lon(),
                y: node.lat(),
            },
            collect_tags(node.tags()),
        )),
        Element::Way(way) => OsmEntity::Way(Way::new(
            way.id(),
            way.refs().collect(),
            collect_tags(way.tags()),
        )),
        Element::Relation(relation) => {
            let members = relation
                .members()
                .map(|member| {
                    let kind = match member.member_type {
                        RelMemberType::Node => EntityKind::Node,
                        RelMemberType::Way => EntityKind::Way,
                        RelMemberType::Relation => EntityKind::Relation,
                    };
                    Ok(Member {
                        kind,
                        id: member.member_id,
                        role: member.role()?.to_owned(),
                    })
                })
                .collect::<Result<Vec<_>, osmpbf::Error>>()?;
            OsmEntity::Relation(Relation::new(
                relation.id(),
                members,
                collect_tags(relation.tags()),
            ))
        }
    };
    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_pbf;
    use routeforge_core::test_support::sample_town;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn workspace() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        (dir, root)
    }

    fn assert_close(actual: f64, expected: f64) {
        let delta = (actual - expected).abs();
        assert!(delta <= 1.0e-7, "expected {expected}, got {actual}");
    }

    #[rstest]
    fn streams_entities_in_file_order(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let path = root.join("town.osm.pbf");
        let expected = sample_town();
        write_pbf(&path, &expected).expect("write fixture");

        let entities: Vec<OsmEntity> = PbfEntityStream::open(&path)
            .expect("open")
            .collect::<Result<_, _>>()
            .expect("decode");

        let ids: Vec<_> = entities.iter().map(|e| (e.kind(), e.id())).collect();
        let expected_ids: Vec<_> = expected.iter().map(|e| (e.kind(), e.id())).collect();
        assert_eq!(ids, expected_ids);

        let Some(OsmEntity::Node(bakery)) = entities.get(4) else {
            panic!("expected node 5 at index 4");
        };
        assert_close(bakery.location.x, 4.015);
        assert_close(bakery.location.y, 50.005);
        assert_eq!(bakery.tags.get("shop").map(String::as_str), Some("bakery"));

        let Some(OsmEntity::Way(street)) = entities.get(5) else {
            panic!("expected way 100 at index 5");
        };
        assert_eq!(street.node_refs, [1, 2, 3]);

        let Some(OsmEntity::Relation(route)) = entities.last() else {
            panic!("expected a trailing relation");
        };
        let members: Vec<_> = route.members.iter().map(|m| (m.kind, m.id)).collect();
        assert_eq!(members, [(EntityKind::Way, 100), (EntityKind::Way, 101)]);
    }

    #[rstest]
    fn empty_file_yields_no_entities(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let path = root.join("empty.osm.pbf");
        std::fs::write(&path, b"").expect("write empty file");

        let mut stream = PbfEntityStream::open(&path).expect("open");
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[rstest]
    fn missing_file_is_an_open_error(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let missing = root.join("missing.osm.pbf");
        let Err(err) = PbfEntityStream::open(&missing) else {
            panic!("expected failure for missing file");
        };
        match err {
            PbfReadError::Open { path, .. } => assert_eq!(path, missing),
            other => panic!("expected open error, got {other:?}"),
        }
    }

    #[rstest]
    fn directories_are_rejected(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let Err(err) = PbfEntityStream::open(&root) else {
            panic!("expected failure for a directory");
        };
        assert!(matches!(err, PbfReadError::NotAFile { path } if path == root));
    }

    #[rstest]
    fn corrupt_data_is_a_decode_error_then_ends(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let path = root.join("corrupt.osm.pbf");
        std::fs::write(&path, b"definitely not protobuf").expect("write corrupt file");

        let mut stream = PbfEntityStream::open(&path).expect("open");
        match stream.next() {
            Some(Err(PbfReadError::Decode { path: reported, .. })) => assert_eq!(reported, path),
            other => panic!("expected decode error, got {other:?}"),
        }
        assert!(stream.next().is_none(), "stream should end after an error");
    }
}
