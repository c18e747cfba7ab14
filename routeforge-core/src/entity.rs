//! OpenStreetMap entities as they flow through a pipeline.
//!
//! Decoders own the wire format; everything downstream works on these owned
//! values so stages can hold records across pulls without borrowing the
//! decoder's buffers.

use std::collections::BTreeMap;
use std::fmt;

use geo::Coord;

/// Free-form OSM key/value tags, ordered by key for deterministic output.
pub type Tags = BTreeMap<String, String>;

/// Collect borrowed `(key, value)` pairs into owned [`Tags`].
pub fn collect_tags<'a, T>(tags: T) -> Tags
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

/// A single OSM element.
#[derive(Debug, Clone, PartialEq)]
pub enum OsmEntity {
    /// A point with coordinates.
    Node(Node),
    /// An ordered list of node references.
    Way(Way),
    /// A group of members with roles.
    Relation(Relation),
}

impl OsmEntity {
    /// Raw OSM identifier of the element.
    pub const fn id(&self) -> i64 {
        match self {
            Self::Node(node) => node.id,
            Self::Way(way) => way.id,
            Self::Relation(relation) => relation.id,
        }
    }

    /// Kind of the element.
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Node(_) => EntityKind::Node,
            Self::Way(_) => EntityKind::Way,
            Self::Relation(_) => EntityKind::Relation,
        }
    }

    /// Tags attached to the element.
    pub const fn tags(&self) -> &Tags {
        match self {
            Self::Node(node) => &node.tags,
            Self::Way(way) => &way.tags,
            Self::Relation(relation) => &relation.tags,
        }
    }
}

/// Discriminates the three OSM element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// See [`Node`].
    Node,
    /// See [`Way`].
    Way,
    /// See [`Relation`].
    Relation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        })
    }
}

/// An OSM node. Coordinates are WGS84 with `x = longitude`, `y = latitude`.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Raw OSM identifier.
    pub id: i64,
    /// Position of the node.
    pub location: Coord<f64>,
    /// Tags attached to the node.
    pub tags: Tags,
}

impl Node {
    /// Construct a node.
    pub const fn new(id: i64, location: Coord<f64>, tags: Tags) -> Self {
        Self { id, location, tags }
    }

    /// Whether the coordinate lies inside the WGS84 range.
    pub fn has_valid_location(&self) -> bool {
        let Coord { x: lon, y: lat } = self.location;
        lon.is_finite()
            && lat.is_finite()
            && (-180.0..=180.0).contains(&lon)
            && (-90.0..=90.0).contains(&lat)
    }
}

/// An OSM way.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    /// Raw OSM identifier.
    pub id: i64,
    /// Referenced node identifiers, in order.
    pub node_refs: Vec<i64>,
    /// Tags attached to the way.
    pub tags: Tags,
}

impl Way {
    /// Construct a way.
    pub const fn new(id: i64, node_refs: Vec<i64>, tags: Tags) -> Self {
        Self {
            id,
            node_refs,
            tags,
        }
    }

    /// A way is closed when it has at least four references and ends where
    /// it starts.
    pub fn is_closed(&self) -> bool {
        self.node_refs.len() >= 4 && self.node_refs.first() == self.node_refs.last()
    }
}

/// Member of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Kind of the referenced element.
    pub kind: EntityKind,
    /// Raw identifier of the referenced element.
    pub id: i64,
    /// Role of the member inside the relation; may be empty.
    pub role: String,
}

/// An OSM relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Raw OSM identifier.
    pub id: i64,
    /// Members in declaration order.
    pub members: Vec<Member>,
    /// Tags attached to the relation.
    pub tags: Tags,
}

impl Relation {
    /// Construct a relation.
    pub const fn new(id: i64, members: Vec<Member>, tags: Tags) -> Self {
        Self { id, members, tags }
    }
}
