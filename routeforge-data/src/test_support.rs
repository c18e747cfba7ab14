//! Test-only OSM PBF writer.
//!
//! Encodes entities as an uncompressed `OSMHeader` blob followed by one
//! `OSMData` blob holding plain (non-dense) nodes, ways and relations, each
//! kind in its own primitive group. The output is small and deterministic, and
//! `osmpbf` decodes it like any other extract.

use std::collections::HashMap;
use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};
use camino::Utf8Path;
use routeforge_core::{EntityKind, OsmEntity, Tags};

const WIRE_VARINT: u64 = 0;
const WIRE_LEN: u64 = 2;

/// Write `entities` to `path` as an OSM PBF file.
pub fn write_pbf(path: &Utf8Path, entities: &[OsmEntity]) -> io::Result<()> {
    let mut file = routeforge_fs::create_utf8_file(path)?;
    file.write_all(&encode_pbf(entities))?;
    file.sync_all()
}

/// Encode `entities` as OSM PBF bytes.
pub fn encode_pbf(entities: &[OsmEntity]) -> Vec<u8> {
    let mut header = Message::default();
    header.bytes(4, b"OsmSchema-V0.6");
    header.bytes(16, b"routeforge-tests");

    let mut out = Vec::new();
    write_blob(&mut out, "OSMHeader", &header.0);
    write_blob(&mut out, "OSMData", &primitive_block(entities));
    out
}

fn write_blob(out: &mut Vec<u8>, kind: &str, payload: &[u8]) {
    let mut blob = Message::default();
    blob.bytes(1, payload);
    blob.uint(2, payload.len() as u64);

    let mut header = Message::default();
    header.bytes(1, kind.as_bytes());
    header.uint(3, blob.0.len() as u64);

    // Writing into a Vec cannot fail.
    let _ = out.write_u32::<BigEndian>(header.0.len() as u32);
    out.extend_from_slice(&header.0);
    out.extend_from_slice(&blob.0);
}

fn primitive_block(entities: &[OsmEntity]) -> Vec<u8> {
    let mut strings = StringTable::default();
    let mut nodes = Message::default();
    let mut ways = Message::default();
    let mut relations = Message::default();

    for entity in entities {
        match entity {
            OsmEntity::Node(node) => {
                let mut message = Message::default();
                message.sint(1, node.id);
                tag_fields(&mut message, &node.tags, &mut strings);
                message.sint(8, degrees_to_units(node.location.y));
                message.sint(9, degrees_to_units(node.location.x));
                nodes.bytes(1, &message.0);
            }
            OsmEntity::Way(way) => {
                let mut message = Message::default();
                message.uint(1, way.id as u64);
                tag_fields(&mut message, &way.tags, &mut strings);
                message.packed(8, delta_zigzag(way.node_refs.iter().copied()));
                ways.bytes(3, &message.0);
            }
            OsmEntity::Relation(relation) => {
                let mut message = Message::default();
                message.uint(1, relation.id as u64);
                tag_fields(&mut message, &relation.tags, &mut strings);
                let roles = relation
                    .members
                    .iter()
                    .map(|member| u64::from(strings.index(&member.role)));
                message.packed(8, roles);
                message.packed(9, delta_zigzag(relation.members.iter().map(|m| m.id)));
                let kinds = relation.members.iter().map(|member| match member.kind {
                    EntityKind::Node => 0,
                    EntityKind::Way => 1,
                    EntityKind::Relation => 2,
                });
                message.packed(10, kinds);
                relations.bytes(4, &message.0);
            }
        }
    }

    let mut block = Message::default();
    block.bytes(1, &strings.encode());
    for group in [nodes, ways, relations] {
        if !group.0.is_empty() {
            block.bytes(2, &group.0);
        }
    }
    block.0
}

fn tag_fields(message: &mut Message, tags: &Tags, strings: &mut StringTable) {
    let keys: Vec<u64> = tags.keys().map(|key| u64::from(strings.index(key))).collect();
    let values: Vec<u64> = tags
        .values()
        .map(|value| u64::from(strings.index(value)))
        .collect();
    message.packed(2, keys);
    message.packed(3, values);
}

/// Coordinates are stored in units of 100 nanodegrees (the default
/// granularity).
fn degrees_to_units(degrees: f64) -> i64 {
    (degrees * 1.0e7).round() as i64
}

fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn delta_zigzag(values: impl IntoIterator<Item = i64>) -> Vec<u64> {
    let mut previous = 0_i64;
    values
        .into_iter()
        .map(|value| {
            let delta = value - previous;
            previous = value;
            zigzag(delta)
        })
        .collect()
}

#[derive(Default)]
struct StringTable {
    entries: Vec<String>,
    index: HashMap<String, u32>,
}

impl StringTable {
    fn index(&mut self, value: &str) -> u32 {
        if self.entries.is_empty() {
            self.entries.push(String::new());
            self.index.insert(String::new(), 0);
        }
        if let Some(&existing) = self.index.get(value) {
            return existing;
        }
        let next = self.entries.len() as u32;
        self.entries.push(value.to_owned());
        self.index.insert(value.to_owned(), next);
        next
    }

    fn encode(mut self) -> Vec<u8> {
        self.index("");
        let mut table = Message::default();
        for entry in &self.entries {
            table.bytes(1, entry.as_bytes());
        }
        table.0
    }
}

/// Minimal protobuf writer covering the wire types the OSM schema uses.
#[derive(Default)]
struct Message(Vec<u8>);

impl Message {
    fn varint(buf: &mut Vec<u8>, mut value: u64) {
        while value >= 0x80 {
            buf.push((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
        buf.push(value as u8);
    }

    fn key(&mut self, field: u64, wire: u64) {
        Self::varint(&mut self.0, (field << 3) | wire);
    }

    fn uint(&mut self, field: u64, value: u64) {
        self.key(field, WIRE_VARINT);
        Self::varint(&mut self.0, value);
    }

    fn sint(&mut self, field: u64, value: i64) {
        self.uint(field, zigzag(value));
    }

    fn bytes(&mut self, field: u64, data: &[u8]) {
        self.key(field, WIRE_LEN);
        Self::varint(&mut self.0, data.len() as u64);
        self.0.extend_from_slice(data);
    }

    fn packed(&mut self, field: u64, values: impl IntoIterator<Item = u64>) {
        let mut inner = Vec::new();
        for value in values {
            Self::varint(&mut inner, value);
        }
        if !inner.is_empty() {
            self.bytes(field, &inner);
        }
    }
}
