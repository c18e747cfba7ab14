//! Small, deterministic OSM extracts used by unit and behaviour tests across
//! the workspace.

use geo::Coord;

use crate::{EntityKind, Member, Node, OsmEntity, Relation, Way, collect_tags};

/// Build a node from raw parts.
pub fn node(id: i64, lon: f64, lat: f64, tags: &[(&str, &str)]) -> OsmEntity {
    OsmEntity::Node(Node::new(
        id,
        Coord { x: lon, y: lat },
        collect_tags(tags.iter().copied()),
    ))
}

/// Build a way from raw parts.
pub fn way(id: i64, refs: &[i64], tags: &[(&str, &str)]) -> OsmEntity {
    OsmEntity::Way(Way::new(id, refs.to_vec(), collect_tags(tags.iter().copied())))
}

/// Build a relation whose members are all ways with an empty role.
pub fn relation(id: i64, way_ids: &[i64], tags: &[(&str, &str)]) -> OsmEntity {
    let members = way_ids
        .iter()
        .map(|&member| Member {
            kind: EntityKind::Way,
            id: member,
            role: String::new(),
        })
        .collect();
    OsmEntity::Relation(Relation::new(id, members, collect_tags(tags.iter().copied())))
}

/// A tiny town: five nodes along two streets, a footpath, a building and a
/// route relation, in PBF order (nodes, then ways, then relations).
///
/// - way 100: residential street `1 -> 2 -> 3`, open to every vehicle;
/// - way 101: one-way primary `3 -> 4`;
/// - way 102: footway `4 -> 5`;
/// - way 103: closed building outline `1 -> 2 -> 5 -> 1`;
/// - relation 200: bus route over ways 100 and 101.
///
/// Node 5 carries a `shop` tag; node 4 lies outside the box
/// `left=4.0 right=4.02 bottom=50.0 top=50.02`.
pub fn sample_town() -> Vec<OsmEntity> {
    vec![
        node(1, 4.000, 50.000, &[]),
        node(2, 4.010, 50.000, &[]),
        node(3, 4.010, 50.010, &[("highway", "traffic_signals")]),
        node(4, 4.030, 50.010, &[]),
        node(5, 4.015, 50.005, &[("shop", "bakery"), ("name", "Crumbs")]),
        way(100, &[1, 2, 3], &[("highway", "residential"), ("name", "Main Street")]),
        way(101, &[3, 4], &[("highway", "primary"), ("oneway", "yes")]),
        way(102, &[4, 5], &[("highway", "footway")]),
        way(103, &[1, 2, 5, 1], &[("building", "yes")]),
        relation(200, &[100, 101], &[("type", "route"), ("route", "bus")]),
    ]
}
