//! Routing graph model produced by the graph-writing stage.
//!
//! Vertices are the OSM nodes used by at least one routable way; every pair
//! of consecutive way nodes becomes one edge. Per-vehicle access is stored as
//! forward/backward bitmasks indexed by the position of the vehicle in
//! [`RoutingGraph::vehicles`], and each requested contraction profile adds a
//! weight table aligned with [`RoutingGraph::edges`].

mod format;

pub use format::{GRAPH_MAGIC, GRAPH_VERSION, GraphFormatError, load_graph, read_graph, write_graph};

use geo::Coord;
use serde::{Deserialize, Serialize};

/// Largest number of vehicles an edge bitmask can describe.
pub const MAX_VEHICLES: usize = 8;

/// Mean Earth radius used for great-circle lengths, in metres.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A graph vertex backed by an OSM node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Identifier of the originating node.
    pub osm_id: i64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Vertex {
    /// Position of the vertex.
    pub const fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}

/// A directed segment between two consecutive way nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Index of the first vertex in node order.
    pub source: u32,
    /// Index of the second vertex in node order.
    pub target: u32,
    /// Identifier of the way the segment belongs to.
    pub way_id: i64,
    /// Great-circle length in metres.
    pub length_m: f32,
    /// Bit `i` is set when vehicle `i` may travel `source -> target`.
    pub forward: u8,
    /// Bit `i` is set when vehicle `i` may travel `target -> source`.
    pub backward: u8,
}

impl Edge {
    /// Whether vehicle `index` may use the edge in either direction.
    pub const fn allows(&self, index: usize) -> bool {
        if index >= MAX_VEHICLES {
            return false;
        }
        let bit = 1_u8 << index;
        (self.forward | self.backward) & bit != 0
    }
}

/// Edge weights for one contraction profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    /// Canonical name of the contraction profile.
    pub profile: String,
    /// One weight per edge; `f32::INFINITY` marks edges the vehicle cannot use.
    pub weights: Vec<f32>,
}

/// A routable graph built for a set of vehicles.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoutingGraph {
    /// Vehicle names; the position is the bit index used by edge masks.
    pub vehicles: Vec<String>,
    /// Vertices, in first-use order.
    pub vertices: Vec<Vertex>,
    /// Edges, in way order.
    pub edges: Vec<Edge>,
    /// Weight tables, one per contraction profile.
    pub weights: Vec<WeightTable>,
}

impl RoutingGraph {
    /// Weight table for a contraction profile, if it was requested.
    pub fn weights_for(&self, profile: &str) -> Option<&WeightTable> {
        self.weights.iter().find(|table| table.profile == profile)
    }
}

/// Great-circle distance between two WGS84 coordinates, in metres.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use routeforge_core::graph::haversine_m;
///
/// let brussels = Coord { x: 4.3517, y: 50.8503 };
/// let antwerp = Coord { x: 4.4025, y: 51.2194 };
/// let metres = haversine_m(brussels, antwerp);
/// assert!((41_000.0..42_000.0).contains(&metres));
/// ```
pub fn haversine_m(from: Coord<f64>, to: Coord<f64>) -> f64 {
    let lat1 = from.y.to_radians();
    let lat2 = to.y.to_radians();
    let d_lat = (to.y - from.y).to_radians();
    let d_lon = (to.x - from.x).to_radians();
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0b001, 0b000, 0, true)]
    #[case(0b000, 0b010, 1, true)]
    #[case(0b001, 0b001, 2, false)]
    #[case(0b111, 0b111, 9, false)]
    fn edge_masks(#[case] forward: u8, #[case] backward: u8, #[case] index: usize, #[case] allowed: bool) {
        let edge = Edge {
            source: 0,
            target: 1,
            way_id: 1,
            length_m: 1.0,
            forward,
            backward,
        };
        assert_eq!(edge.allows(index), allowed);
    }

    #[test]
    fn haversine_is_zero_for_identical_points() {
        let point = Coord { x: 13.4, y: 52.5 };
        assert!(haversine_m(point, point).abs() < 1.0e-9);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let metres = haversine_m(Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 1.0 });
        assert!((111_000.0..111_400.0).contains(&metres), "got {metres}");
    }
}
