//! Routing graph construction from an entity stream.
//!
//! Nodes are recorded in a [`NodeStore`]; every way that at least one
//! selected vehicle may use becomes a chain of edges between consecutive
//! nodes. Weight tables are filled per contraction profile as edges are
//! added, so the builder never revisits a way.

use std::collections::HashMap;

use log::{debug, info, warn};
use routeforge_core::graph::{Edge, MAX_VEHICLES, Vertex, WeightTable, haversine_m};
use routeforge_core::{ContractionProfile, Metric, OsmEntity, RoutingGraph, VehicleProfile, Way};
use thiserror::Error;

use crate::node_store::{NodeStore, NodeStoreError};

/// Errors raised while building a routing graph.
#[derive(Debug, Error)]
pub enum GraphBuildError {
    /// More vehicles were requested than an edge bitmask can hold.
    #[error("at most {max} vehicles fit in one graph, got {count}")]
    TooManyVehicles {
        /// Requested vehicle count.
        count: usize,
        /// Supported maximum.
        max: usize,
    },
    /// A contraction profile targets a vehicle that is not being built.
    #[error("contraction profile {profile} needs vehicle {vehicle}, which is not selected")]
    UnselectedVehicle {
        /// Canonical name of the profile.
        profile: String,
        /// Vehicle the profile depends on.
        vehicle: String,
    },
    /// The vertex count no longer fits the on-disk index type.
    #[error("routing graph exceeds {max} vertices")]
    TooManyVertices {
        /// Largest supported vertex count.
        max: u32,
    },
    /// The node store failed.
    #[error(transparent)]
    NodeStore(#[from] NodeStoreError),
}

/// Counters describing a finished build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphBuildStats {
    /// Nodes recorded in the store.
    pub nodes: usize,
    /// Ways that produced at least one edge.
    pub routable_ways: u64,
    /// Ways no selected vehicle may use.
    pub skipped_ways: u64,
    /// Way node references without a recorded location.
    pub missing_nodes: u64,
}

/// Incremental routing graph builder.
///
/// # Examples
/// ```
/// use routeforge_core::test_support::sample_town;
/// use routeforge_core::VehicleRegistry;
/// use routeforge_data::{GraphBuilder, InMemoryNodeStore};
///
/// # fn main() -> Result<(), routeforge_data::GraphBuildError> {
/// let car = VehicleRegistry::builtin().get("car").expect("built-in");
/// let mut builder = GraphBuilder::new(vec![car], Vec::new(), Box::new(InMemoryNodeStore::new()))?;
/// for entity in sample_town() {
///     builder.consume(&entity)?;
/// }
/// let (graph, stats) = builder.finish()?;
/// assert_eq!(graph.edges.len(), 3);
/// assert_eq!(stats.skipped_ways, 2);
/// # Ok(())
/// # }
/// ```
pub struct GraphBuilder {
    vehicles: Vec<&'static VehicleProfile>,
    /// Profile paired with the index of its vehicle in `vehicles`.
    profiles: Vec<(ContractionProfile, usize)>,
    nodes: Box<dyn NodeStore>,
    vertex_index: HashMap<i64, u32>,
    graph: RoutingGraph,
    stats: GraphBuildStats,
}

impl GraphBuilder {
    /// Start a build for `vehicles`, computing weights for `profiles`.
    pub fn new(
        vehicles: Vec<&'static VehicleProfile>,
        profiles: Vec<ContractionProfile>,
        nodes: Box<dyn NodeStore>,
    ) -> Result<Self, GraphBuildError> {
        if vehicles.len() > MAX_VEHICLES {
            return Err(GraphBuildError::TooManyVehicles {
                count: vehicles.len(),
                max: MAX_VEHICLES,
            });
        }
        let profiles = profiles
            .into_iter()
            .map(|profile| {
                vehicles
                    .iter()
                    .position(|vehicle| *vehicle == profile.vehicle())
                    .map(|index| (profile, index))
                    .ok_or_else(|| GraphBuildError::UnselectedVehicle {
                        profile: profile.name(),
                        vehicle: profile.vehicle().name().to_owned(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let graph = RoutingGraph {
            vehicles: vehicles.iter().map(|v| v.name().to_owned()).collect(),
            weights: profiles
                .iter()
                .map(|(profile, _)| WeightTable {
                    profile: profile.name(),
                    weights: Vec::new(),
                })
                .collect(),
            ..RoutingGraph::default()
        };
        Ok(Self {
            vehicles,
            profiles,
            nodes,
            vertex_index: HashMap::new(),
            graph,
            stats: GraphBuildStats::default(),
        })
    }

    /// Feed one entity into the build.
    pub fn consume(&mut self, entity: &OsmEntity) -> Result<(), GraphBuildError> {
        match entity {
            OsmEntity::Node(node) => {
                if node.has_valid_location() {
                    self.nodes.insert(node.id, node.location)?;
                }
                Ok(())
            }
            OsmEntity::Way(way) => self.add_way(way),
            OsmEntity::Relation(_) => Ok(()),
        }
    }

    fn add_way(&mut self, way: &Way) -> Result<(), GraphBuildError> {
        let mut forward = 0_u8;
        let mut backward = 0_u8;
        let mut speeds = Vec::with_capacity(self.vehicles.len());
        for (index, vehicle) in self.vehicles.iter().enumerate() {
            let access = vehicle.access(&way.tags);
            if access.forward {
                forward |= 1 << index;
            }
            if access.backward {
                backward |= 1 << index;
            }
            speeds.push(vehicle.speed_kmh(&way.tags).filter(|_| access.any()));
        }
        if forward | backward == 0 {
            self.stats.skipped_ways += 1;
            return Ok(());
        }

        let mut added = false;
        let mut previous: Option<(u32, geo::Coord<f64>)> = None;
        for &node_id in &way.node_refs {
            let Some(location) = self.nodes.get(node_id) else {
                self.stats.missing_nodes += 1;
                previous = None;
                continue;
            };
            let vertex = self.vertex(node_id, location)?;
            if let Some((source, from)) = previous
                && source != vertex
            {
                let length_m = haversine_m(from, location);
                self.push_edge(
                    Edge {
                        source,
                        target: vertex,
                        way_id: way.id,
                        length_m: length_m as f32,
                        forward,
                        backward,
                    },
                    &speeds,
                );
                added = true;
            }
            previous = Some((vertex, location));
        }
        if added {
            self.stats.routable_ways += 1;
        }
        Ok(())
    }

    fn vertex(&mut self, osm_id: i64, location: geo::Coord<f64>) -> Result<u32, GraphBuildError> {
        if let Some(&index) = self.vertex_index.get(&osm_id) {
            return Ok(index);
        }
        let index = u32::try_from(self.graph.vertices.len())
            .map_err(|_| GraphBuildError::TooManyVertices { max: u32::MAX })?;
        self.graph.vertices.push(Vertex {
            osm_id,
            lon: location.x,
            lat: location.y,
        });
        self.vertex_index.insert(osm_id, index);
        Ok(index)
    }

    fn push_edge(&mut self, edge: Edge, speeds: &[Option<u16>]) {
        for ((profile, vehicle), table) in self.profiles.iter().zip(&mut self.graph.weights) {
            let speed = speeds.get(*vehicle).copied().flatten();
            table.weights.push(edge_weight(profile.metric(), edge.length_m, speed));
        }
        self.graph.edges.push(edge);
    }

    /// Release the node store and return the graph with build counters.
    pub fn finish(mut self) -> Result<(RoutingGraph, GraphBuildStats), GraphBuildError> {
        self.stats.nodes = self.nodes.len();
        self.nodes.finish()?;
        if self.stats.missing_nodes > 0 {
            warn!(
                "skipped {} way node references without a known location",
                self.stats.missing_nodes
            );
        }
        debug!(
            "{} routable ways, {} ways skipped for the selected vehicles",
            self.stats.routable_ways, self.stats.skipped_ways
        );
        info!(
            "built routing graph with {} vertices and {} edges for {}",
            self.graph.vertices.len(),
            self.graph.edges.len(),
            self.graph.vehicles.join(",")
        );
        Ok((self.graph, self.stats))
    }
}

/// Weight of an edge for a profile: metres for the shortest metric, seconds
/// at nominal speed for the fastest one. Edges the vehicle cannot use weigh
/// `f32::INFINITY`.
fn edge_weight(metric: Metric, length_m: f32, speed_kmh: Option<u16>) -> f32 {
    match (metric, speed_kmh) {
        (_, None | Some(0)) => f32::INFINITY,
        (Metric::Shortest, Some(_)) => length_m,
        (Metric::Fastest, Some(speed)) => length_m * 3.6 / f32::from(speed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_store::InMemoryNodeStore;
    use routeforge_core::test_support::{node, sample_town, way};
    use routeforge_core::{ContractionRegistry, VehicleRegistry};
    use rstest::{fixture, rstest};

    #[fixture]
    fn registry() -> VehicleRegistry {
        VehicleRegistry::builtin()
    }

    fn build(
        vehicles: &[&str],
        profiles: &[&str],
        entities: &[OsmEntity],
    ) -> (RoutingGraph, GraphBuildStats) {
        let registry = VehicleRegistry::builtin();
        let contraction = ContractionRegistry::builtin();
        let vehicles = vehicles
            .iter()
            .map(|name| registry.get(name).expect("vehicle"))
            .collect();
        let profiles = profiles
            .iter()
            .map(|name| contraction.get(name).expect("profile"))
            .collect();
        let mut builder = GraphBuilder::new(vehicles, profiles, Box::new(InMemoryNodeStore::new()))
            .expect("builder");
        for entity in entities {
            builder.consume(entity).expect("consume");
        }
        builder.finish().expect("finish")
    }

    #[test]
    fn car_graph_covers_streets_only() {
        let (graph, stats) = build(&["car"], &[], &sample_town());
        assert_eq!(graph.vehicles, ["car"]);
        let ways: Vec<_> = graph.edges.iter().map(|edge| edge.way_id).collect();
        assert_eq!(ways, [100, 100, 101]);
        assert_eq!(graph.vertices.len(), 4);
        assert_eq!(stats.routable_ways, 2);
        assert_eq!(stats.skipped_ways, 2);
        assert_eq!(stats.missing_nodes, 0);
    }

    #[test]
    fn oneway_sets_forward_bit_only() {
        let (graph, _) = build(&["car", "pedestrian"], &[], &sample_town());
        let primary = graph
            .edges
            .iter()
            .find(|edge| edge.way_id == 101)
            .expect("primary edge");
        assert_eq!(primary.forward, 0b11);
        assert_eq!(primary.backward, 0b10, "pedestrians ignore oneway");

        let footway = graph
            .edges
            .iter()
            .find(|edge| edge.way_id == 102)
            .expect("footway edge");
        assert!(!footway.allows(0));
        assert!(footway.allows(1));
    }

    #[test]
    fn weight_tables_follow_profiles() {
        let (graph, _) = build(&["car", "pedestrian"], &["car", "pedestrian.shortest"], &sample_town());
        let car = graph.weights_for("car").expect("car weights");
        let walk = graph.weights_for("pedestrian.shortest").expect("walk weights");
        assert_eq!(car.weights.len(), graph.edges.len());
        assert_eq!(walk.weights.len(), graph.edges.len());

        for ((edge, fastest), shortest) in graph.edges.iter().zip(&car.weights).zip(&walk.weights) {
            if edge.way_id == 102 {
                assert!(fastest.is_infinite(), "cars may not use the footway");
            } else {
                assert!(fastest.is_finite());
            }
            assert!((shortest - edge.length_m).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn missing_nodes_break_the_chain() {
        let entities = [
            node(1, 0.0, 0.0, &[]),
            node(3, 0.0, 0.002, &[]),
            way(9, &[1, 2, 3], &[("highway", "residential")]),
        ];
        let (graph, stats) = build(&["car"], &[], &entities);
        assert!(graph.edges.is_empty());
        assert_eq!(stats.missing_nodes, 1);
        assert_eq!(stats.routable_ways, 0);
    }

    #[rstest]
    fn unselected_vehicle_profiles_are_rejected(registry: VehicleRegistry) {
        let car = registry.get("car").expect("car");
        let walk = ContractionRegistry::builtin()
            .get("pedestrian")
            .expect("profile");
        let Err(err) = GraphBuilder::new(vec![car], vec![walk], Box::new(InMemoryNodeStore::new()))
        else {
            panic!("expected contradictory profiles to fail");
        };
        match err {
            GraphBuildError::UnselectedVehicle { profile, vehicle } => {
                assert_eq!(profile, "pedestrian");
                assert_eq!(vehicle, "pedestrian");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[rstest]
    #[case(Metric::Shortest, 1000.0, Some(50), 1000.0)]
    #[case(Metric::Fastest, 1000.0, Some(36), 100.0)]
    #[case(Metric::Fastest, 1000.0, None, f32::INFINITY)]
    #[case(Metric::Shortest, 1000.0, Some(0), f32::INFINITY)]
    fn edge_weights(
        #[case] metric: Metric,
        #[case] length: f32,
        #[case] speed: Option<u16>,
        #[case] expected: f32,
    ) {
        let weight = edge_weight(metric, length, speed);
        assert!(
            (weight == expected) || (weight - expected).abs() < 1.0e-3,
            "expected {expected}, got {weight}"
        );
    }
}
