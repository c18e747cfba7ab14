use std::fmt;

use camino::Utf8PathBuf;
use log::debug;
use routeforge_core::{ContractionProfile, ContractionRegistry, VehicleProfile, VehicleRegistry};
use routeforge_data::{GraphBuilder, InMemoryNodeStore, MappedNodeStore, NodeStore};
use routeforge_fs::OutputFile;

use super::{CommandArgs, StageCommand};
use crate::error::{CompileError, ResourceError};
use crate::processor::{GraphTarget, Processor};
use crate::record::{RecordKind, StageShape};
use crate::tokenizer::{render_list, render_value};

/// Build a routing graph from entities and write it to disk.
///
/// `graph=` names the output. `vehicles=` selects the vehicle profiles,
/// `car` by default. `contract=` adds weight tables for contraction
/// profiles. `map=` spills node locations to a memory-mapped file instead of
/// keeping them in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteGraph {
    /// Graph output file.
    pub graph: Utf8PathBuf,
    /// Selected vehicles in request order.
    pub vehicles: Vec<&'static VehicleProfile>,
    /// Contraction profiles in request order.
    pub contract: Vec<ContractionProfile>,
    /// Memory-mapped node store file.
    pub map: Option<Utf8PathBuf>,
}

impl WriteGraph {
    fn vehicles(args: &mut CommandArgs<'_>) -> Result<Vec<&'static VehicleProfile>, CompileError> {
        let registry = VehicleRegistry::builtin();
        let Some(names) = args.take_list("vehicles")? else {
            return registry
                .default_profile()
                .map(|profile| vec![profile])
                .ok_or_else(|| args.error("no default vehicle profile is registered"));
        };
        if names.is_empty() {
            return Err(args.error("`vehicles=` must name at least one vehicle"));
        }
        let mut vehicles: Vec<&'static VehicleProfile> = Vec::with_capacity(names.len());
        for name in &names {
            let profile = registry
                .get(name)
                .ok_or_else(|| args.error(format!("unknown vehicle `{name}`")))?;
            if vehicles.contains(&profile) {
                return Err(args.error(format!("vehicle `{name}` selected more than once")));
            }
            vehicles.push(profile);
        }
        Ok(vehicles)
    }

    fn contract(args: &mut CommandArgs<'_>) -> Result<Vec<ContractionProfile>, CompileError> {
        let registry = ContractionRegistry::builtin();
        let names = args.take_list("contract")?.unwrap_or_default();
        let mut profiles: Vec<ContractionProfile> = Vec::with_capacity(names.len());
        for name in &names {
            let profile = registry
                .get(name)
                .ok_or_else(|| args.error(format!("unknown contraction profile `{name}`")))?;
            if profiles.contains(&profile) {
                return Err(args.error(format!(
                    "contraction profile `{name}` requested more than once"
                )));
            }
            profiles.push(profile);
        }
        Ok(profiles)
    }

    /// The first contraction profile whose vehicle is not selected.
    fn contradiction(&self) -> Option<ContractionProfile> {
        self.contract
            .iter()
            .copied()
            .find(|profile| !self.vehicles.contains(&profile.vehicle()))
    }
}

impl StageCommand for WriteGraph {
    const SWITCHES: &'static [&'static str] = &["--wgr", "--write-graph"];
    const SUMMARY: &'static str = "build a routing graph and write it to a file";
    const SHAPE: StageShape = StageShape::target(RecordKind::Entity);

    fn parse(mut args: CommandArgs<'_>) -> Result<Self, CompileError> {
        let graph = Utf8PathBuf::from(args.require_value("graph")?);
        let vehicles = Self::vehicles(&mut args)?;
        let contract = Self::contract(&mut args)?;
        let map = args.take_value("map")?.map(Utf8PathBuf::from);
        if map.as_ref() == Some(&graph) {
            return Err(args.error("`map=` must differ from `graph=`"));
        }
        args.finish()?;
        Ok(Self {
            graph,
            vehicles,
            contract,
            map,
        })
    }

    fn open(self) -> Result<Processor, ResourceError> {
        if let Some(profile) = self.contradiction() {
            return Err(ResourceError::Contradictory {
                profile: profile.name(),
                vehicle: profile.vehicle().name().to_owned(),
            });
        }
        let output = OutputFile::create(&self.graph).map_err(|source| ResourceError::Output {
            path: self.graph.clone(),
            source,
        })?;
        // A failure past this point drops `output`, which removes the graph file.
        let nodes: Box<dyn NodeStore> = match &self.map {
            Some(map) => {
                debug!("spilling node locations to {map}");
                let store = MappedNodeStore::create(map)?;
                let same = routeforge_fs::same_file(&self.graph, map).map_err(|source| {
                    ResourceError::Resolve {
                        path: map.clone(),
                        source,
                    }
                })?;
                if same {
                    return Err(ResourceError::SameFile {
                        graph: self.graph.clone(),
                        map: map.clone(),
                    });
                }
                Box::new(store)
            }
            None => Box::new(InMemoryNodeStore::new()),
        };
        let builder = GraphBuilder::new(self.vehicles, self.contract, nodes)?;
        Ok(Processor::Target(Box::new(GraphTarget::new(
            output, builder, self.map,
        ))))
    }
}

impl fmt::Display for WriteGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vehicles: Vec<&str> = self.vehicles.iter().map(|vehicle| vehicle.name()).collect();
        write!(
            f,
            "{} graph={} vehicles={}",
            Self::canonical_switch(),
            render_value(self.graph.as_str()),
            render_list(&vehicles)
        )?;
        if !self.contract.is_empty() {
            let names: Vec<String> = self.contract.iter().map(ContractionProfile::name).collect();
            write!(f, " contract={}", render_list(&names))?;
        }
        if let Some(map) = &self.map {
            write!(f, " map={}", render_value(map.as_str()))?;
        }
        Ok(())
    }
}
