//! Facade crate for routeforge.
//!
//! This crate re-exports the pipeline compiler and executor together with the
//! domain types and data collaborators the pipeline stages exchange.

#![forbid(unsafe_code)]

pub use routeforge_core::{
    ContractionProfile, ContractionRegistry, Feature, Metric, OsmEntity, RoutingGraph,
    VehicleProfile, VehicleRegistry,
};

pub use routeforge_data::{EntitySummary, FeatureBuilder, GraphBuilder, PbfEntityStream};

pub use routeforge_pipeline::{
    Command, CommandRegistry, CompileError, ExecutionOptions, InvalidCommand, PipelineError,
    PipelineReport, Record, compile, execute, execute_with, validate,
};
