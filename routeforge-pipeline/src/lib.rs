//! Command-driven OSM processing pipelines.
//!
//! Responsibilities:
//! - Tokenize switch and `key=value` arguments, with quoting and lists.
//! - Map switches to command parsers and compile argument lists into
//!   commands.
//! - Validate the source, transform, target shape of a command list and run
//!   it as a chain of pull-based processors.
//!
//! Boundaries:
//! - Decoding, graph building and feature geometry live in
//!   `routeforge-data`; this crate only wires and sequences them.
//! - No process-level concerns: logging setup and exit codes belong to the
//!   binary.
//!
//! Invariants:
//! - Records stream one at a time from source to target; no stage buffers the
//!   input.
//! - A failed run leaves no target output behind.
//!
//! # Examples
//! ```no_run
//! use routeforge_pipeline::{CommandRegistry, compile, execute};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = CommandRegistry::with_builtin_commands();
//! let commands = compile(
//!     &registry,
//!     &["--read-pbf", "in.osm.pbf", "--write-graph", "graph=out.graph", "vehicles=car,bicycle"],
//! )?;
//! let report = execute(commands)?;
//! println!("{} records, outputs {:?}", report.records, report.outputs);
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

pub mod command;
mod compiler;
mod error;
mod executor;
pub mod processor;
mod record;
mod registry;
pub mod tokenizer;

pub use command::{Command, StageCommand};
pub use compiler::compile;
pub use error::{
    CommandLineError, CompileError, InvalidCommand, PipelineError, ResourceError, ShapeViolation,
    StageError, StageFailure,
};
pub use executor::{ExecutionOptions, PipelineReport, execute, execute_with, validate};
pub use processor::Processor;
pub use record::{Record, RecordKind, StageRole, StageShape};
pub use registry::{CommandRegistry, CommandSpec, ParseFn};
pub use tokenizer::MalformedParameter;
