//! Error taxonomy of the pipeline compiler and executor.
//!
//! Each layer owns one type: the compiler returns [`CompileError`],
//! processor construction returns [`InvalidCommand`], and the executor
//! returns [`PipelineError`], which wraps construction and stage failures.
//! Messages describe one layer; walk [`std::error::Error::source`] for the
//! full chain.

use camino::Utf8PathBuf;
use routeforge_core::graph::GraphFormatError;
use routeforge_data::{GraphBuildError, NodeStoreError, PbfReadError};
use thiserror::Error;

use crate::record::{RecordKind, StageRole};
use crate::tokenizer::MalformedParameter;

/// A command's parameters were rejected by its parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{switch}: {message}")]
pub struct CommandLineError {
    /// Switch as written on the command line.
    pub switch: String,
    /// Human-readable reason.
    pub message: String,
}

impl CommandLineError {
    /// Error for `switch` with `message`.
    pub fn new(switch: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            switch: switch.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while compiling arguments into commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The token at the cursor is not a registered switch.
    #[error("unknown switch `{token}` at argument {position}")]
    UnknownSwitch {
        /// Offending token.
        token: String,
        /// Zero-based index in the argument list.
        position: usize,
    },
    /// A parameter token could not be split.
    #[error("malformed parameter for {switch}")]
    MalformedParameter {
        /// Switch owning the parameter.
        switch: String,
        /// Tokenizer failure.
        source: MalformedParameter,
    },
    /// A command parser rejected its parameters.
    #[error(transparent)]
    CommandLine(#[from] CommandLineError),
}

impl CompileError {
    /// Switch the error is attributed to, if any.
    pub fn switch(&self) -> Option<&str> {
        match self {
            Self::UnknownSwitch { .. } => None,
            Self::MalformedParameter { switch, .. } => Some(switch),
            Self::CommandLine(err) => Some(&err.switch),
        }
    }
}

/// Resource acquisition failures behind [`InvalidCommand`].
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The input could not be opened.
    #[error(transparent)]
    Input(#[from] PbfReadError),
    /// An output file could not be created.
    #[error("failed to create output {path}")]
    Output {
        /// Location of the output.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The memory-mapped node store could not be created.
    #[error(transparent)]
    NodeStore(#[from] NodeStoreError),
    /// The graph builder rejected its configuration.
    #[error(transparent)]
    Graph(#[from] GraphBuildError),
    /// Two paths of one command resolve to the same file.
    #[error("`map=` {map} is the same file as `graph=` {graph}")]
    SameFile {
        /// Routing graph output.
        graph: Utf8PathBuf,
        /// Node store location.
        map: Utf8PathBuf,
    },
    /// Resolving an output location failed.
    #[error("failed to resolve {path}")]
    Resolve {
        /// Location being resolved.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A contraction profile needs a vehicle that is not being built.
    #[error("contraction profile `{profile}` needs vehicle `{vehicle}`, which is not selected")]
    Contradictory {
        /// Canonical profile name.
        profile: String,
        /// Vehicle the profile depends on.
        vehicle: String,
    },
}

/// A command could not be turned into a processor.
#[derive(Debug, Error)]
#[error("cannot start `{command}`")]
pub struct InvalidCommand {
    /// Rendered form of the command.
    pub command: String,
    /// What went wrong.
    #[source]
    pub source: ResourceError,
}

/// Why a stage failed while records were flowing.
#[derive(Debug, Error)]
pub enum StageFailure {
    /// The source could not decode its input.
    #[error(transparent)]
    Read(#[from] PbfReadError),
    /// A record of the wrong kind reached the stage.
    #[error("expected {expected} records, got {found}")]
    UnexpectedRecord {
        /// Kind the stage consumes.
        expected: RecordKind,
        /// Kind that arrived.
        found: RecordKind,
    },
    /// Recording a node location failed.
    #[error(transparent)]
    NodeStore(#[from] NodeStoreError),
    /// Building the routing graph failed.
    #[error(transparent)]
    Graph(#[from] GraphBuildError),
    /// Serialising the routing graph failed.
    #[error(transparent)]
    GraphFormat(#[from] GraphFormatError),
    /// Writing an output file failed.
    #[error("failed to write {path}")]
    Io {
        /// Location of the output.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Encoding JSON output failed.
    #[error("failed to encode JSON for {path}")]
    Json {
        /// Location of the output.
        path: Utf8PathBuf,
        /// Encoder error.
        #[source]
        source: serde_json::Error,
    },
    /// A feature carries a geometry the exporter cannot write.
    #[error("feature {id} has an unsupported {geometry} geometry")]
    UnsupportedGeometry {
        /// Feature identifier.
        id: String,
        /// Geometry type name.
        geometry: &'static str,
    },
}

/// A stage failed mid-stream.
#[derive(Debug, Error)]
#[error("stage `{stage}` failed")]
pub struct StageError {
    /// Rendered command of the failing stage.
    pub stage: String,
    /// What went wrong.
    #[source]
    pub source: StageFailure,
}

/// Structural problems found before any processor is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeViolation {
    /// No commands were given.
    #[error("a pipeline needs at least a source and a target")]
    Empty,
    /// The first command does not produce records.
    #[error("`{command}` is a {role}, but a pipeline must start with a source")]
    FirstNotSource {
        /// Rendered command.
        command: String,
        /// Its declared role.
        role: StageRole,
    },
    /// The last command does not consume records.
    #[error("`{command}` is a {role}, but a pipeline must end with a target")]
    LastNotTarget {
        /// Rendered command.
        command: String,
        /// Its declared role.
        role: StageRole,
    },
    /// A command between the ends is not a transform.
    #[error("`{command}` is a {role}, but only transforms may sit inside a pipeline")]
    InteriorNotTransform {
        /// Rendered command.
        command: String,
        /// Its declared role.
        role: StageRole,
    },
    /// Adjacent stages disagree on the record kind.
    #[error("`{upstream}` produces {produces} records, but `{downstream}` consumes {consumes} records")]
    KindMismatch {
        /// Rendered upstream command.
        upstream: String,
        /// Kind it produces.
        produces: RecordKind,
        /// Rendered downstream command.
        downstream: String,
        /// Kind it consumes.
        consumes: RecordKind,
    },
}

/// Errors returned by the executor.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The command sequence cannot form a pipeline.
    #[error("invalid pipeline shape")]
    InvalidPipelineShape(#[source] ShapeViolation),
    /// A processor could not be created.
    #[error(transparent)]
    InvalidCommand(#[from] InvalidCommand),
    /// A stage failed while running.
    #[error(transparent)]
    Stage(#[from] StageError),
}

impl From<ShapeViolation> for PipelineError {
    fn from(violation: ShapeViolation) -> Self {
        Self::InvalidPipelineShape(violation)
    }
}
