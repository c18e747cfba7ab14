//! Pipeline commands: one variant per stage kind.
//!
//! A command is parsed from the parameters following its switch, renders
//! back to a token line that compiles to an equal command, and turns into a
//! runtime [`Processor`] once. Parsing never touches the filesystem; all
//! resources are acquired by [`Command::create_processor`].

mod args;
mod bounding_box;
mod features;
mod read_pbf;
mod write_geojson;
mod write_graph;
mod write_summary;

use std::fmt;

pub use args::CommandArgs;
pub use bounding_box::BoundingBox;
pub use features::Features;
pub use read_pbf::ReadPbf;
pub use write_geojson::WriteGeoJson;
pub use write_graph::WriteGraph;
pub use write_summary::WriteSummary;

use crate::error::{CompileError, InvalidCommand, ResourceError};
use crate::processor::Processor;
use crate::record::StageShape;

/// Behaviour shared by every command variant.
pub trait StageCommand: Sized + fmt::Display + Into<Command> {
    /// Switch aliases, short form first, canonical long form last.
    const SWITCHES: &'static [&'static str];
    /// One-line description for help output.
    const SUMMARY: &'static str;
    /// Declared role and record kinds.
    const SHAPE: StageShape;

    /// Build the command from its parameters.
    fn parse(args: CommandArgs<'_>) -> Result<Self, CompileError>;

    /// Acquire resources and build the processor.
    fn open(self) -> Result<Processor, ResourceError>;

    /// Canonical switch used when rendering.
    fn canonical_switch() -> &'static str {
        Self::SWITCHES.last().copied().unwrap_or_default()
    }
}

/// A parsed pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `--read-pbf`
    ReadPbf(ReadPbf),
    /// `--write-graph`
    WriteGraph(WriteGraph),
    /// `--bounding-box`
    BoundingBox(BoundingBox),
    /// `--features`
    Features(Features),
    /// `--write-geojson`
    WriteGeoJson(WriteGeoJson),
    /// `--write-summary`
    WriteSummary(WriteSummary),
}

macro_rules! command_variants {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl From<$variant> for Command {
                fn from(command: $variant) -> Self {
                    Self::$variant(command)
                }
            }
        )+

        impl Command {
            /// Declared role and record kinds.
            pub const fn shape(&self) -> StageShape {
                match self {
                    $(Self::$variant(_) => <$variant as StageCommand>::SHAPE,)+
                }
            }

            fn open(self) -> Result<Processor, ResourceError> {
                match self {
                    $(Self::$variant(command) => command.open(),)+
                }
            }
        }

        impl fmt::Display for Command {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant(command) => fmt::Display::fmt(command, f),)+
                }
            }
        }
    };
}

command_variants!(
    ReadPbf,
    WriteGraph,
    BoundingBox,
    Features,
    WriteGeoJson,
    WriteSummary,
);

impl Command {
    /// Consume the command and acquire its resources.
    ///
    /// Anything acquired before a failure is released again, and the error
    /// names the command's rendered form.
    pub fn create_processor(self) -> Result<Processor, InvalidCommand> {
        let command = self.to_string();
        self.open()
            .map_err(|source| InvalidCommand { command, source })
    }
}
