use std::fmt;

use camino::Utf8PathBuf;
use routeforge_data::PbfEntityStream;

use super::{CommandArgs, StageCommand};
use crate::error::{CompileError, ResourceError};
use crate::processor::{PbfSource, Processor};
use crate::record::{RecordKind, StageShape};
use crate::tokenizer::render_value;

/// Read entities from an OSM PBF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPbf {
    /// Input file.
    pub path: Utf8PathBuf,
}

impl StageCommand for ReadPbf {
    const SWITCHES: &'static [&'static str] = &["--rb", "--read-pbf"];
    const SUMMARY: &'static str = "read OSM entities from a PBF file";
    const SHAPE: StageShape = StageShape::source(RecordKind::Entity);

    fn parse(mut args: CommandArgs<'_>) -> Result<Self, CompileError> {
        let path = args.require_positional("input file path")?;
        args.finish()?;
        Ok(Self { path: path.into() })
    }

    fn open(self) -> Result<Processor, ResourceError> {
        let stream = PbfEntityStream::open(&self.path)?;
        Ok(Processor::Source(Box::new(PbfSource::new(stream))))
    }
}

impl fmt::Display for ReadPbf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            Self::canonical_switch(),
            render_value(self.path.as_str())
        )
    }
}
