use std::fmt;

use camino::Utf8PathBuf;

use super::{CommandArgs, StageCommand};
use crate::error::{CompileError, ResourceError};
use crate::processor::{Processor, SummaryTarget};
use crate::record::{RecordKind, StageShape};
use crate::tokenizer::render_value;

/// Write entity counts and bounds as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// Output file.
    pub path: Utf8PathBuf,
}

impl StageCommand for WriteSummary {
    const SWITCHES: &'static [&'static str] = &["--ws", "--write-summary"];
    const SUMMARY: &'static str = "write entity counts and bounds to a JSON file";
    const SHAPE: StageShape = StageShape::target(RecordKind::Entity);

    fn parse(mut args: CommandArgs<'_>) -> Result<Self, CompileError> {
        let path = args.require_positional("output file path")?;
        args.finish()?;
        Ok(Self { path: path.into() })
    }

    fn open(self) -> Result<Processor, ResourceError> {
        let target = SummaryTarget::create(&self.path).map_err(|source| ResourceError::Output {
            path: self.path.clone(),
            source,
        })?;
        Ok(Processor::Target(Box::new(target)))
    }
}

impl fmt::Display for WriteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            Self::canonical_switch(),
            render_value(self.path.as_str())
        )
    }
}
