use std::fmt;

use camino::Utf8PathBuf;

use super::{CommandArgs, StageCommand};
use crate::error::{CompileError, ResourceError};
use crate::processor::{GeoJsonTarget, Processor};
use crate::record::{RecordKind, StageShape};
use crate::tokenizer::render_value;

/// Write features as a GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteGeoJson {
    /// Output file.
    pub path: Utf8PathBuf,
}

impl StageCommand for WriteGeoJson {
    const SWITCHES: &'static [&'static str] = &["--wgj", "--write-geojson"];
    const SUMMARY: &'static str = "write features to a GeoJSON file";
    const SHAPE: StageShape = StageShape::target(RecordKind::Feature);

    fn parse(mut args: CommandArgs<'_>) -> Result<Self, CompileError> {
        let path = args.require_positional("output file path")?;
        args.finish()?;
        Ok(Self { path: path.into() })
    }

    fn open(self) -> Result<Processor, ResourceError> {
        let target = GeoJsonTarget::create(&self.path).map_err(|source| ResourceError::Output {
            path: self.path.clone(),
            source,
        })?;
        Ok(Processor::Target(Box::new(target)))
    }
}

impl fmt::Display for WriteGeoJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            Self::canonical_switch(),
            render_value(self.path.as_str())
        )
    }
}
