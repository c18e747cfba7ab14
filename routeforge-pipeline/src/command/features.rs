use std::fmt;

use camino::Utf8PathBuf;
use log::debug;
use routeforge_data::{FeatureBuilder, MappedNodeStore};

use super::{CommandArgs, StageCommand};
use crate::error::{CompileError, ResourceError};
use crate::processor::{FeatureTransform, Processor};
use crate::record::{RecordKind, StageShape};
use crate::tokenizer::{render_list, render_value};

/// Turn entities into geo features.
///
/// `keys=` lists the tag keys that make an entity feature-worthy; without
/// it any tagged entity qualifies. `map=` keeps node locations in a
/// memory-mapped scratch file, removed once the stage ends.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Features {
    /// Selecting tag keys.
    pub keys: Vec<String>,
    /// Memory-mapped node store file.
    pub map: Option<Utf8PathBuf>,
}

impl StageCommand for Features {
    const SWITCHES: &'static [&'static str] = &["--fe", "--features"];
    const SUMMARY: &'static str = "convert entities into point, line and polygon features";
    const SHAPE: StageShape = StageShape::transform(RecordKind::Entity, RecordKind::Feature);

    fn parse(mut args: CommandArgs<'_>) -> Result<Self, CompileError> {
        let keys = args.take_list("keys")?.unwrap_or_default();
        if keys.iter().any(String::is_empty) {
            return Err(args.error("`keys=` items must not be empty"));
        }
        let map = args.take_value("map")?.map(Utf8PathBuf::from);
        args.finish()?;
        Ok(Self { keys, map })
    }

    fn open(self) -> Result<Processor, ResourceError> {
        let builder = match &self.map {
            Some(map) => {
                debug!("keeping feature node locations in {map}");
                let store = MappedNodeStore::create(map)?;
                FeatureBuilder::with_node_store(self.keys, Box::new(store))
            }
            None => FeatureBuilder::new(self.keys),
        };
        Ok(Processor::Transform(Box::new(FeatureTransform::new(
            builder,
        ))))
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::canonical_switch())?;
        if !self.keys.is_empty() {
            write!(f, " keys={}", render_list(&self.keys))?;
        }
        if let Some(map) = &self.map {
            write!(f, " map={}", render_value(map.as_str()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(rest: &[&str]) -> Result<Features, CompileError> {
        let args = CommandArgs::collect("--fe", rest)?;
        Features::parse(args)
    }

    fn workspace() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        (dir, root)
    }

    #[test]
    fn renders_keys_and_map() {
        let command = parse(&["keys=highway,name", "map=feature nodes.map"]).expect("parse");
        assert_eq!(
            command.to_string(),
            "--features keys=highway,name map=\"feature nodes.map\""
        );
    }

    #[test]
    fn map_creates_a_scratch_file_removed_with_the_processor() {
        let (_guard, root) = workspace();
        let map = root.join("features.map");
        let param = format!("map={map}");
        let command = parse(&[param.as_str()]).expect("parse");
        assert_eq!(command.map.as_ref(), Some(&map));

        let processor = command.open().expect("open");
        assert!(map.exists(), "open should create the node store");
        drop(processor);
        assert!(!map.exists(), "the node store should not outlive the stage");
    }

    #[test]
    fn without_map_no_file_is_created() {
        let (_guard, root) = workspace();
        let command = parse(&[]).expect("parse");
        assert!(command.map.is_none());

        let processor = command.open().expect("open");
        drop(processor);
        let entries = std::fs::read_dir(&root).expect("list tempdir").count();
        assert_eq!(entries, 0);
    }

    #[test]
    fn unusable_map_is_a_node_store_error() {
        let (_guard, root) = workspace();
        let blocker = root.join("blocker");
        std::fs::write(&blocker, b"file").expect("write blocker");
        let param = format!("map={blocker}/nodes.map");
        let command = parse(&[param.as_str()]).expect("parse");

        match command.open() {
            Err(ResourceError::NodeStore(_)) => {}
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("expected the node store to fail"),
        }
    }
}
