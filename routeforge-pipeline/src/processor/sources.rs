use log::debug;
use routeforge_data::PbfEntityStream;

use super::SourceProcessor;
use crate::error::StageFailure;
use crate::record::Record;

/// Entities decoded lazily from a PBF file.
pub struct PbfSource {
    stream: PbfEntityStream,
    produced: u64,
}

impl PbfSource {
    /// Source over an opened stream.
    pub const fn new(stream: PbfEntityStream) -> Self {
        Self {
            stream,
            produced: 0,
        }
    }
}

impl SourceProcessor for PbfSource {
    fn next_record(&mut self) -> Option<Result<Record, StageFailure>> {
        match self.stream.next() {
            Some(Ok(entity)) => {
                self.produced += 1;
                Some(Ok(Record::Entity(entity)))
            }
            Some(Err(err)) => Some(Err(err.into())),
            None => {
                debug!(
                    "read {} entities from {}",
                    self.produced,
                    self.stream.path()
                );
                None
            }
        }
    }
}
