//! Runtime stages and the pull-based streams that connect them.
//!
//! A source hands out records one at a time, a transform maps each record
//! to zero or one records, and a target consumes records until the stream
//! ends and then finalises its outputs. The executor links them with
//! [`RecordStream`]s so each stage owns the stage upstream of it and nothing
//! buffers more than one record.

mod sources;
mod targets;
mod transforms;

use std::fmt;

use camino::Utf8PathBuf;

pub use sources::PbfSource;
pub use targets::{GeoJsonTarget, GraphTarget, SummaryTarget};
pub use transforms::{BoundingBoxFilter, FeatureTransform};

use crate::error::{StageError, StageFailure};
use crate::record::{Record, RecordKind, StageRole};

/// Produces records from an input resource.
pub trait SourceProcessor {
    /// The next record, or `None` once the input is exhausted.
    fn next_record(&mut self) -> Option<Result<Record, StageFailure>>;
}

/// Maps or filters records.
pub trait TransformProcessor {
    /// The record to pass downstream, or `None` to drop it.
    fn apply(&mut self, record: Record) -> Result<Option<Record>, StageFailure>;

    /// Called once after the upstream is exhausted.
    fn finish(&mut self) {}
}

/// Consumes records into an output resource.
pub trait TargetProcessor {
    /// Consume one record.
    fn consume(&mut self, record: Record) -> Result<(), StageFailure>;

    /// Finalise and commit the outputs, returning their paths. Dropping a
    /// target without finishing it removes its outputs.
    fn finish(self: Box<Self>) -> Result<Vec<Utf8PathBuf>, StageFailure>;
}

/// A runtime stage.
pub enum Processor {
    /// See [`SourceProcessor`].
    Source(Box<dyn SourceProcessor>),
    /// See [`TransformProcessor`].
    Transform(Box<dyn TransformProcessor>),
    /// See [`TargetProcessor`].
    Target(Box<dyn TargetProcessor>),
}

impl Processor {
    /// Role of the stage.
    pub const fn role(&self) -> StageRole {
        match self {
            Self::Source(_) => StageRole::Source,
            Self::Transform(_) => StageRole::Transform,
            Self::Target(_) => StageRole::Target,
        }
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Processor").field(&self.role()).finish()
    }
}

/// Lazy, forward-only sequence of records with failures attributed to the
/// stage that raised them.
pub type RecordStream = Box<dyn Iterator<Item = Result<Record, StageError>>>;

struct SourceStage {
    label: String,
    source: Box<dyn SourceProcessor>,
    done: bool,
}

impl Iterator for SourceStage {
    type Item = Result<Record, StageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.source.next_record();
        match item {
            Some(Ok(record)) => Some(Ok(record)),
            Some(Err(source)) => {
                self.done = true;
                Some(Err(StageError {
                    stage: self.label.clone(),
                    source,
                }))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

struct TransformStage {
    label: String,
    transform: Box<dyn TransformProcessor>,
    upstream: RecordStream,
    done: bool,
}

impl Iterator for TransformStage {
    type Item = Result<Record, StageError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let Some(item) = self.upstream.next() else {
                self.done = true;
                self.transform.finish();
                return None;
            };
            let record = match item {
                Ok(record) => record,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };
            match self.transform.apply(record) {
                Ok(Some(out)) => return Some(Ok(out)),
                Ok(None) => {}
                Err(source) => {
                    self.done = true;
                    return Some(Err(StageError {
                        stage: self.label.clone(),
                        source,
                    }));
                }
            }
        }
        None
    }
}

/// Stream the records of `source`, labelling its failures with `label`.
pub fn source_stream(label: String, source: Box<dyn SourceProcessor>) -> RecordStream {
    Box::new(SourceStage {
        label,
        source,
        done: false,
    })
}

/// Stream `upstream` through `transform`, labelling its failures with
/// `label`. The returned stream owns `upstream`.
pub fn transform_stream(
    label: String,
    transform: Box<dyn TransformProcessor>,
    upstream: RecordStream,
) -> RecordStream {
    Box::new(TransformStage {
        label,
        transform,
        upstream,
        done: false,
    })
}

/// Error for a record of the wrong kind.
pub(crate) const fn unexpected(expected: RecordKind, record: &Record) -> StageFailure {
    StageFailure::UnexpectedRecord {
        expected,
        found: record.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routeforge_core::test_support::sample_town;

    struct Entities(std::vec::IntoIter<Record>);

    impl SourceProcessor for Entities {
        fn next_record(&mut self) -> Option<Result<Record, StageFailure>> {
            self.0.next().map(Ok)
        }
    }

    struct Failing;

    impl SourceProcessor for Failing {
        fn next_record(&mut self) -> Option<Result<Record, StageFailure>> {
            Some(Err(StageFailure::UnexpectedRecord {
                expected: RecordKind::Entity,
                found: RecordKind::Feature,
            }))
        }
    }

    struct WaysOnly;

    impl TransformProcessor for WaysOnly {
        fn apply(&mut self, record: Record) -> Result<Option<Record>, StageFailure> {
            let way = matches!(record, Record::Entity(routeforge_core::OsmEntity::Way(_)));
            Ok(way.then_some(record))
        }
    }

    fn town() -> Box<dyn SourceProcessor> {
        let records: Vec<Record> = sample_town().into_iter().map(Record::from).collect();
        Box::new(Entities(records.into_iter()))
    }

    #[test]
    fn transforms_filter_lazily() {
        let stream = transform_stream(
            "--ways".to_owned(),
            Box::new(WaysOnly),
            source_stream("--town".to_owned(), town()),
        );
        let kept = stream.collect::<Result<Vec<_>, _>>().expect("no failures");
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn source_failures_carry_the_source_label_and_end_the_stream() {
        let mut stream = transform_stream(
            "--ways".to_owned(),
            Box::new(WaysOnly),
            source_stream("--broken".to_owned(), Box::new(Failing)),
        );
        let err = stream
            .next()
            .expect("an item")
            .expect_err("the source fails");
        assert_eq!(err.stage, "--broken");
        assert!(stream.next().is_none());
    }
}
