//! Validates a compiled pipeline and runs it to completion.

use camino::Utf8PathBuf;
use log::info;

use crate::command::Command;
use crate::error::{PipelineError, ShapeViolation, StageError};
use crate::processor::{Processor, RecordStream, TargetProcessor, source_stream, transform_stream};
use crate::record::StageRole;

/// Knobs for [`execute_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Log a progress line every this many records; `0` disables it.
    pub progress_interval: u64,
}

impl ExecutionOptions {
    /// Default progress interval.
    pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            progress_interval: Self::DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineReport {
    /// Records delivered to the target.
    pub records: u64,
    /// Output files the target committed.
    pub outputs: Vec<Utf8PathBuf>,
}

/// Check the declared shape of `commands` without creating processors.
///
/// The first command must be a source, the last a target, every other one a
/// transform, and each stage must consume the record kind its upstream
/// produces.
pub fn validate(commands: &[Command]) -> Result<(), ShapeViolation> {
    let (Some(first), Some(last)) = (commands.first(), commands.last()) else {
        return Err(ShapeViolation::Empty);
    };
    let role = first.shape().role;
    if role != StageRole::Source {
        return Err(ShapeViolation::FirstNotSource {
            command: first.to_string(),
            role,
        });
    }
    let role = last.shape().role;
    if role != StageRole::Target {
        return Err(ShapeViolation::LastNotTarget {
            command: last.to_string(),
            role,
        });
    }
    let interior = commands
        .get(1..commands.len() - 1)
        .unwrap_or_default();
    if let Some(command) = interior
        .iter()
        .find(|command| command.shape().role != StageRole::Transform)
    {
        return Err(ShapeViolation::InteriorNotTransform {
            command: command.to_string(),
            role: command.shape().role,
        });
    }
    for pair in commands.windows(2) {
        let [upstream, downstream] = pair else {
            continue;
        };
        let (produces, consumes) = (upstream.shape().output, downstream.shape().input);
        if let (Some(produces), Some(consumes)) = (produces, consumes)
            && produces != consumes
        {
            return Err(ShapeViolation::KindMismatch {
                upstream: upstream.to_string(),
                produces,
                downstream: downstream.to_string(),
                consumes,
            });
        }
    }
    Ok(())
}

/// Run `commands` with default options.
///
/// # Examples
/// ```
/// use routeforge_pipeline::{CommandRegistry, PipelineError, ShapeViolation, compile, execute};
///
/// let registry = CommandRegistry::with_builtin_commands();
/// let commands = compile(&registry, &["--read-pbf", "missing.osm.pbf"]).expect("compiles");
/// match execute(commands) {
///     Err(PipelineError::InvalidPipelineShape(ShapeViolation::LastNotTarget { .. })) => {}
///     other => panic!("unexpected outcome {other:?}"),
/// }
/// ```
pub fn execute(commands: Vec<Command>) -> Result<PipelineReport, PipelineError> {
    execute_with(commands, ExecutionOptions::default())
}

/// Validate, create every processor, and pull all records into the target.
///
/// Processors are created in order. If one cannot be created, those created
/// before it are dropped, which releases their resources and removes any
/// output they created. A failure while records flow does the same and
/// names the failing stage.
pub fn execute_with(
    commands: Vec<Command>,
    options: ExecutionOptions,
) -> Result<PipelineReport, PipelineError> {
    validate(&commands)?;

    let mut stages = Vec::with_capacity(commands.len());
    for command in commands {
        let label = command.to_string();
        let processor = command.create_processor()?;
        stages.push((label, processor));
    }

    let (stream, target_label, target) = link(stages)?;
    drain(stream, &target_label, target, options)
}

/// Connect processors into a stream ending in the target.
fn link(
    stages: Vec<(String, Processor)>,
) -> Result<(RecordStream, String, Box<dyn TargetProcessor>), PipelineError> {
    let mut stream: Option<RecordStream> = None;
    let mut target = None;
    for (label, processor) in stages {
        let role = processor.role();
        match (processor, stream.take(), target.is_some()) {
            (Processor::Source(source), None, false) => {
                stream = Some(source_stream(label, source));
            }
            (Processor::Transform(transform), Some(upstream), false) => {
                stream = Some(transform_stream(label, transform, upstream));
            }
            (Processor::Target(sink), Some(upstream), false) => {
                stream = Some(upstream);
                target = Some((label, sink));
            }
            _ => {
                return Err(ShapeViolation::InteriorNotTransform {
                    command: label,
                    role,
                }
                .into());
            }
        }
    }
    match (stream, target) {
        (Some(stream), Some((label, sink))) => Ok((stream, label, sink)),
        _ => Err(ShapeViolation::Empty.into()),
    }
}

fn drain(
    stream: RecordStream,
    label: &str,
    mut target: Box<dyn TargetProcessor>,
    options: ExecutionOptions,
) -> Result<PipelineReport, PipelineError> {
    let stage_error = |source| StageError {
        stage: label.to_owned(),
        source,
    };
    let mut records = 0_u64;
    for record in stream {
        target.consume(record?).map_err(stage_error)?;
        records += 1;
        if options.progress_interval > 0 && records % options.progress_interval == 0 {
            info!("{records} records processed");
        }
    }
    let outputs = target.finish().map_err(stage_error)?;
    info!("pipeline finished: {records} records, {} outputs", outputs.len());
    Ok(PipelineReport { records, outputs })
}
