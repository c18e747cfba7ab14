//! `run` and `check` subcommands.

use std::io::Write;
use std::mem;

use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use routeforge_pipeline::{
    Command, CommandRegistry, ExecutionOptions, PipelineReport, compile, execute_with, validate,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ARG_LOG_LEVEL, ARG_PROGRESS_INTERVAL, CliError, write_line};

/// CLI arguments for the `run` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "run",
    long_about = "Compile the pipeline switches that follow the options and \
                 run them once, from the source through any transforms into \
                 the target. Options can come from CLI flags, configuration \
                 files, or ROUTEFORGE_* environment variables; the pipeline \
                 itself only comes from the command line.",
    about = "Run a pipeline"
)]
#[ortho_config(prefix = "ROUTEFORGE")]
pub(crate) struct RunArgs {
    /// Filter directive for diagnostics, such as `debug` or
    /// `routeforge_pipeline=trace`.
    #[arg(long = ARG_LOG_LEVEL, value_name = "directive")]
    #[serde(default)]
    pub(crate) log_level: Option<String>,
    /// Log progress every this many records; `0` disables progress lines.
    #[arg(long = ARG_PROGRESS_INTERVAL, value_name = "records")]
    #[serde(default)]
    pub(crate) progress_interval: Option<u64>,
    /// Pipeline switches and their parameters.
    #[arg(
        value_name = "PIPELINE",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) pipeline: Vec<String>,
}

impl RunArgs {
    /// Merge configuration layers, returning the settings and the pipeline
    /// tokens separately.
    pub(crate) fn into_settings(mut self) -> Result<(Self, Vec<String>), CliError> {
        // Pipeline tokens never come from files or the environment.
        let pipeline = mem::take(&mut self.pipeline);
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        Ok((merged, pipeline))
    }
}

/// Resolved `run` invocation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunPlan {
    /// Executor options.
    pub(crate) options: ExecutionOptions,
    /// Compiled pipeline.
    pub(crate) commands: Vec<Command>,
}

impl RunPlan {
    pub(crate) fn new(settings: &RunArgs, pipeline: &[String]) -> Result<Self, CliError> {
        let commands = compile_pipeline(pipeline)?;
        let options = ExecutionOptions {
            progress_interval: settings
                .progress_interval
                .unwrap_or(ExecutionOptions::DEFAULT_PROGRESS_INTERVAL),
        };
        Ok(Self { options, commands })
    }

    /// Execute the compiled pipeline.
    pub(crate) fn execute(self) -> Result<PipelineReport, CliError> {
        info!(stages = self.commands.len(), "running pipeline");
        Ok(execute_with(self.commands, self.options)?)
    }
}

/// CLI arguments for the `check` subcommand.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "check",
    about = "Compile and validate a pipeline without opening any file"
)]
pub(crate) struct CheckArgs {
    /// Pipeline switches and their parameters.
    #[arg(
        value_name = "PIPELINE",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) pipeline: Vec<String>,
}

impl CheckArgs {
    /// Compile the pipeline and verify its shape.
    pub(crate) fn check(&self) -> Result<Vec<Command>, CliError> {
        let commands = compile_pipeline(&self.pipeline)?;
        validate(&commands)?;
        Ok(commands)
    }
}

fn compile_pipeline(pipeline: &[String]) -> Result<Vec<Command>, CliError> {
    if pipeline.is_empty() {
        return Err(CliError::EmptyPipeline);
    }
    let registry = CommandRegistry::with_builtin_commands();
    Ok(compile(&registry, pipeline)?)
}

/// Print the record count and every committed output.
pub(crate) fn write_report(
    writer: &mut dyn Write,
    report: &PipelineReport,
) -> Result<(), CliError> {
    write_line(writer, &format!("records: {}", report.records))?;
    for output in &report.outputs {
        write_line(writer, &format!("output: {output}"))?;
    }
    Ok(())
}

/// Print the canonical rendering of each command, one stage per line.
pub(crate) fn write_commands(writer: &mut dyn Write, commands: &[Command]) -> Result<(), CliError> {
    for command in commands {
        write_line(writer, &command.to_string())?;
    }
    Ok(())
}
