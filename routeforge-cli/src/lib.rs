//! Command-line interface for routeforge pipelines.
#![forbid(unsafe_code)]

use std::io::{self, BufWriter, Write};

use clap::{Parser, Subcommand};
use routeforge_core::{ContractionRegistry, VehicleRegistry};
use routeforge_pipeline::CommandRegistry;

mod error;
pub mod logging;
mod run;

pub use error::CliError;

use run::{CheckArgs, RunArgs, RunPlan, write_commands, write_report};

pub(crate) const ARG_LOG_LEVEL: &str = "log-level";
pub(crate) const ARG_PROGRESS_INTERVAL: &str = "progress-interval";

/// Run the routeforge CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when arguments, configuration, logging setup or the
/// pipeline itself fail.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    dispatch(cli, &mut writer)?;
    writer.flush().map_err(CliError::WriteOutput)
}

/// Run the CLI on explicit arguments, writing command output to `writer`.
///
/// The first item is the binary name, as with [`std::env::args`].
///
/// # Errors
/// Returns [`CliError`] under the same conditions as [`run`].
pub fn run_with<I, T>(args: I, writer: &mut dyn Write) -> Result<(), CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::try_parse_from(args).map_err(CliError::ArgumentParsing)?;
    dispatch(cli, writer)
}

fn dispatch(cli: Cli, writer: &mut dyn Write) -> Result<(), CliError> {
    match cli.command {
        Command::Run(args) => {
            let (settings, pipeline) = args.into_settings()?;
            logging::init_logging(settings.log_level.as_deref())?;
            let report = RunPlan::new(&settings, &pipeline)?.execute()?;
            write_report(writer, &report)
        }
        Command::Check(args) => {
            let commands = args.check()?;
            write_commands(writer, &commands)
        }
        Command::Profiles => write_profiles(writer),
        Command::Commands => write_switches(writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "routeforge",
    about = "Convert OpenStreetMap extracts into routing graphs and features",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a pipeline of switches such as `--read-pbf in.osm.pbf --write-graph graph=out.graph`.
    Run(RunArgs),
    /// Compile and validate a pipeline, printing its canonical form.
    Check(CheckArgs),
    /// List vehicle and contraction profiles.
    Profiles,
    /// List pipeline switches.
    Commands,
}

fn write_profiles(writer: &mut dyn Write) -> Result<(), CliError> {
    let vehicles = VehicleRegistry::builtin();
    write_line(writer, "vehicles:")?;
    for vehicle in vehicles.iter() {
        write_line(writer, &format!("  {vehicle}"))?;
    }
    write_line(writer, "contraction profiles:")?;
    for profile in ContractionRegistry::new(vehicles).iter() {
        write_line(writer, &format!("  {profile}"))?;
    }
    Ok(())
}

fn write_switches(writer: &mut dyn Write) -> Result<(), CliError> {
    let registry = CommandRegistry::with_builtin_commands();
    for (switches, summary) in registry.switches() {
        let line = format!("{:<24} {summary}", switches.join(", "));
        write_line(writer, line.trim_end())?;
    }
    Ok(())
}

pub(crate) fn write_line(writer: &mut dyn Write, line: &str) -> Result<(), CliError> {
    writeln!(writer, "{line}").map_err(CliError::WriteOutput)
}

#[cfg(test)]
mod tests;
