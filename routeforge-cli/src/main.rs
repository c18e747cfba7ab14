//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use std::process::ExitCode;

use routeforge_cli::CliError;

fn main() -> ExitCode {
    match routeforge_cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        // Help, version and usage errors keep clap's own output and status.
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("routeforge: {}", err.report());
            ExitCode::FAILURE
        }
    }
}
