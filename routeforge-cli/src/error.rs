//! Error types emitted by the routeforge CLI.
//!
//! Keep this error type reasonably small: every subcommand returns
//! `Result<_, CliError>`.

use std::error::Error as _;
use std::sync::Arc;

use routeforge_pipeline::{CompileError, PipelineError, ShapeViolation};
use thiserror::Error;

use crate::logging::LoggingError;

/// Errors emitted by the routeforge CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// Structured logging could not be installed.
    #[error("failed to initialise logging")]
    Logging(#[from] LoggingError),
    /// `run` or `check` was given no pipeline tokens.
    #[error("no pipeline given; pass switches such as `--read-pbf in.osm.pbf`")]
    EmptyPipeline,
    /// The pipeline tokens did not compile into commands.
    #[error("invalid pipeline arguments")]
    Compile(#[from] CompileError),
    /// The compiled commands do not form a source, transform, target chain.
    #[error("invalid pipeline shape")]
    Shape(#[from] ShapeViolation),
    /// The pipeline failed while opening or running its stages.
    #[error("pipeline failed")]
    Pipeline(#[from] PipelineError),
    /// Writing the command output failed.
    #[error("failed to write output")]
    WriteOutput(#[source] std::io::Error),
}

impl CliError {
    /// Render the error and every source beneath it as one line.
    ///
    /// # Examples
    /// ```
    /// use routeforge_cli::CliError;
    ///
    /// let err = CliError::WriteOutput(std::io::Error::other("disk full"));
    /// assert_eq!(err.report(), "failed to write output: disk full");
    /// ```
    #[must_use]
    pub fn report(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            let text = err.to_string();
            if !text.is_empty() && !message.ends_with(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = err.source();
        }
        message
    }
}
