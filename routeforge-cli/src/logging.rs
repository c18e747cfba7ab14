//! Logging initialisation for the routeforge CLI.
//!
//! Installs a global `tracing` subscriber and bridges the `log` facade, which
//! the pipeline and data crates log through, so every record reaches the same
//! formatter.

use std::{env, sync::OnceLock};

use thiserror::Error;
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

/// Environment variable selecting `human` or `json` output.
pub const LOG_FORMAT_ENV: &str = "ROUTEFORGE_LOG_FORMAT";

const DEFAULT_LEVEL: &str = "info";

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Output format of diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Plain text lines.
    #[default]
    Human,
    /// One JSON object per event.
    Json,
}

/// Errors raised while initialising structured logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Environment variable contained invalid UTF-8 data.
    #[error("environment variable `{name}` contained invalid UTF-8")]
    InvalidUnicode {
        /// Name of the offending environment variable.
        name: &'static str,
        /// Underlying lookup failure.
        #[source]
        source: env::VarError,
    },
    /// Unsupported log format requested via `ROUTEFORGE_LOG_FORMAT`.
    #[error("unsupported log format `{provided}`; expected `human` or `json`")]
    UnsupportedFormat {
        /// Raw value supplied by the user.
        provided: String,
    },
    /// Failed to install the global tracing subscriber.
    #[error("failed to install tracing subscriber")]
    InstallFailed {
        /// Error raised by `tracing`.
        #[source]
        source: tracing::subscriber::SetGlobalDefaultError,
    },
    /// The configured level is not a valid filter directive.
    #[error("invalid log level `{provided}`")]
    InvalidLevel {
        /// Raw directive supplied by the user.
        provided: String,
        /// Parser failure.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
}

/// Install global structured logging if it has not already been configured.
///
/// `level` takes precedence over `RUST_LOG`; without either, `info` and above
/// is shown. Diagnostics go to `stderr` so command output on `stdout` stays
/// parseable.
///
/// # Errors
/// Returns [`LoggingError`] if the format variable or the level is invalid,
/// even on repeated calls, or if a different tracing subscriber is already
/// installed.
pub fn init_logging(level: Option<&str>) -> Result<(), LoggingError> {
    let format = log_format_from_env()?;
    let filter = filter_for(level)?;
    if INITIALISED.get().is_some() {
        return Ok(());
    }

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let fmt_layer = match format {
        LogFormat::Human => fmt_layer.boxed(),
        LogFormat::Json => fmt_layer.json().boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    match LogTracer::init() {
        Ok(()) => tracing::subscriber::set_global_default(subscriber)
            .map_err(|source| LoggingError::InstallFailed { source })?,
        // Another logger owns the `log` slot; keep it and say so through it.
        Err(err) => log::warn!("keeping the installed `log` logger: {err}"),
    }
    let _ = INITIALISED.set(());
    Ok(())
}

fn log_format_from_env() -> Result<LogFormat, LoggingError> {
    match env::var(LOG_FORMAT_ENV) {
        Ok(raw) => parse_log_format(&raw),
        Err(env::VarError::NotPresent) => Ok(LogFormat::Human),
        Err(source @ env::VarError::NotUnicode(_)) => Err(LoggingError::InvalidUnicode {
            name: LOG_FORMAT_ENV,
            source,
        }),
    }
}

fn filter_for(level: Option<&str>) -> Result<EnvFilter, LoggingError> {
    match level {
        Some(level) => EnvFilter::try_new(level).map_err(|source| LoggingError::InvalidLevel {
            provided: level.to_owned(),
            source,
        }),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))),
    }
}

pub(crate) fn parse_log_format(raw: &str) -> Result<LogFormat, LoggingError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "human" => Ok(LogFormat::Human),
        "json" => Ok(LogFormat::Json),
        other => Err(LoggingError::UnsupportedFormat {
            provided: other.to_owned(),
        }),
    }
}
