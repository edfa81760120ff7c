//! Crate-level error type.
//!
//! Configuration and resource failures surface here. Producer-side misuse
//! (logging before Initialize or after Close) is never an error: those calls
//! degrade to inert builders.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::config::validation::ValidationError;

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`Service::initialize`](crate::Service::initialize),
/// [`Service::close`](crate::Service::close) and the config loader.
///
/// `Clone` so the first Initialize outcome can be handed to every later caller.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Configuration failed validation.
    #[error("logging configuration is invalid: {}", join_violations(.0))]
    Config(Vec<ValidationError>),

    /// Unknown severity name.
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),

    /// The working directory could not be resolved.
    #[error("failed to resolve working directory: {0}")]
    WorkingDir(#[source] Arc<std::io::Error>),

    /// Creating the log directory failed.
    #[error("failed to create logs directory at {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The executable name used for the default log file could not be resolved.
    #[error("failed to get executable name: {0}")]
    ExecutableName(String),

    /// The rotating file sink could not be opened.
    #[error("failed to open log file {path}: {reason}")]
    OpenSink { path: PathBuf, reason: String },

    /// Releasing the owned sink on Close failed.
    #[error("failed to close log sink: {0}")]
    CloseSink(#[source] Arc<std::io::Error>),

    /// Reading a configuration file failed.
    #[error("IO error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// A configuration file did not parse.
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

fn join_violations(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}
