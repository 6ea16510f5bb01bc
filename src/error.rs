//! Runner error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by configuration, sinks, and the worker pool
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to create log sink at {path}: {source}")]
    LogSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write report {path}: {message}")]
    Report { path: PathBuf, message: String },

    #[error("Worker pool has been shut down")]
    PoolShutdown,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type RunnerResult<T> = std::result::Result<T, RunnerError>;
