//! Runner error types.

use coven_core::error::CovenError;
use thiserror::Error;

/// Startup and replay errors for the runner.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading content, the grid file or the script failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A script line or grid file did not parse.
    #[error("parse error at {location}: {source}")]
    Parse {
        /// File and line, e.g. `script.jsonl:3`.
        location: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// The quest core rejected an operation the runner needed.
    #[error("quest error: {0}")]
    Quest(#[from] CovenError),
}
