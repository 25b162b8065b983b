//! Error types for threadline-core

use thiserror::Error;

/// Main error type for the threadline-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parse error for an event log file
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Event indices are not strictly increasing.
    ///
    /// The log is expected to be chronological and append-only; this is a
    /// caller-side contract violation, not something the engine recovers from.
    #[error("event at position {position} has index {found}, expected an index greater than {previous}")]
    NonMonotonicIndex {
        position: usize,
        previous: usize,
        found: usize,
    },
}

/// Result type alias for threadline-core
pub type Result<T> = std::result::Result<T, Error>;
