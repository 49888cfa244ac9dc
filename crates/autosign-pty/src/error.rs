//! Errors raised by the pseudo-terminal engine.

use std::io;

use thiserror::Error;

/// Errors from spawning or talking to a terminal subprocess.
#[derive(Debug, Error)]
pub enum PtyError {
    #[error("failed to allocate pseudo-terminal: {0}")]
    Allocate(String),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on terminal: {0}")]
    Io(#[from] io::Error),

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("terminal already closed")]
    Closed,
}

/// Result type for terminal operations.
pub type PtyResult<T> = Result<T, PtyError>;
