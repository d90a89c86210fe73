//! Errors surfaced by the headless runner.

use std::path::PathBuf;

use arena_core::error::GameError;
use thiserror::Error;

/// Result type alias using [`RunnerError`].
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Anything that stops a headless command.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The simulation refused to start or a replay failed.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Reading or writing a results or config file failed.
    #[error("IO error on '{}': {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Original IO error.
        #[source]
        source: std::io::Error,
    },

    /// Results could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A RON config file did not parse.
    #[error("Invalid config '{}': {message}", path.display())]
    Config {
        /// Config file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

impl RunnerError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
