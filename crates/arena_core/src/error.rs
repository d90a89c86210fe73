//! Error types for the arena simulation.
//!
//! Only construction-time precondition failures and file IO surface as
//! errors. In-tick soft failures (spawn search exhaustion, fire past the
//! bullet cap, stale owner IDs) are silent no-ops.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all arena simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// A tile grid failed validation (dimensions, border, reserved cells).
    #[error("Invalid map: {0}")]
    InvalidMap(String),

    /// Level numbers start at 1.
    #[error("Invalid level number: {0}")]
    InvalidLevel(u32),

    /// Tuning data could not be parsed or failed validation.
    #[error("Failed to parse tuning data: {0}")]
    TuningParse(String),

    /// Replay file could not be encoded, decoded or verified.
    #[error("Replay error: {0}")]
    Replay(String),

    /// Underlying filesystem error.
    #[error("IO error on '{path}': {source}")]
    Io {
        /// Path being read or written.
        path: String,
        /// Original IO error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Replay verification found a different final state.
    #[error("Desync detected at tick {tick}: expected hash {expected}, got {actual}")]
    DesyncDetected {
        /// Tick where the comparison was made.
        tick: u64,
        /// Hash recorded in the replay.
        expected: u64,
        /// Hash produced by re-simulation.
        actual: u64,
    },
}
