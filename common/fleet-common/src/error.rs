//! Error types shared across the fleet crates
//!
//! Timeouts are deliberately absent: a command that outlives its deadline is
//! reported through its execution result, not as an error.

use thiserror::Error;

/// Type alias for fleet results
pub type FleetResult<T> = Result<T, FleetError>;

#[derive(Error, Debug)]
pub enum FleetError {
    /// The external process could not be started or its pipes failed
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The bridge executable itself is unusable; no per-device work is possible
    #[error("Device bridge unavailable: {0}")]
    BridgeUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown button: {0}")]
    UnknownButton(String),

    #[error("Coordinates must be x,y (got '{0}')")]
    InvalidCoordinate(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl FleetError {
    /// Build a spawn error from an argument vector
    pub fn spawn(argv: &[String], source: std::io::Error) -> Self {
        FleetError::Spawn {
            command: argv.join(" "),
            source,
        }
    }

    /// Whether this error means the bridge program could not be found at all
    pub fn is_missing_program(&self) -> bool {
        matches!(
            self,
            FleetError::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
