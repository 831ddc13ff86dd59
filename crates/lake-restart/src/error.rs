//! Restart error types.

use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for restart attempts.
pub type RestartResult<T> = Result<T, RestartError>;

/// Errors that can occur while restarting the container.
#[derive(Debug, Error)]
pub enum RestartError {
    #[error("container name not specified")]
    NoContainer,

    #[error("restart command is empty")]
    NoCommand,

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for restart of {container}: {source}")]
    Wait {
        container: String,
        #[source]
        source: std::io::Error,
    },

    #[error("restart of {container} timed out after {after:?}, output: {output}")]
    Timeout {
        container: String,
        after: Duration,
        output: String,
    },

    #[error("restart of {container} failed: {status}, output: {output}")]
    Failed {
        container: String,
        status: ExitStatus,
        output: String,
    },
}

impl RestartError {
    /// Whether this is a configuration problem rather than a runtime failure.
    pub fn is_config(&self) -> bool {
        matches!(self, RestartError::NoContainer | RestartError::NoCommand)
    }
}
