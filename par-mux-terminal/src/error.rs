//! Typed error types for par-mux-terminal.

use thiserror::Error;

/// Errors reported by a [`TerminalAdapter`](crate::TerminalAdapter).
#[derive(Debug, Error)]
pub enum TerminalError {
    /// The OS refused to launch the process (missing executable, permission
    /// denied, resource exhaustion, bad working directory).
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that was being launched (`args[0]`).
        program: String,
        /// Underlying I/O error from the OS.
        #[source]
        source: std::io::Error,
    },

    /// The process was spawned but one of its stdio streams was not captured.
    #[error("Failed to capture {0}")]
    Capture(&'static str),
}

impl TerminalError {
    /// Kind of the underlying OS error, if this is a spawn failure.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            TerminalError::Spawn { source, .. } => Some(source.kind()),
            TerminalError::Capture(_) => None,
        }
    }
}
