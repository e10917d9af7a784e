//! Typed error types for the par-mux control plane.
//!
//! Callers at the crate boundary can match on these instead of relying on
//! opaque `anyhow` strings. None of them is fatal to the event loop: the loop
//! logs the error for the event that produced it and moves on.

use par_mux_terminal::TerminalError;
use thiserror::Error;

/// Errors produced by registration, lifecycle commands, and spawning.
#[derive(Debug, Error)]
pub enum MuxError {
    // -----------------------------------------------------------------------
    // Registration (rejected before anything is enqueued)
    // -----------------------------------------------------------------------
    /// A process was registered with an empty key.
    #[error("process key must not be empty")]
    EmptyKey,

    /// A process was registered without a command to run.
    #[error("process '{key}' has no command (args must not be empty)")]
    EmptyArgs {
        /// Key of the offending registration.
        key: String,
    },

    /// An environment entry was not of the form `KEY=VALUE`.
    #[error("process '{key}' has invalid env entry {entry:?} (expected KEY=VALUE)")]
    InvalidEnv {
        /// Key of the offending registration.
        key: String,
        /// The malformed entry.
        entry: String,
    },

    // -----------------------------------------------------------------------
    // Registry / lifecycle (reported by the event loop)
    // -----------------------------------------------------------------------
    /// A process with this key is already registered. The existing entry is
    /// left untouched.
    #[error("process '{0}' is already registered")]
    DuplicateKey(String),

    /// No process is registered under this key.
    #[error("no process registered under '{0}'")]
    UnknownProcess(String),

    /// The UI asked to kill a process marked as not killable.
    #[error("process '{0}' is not killable")]
    NotKillable(String),

    /// A start was requested for a process that is still running.
    #[error("process '{0}' is already running")]
    AlreadyRunning(String),

    /// The OS could not launch the process. Surfaced unmodified from the
    /// terminal adapter.
    #[error(transparent)]
    Spawn(#[from] TerminalError),

    /// The event loop has stopped and no longer accepts events.
    #[error("multiplexer event loop has shut down")]
    Closed,
}
