//! Configuration system for the par-mux process multiplexer.
//!
//! Provides loading, saving, defaults, and validation for `config.yaml`:
//!
//! - Process definitions (what to spawn, how to label it, whether it autostarts)
//! - Pane geometry and scrollback size for new terminals
//! - Shutdown grace period and log level
//! - `${VAR}` environment variable substitution with an allowlist

pub mod config;
pub mod defaults;
pub mod env_vars;
pub mod error;
pub mod process;

// Re-export main types for convenience
pub use config::{Config, LogLevel, TerminalConfig};
pub use env_vars::{substitute_variables, substitute_variables_with_allowlist};
pub use error::ConfigError;
pub use process::{ProcessConfig, is_env_entry};
