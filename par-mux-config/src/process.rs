//! Configuration types for managed processes.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One process the multiplexer should register at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessConfig {
    /// Unique identifier within the registry
    pub key: String,

    /// Command line; the first element is the executable
    pub args: Vec<String>,

    /// Short icon/glyph shown next to the title
    #[serde(default)]
    pub icon: String,

    /// Display title (falls back to `key` when empty)
    #[serde(default)]
    pub title: String,

    /// Working directory (inherits the multiplexer's when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    /// Whether the UI may terminate this process (default: true)
    #[serde(default = "crate::defaults::bool_true")]
    pub killable: bool,

    /// Whether to start the process as soon as it is registered (default: true)
    #[serde(default = "crate::defaults::bool_true")]
    pub autostart: bool,

    /// `KEY=VALUE` entries. When non-empty they replace the inherited
    /// environment instead of extending it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
}

impl ProcessConfig {
    /// Create a config with defaults for everything but the key and command.
    pub fn new(key: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            key: key.into(),
            args,
            icon: String::new(),
            title: String::new(),
            cwd: None,
            killable: true,
            autostart: true,
            env: Vec::new(),
        }
    }

    /// Title to display, falling back to the key.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.key
        } else {
            &self.title
        }
    }

    /// Check the fields the multiplexer relies on.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] for an empty key, an empty command,
    /// or an env entry that is not `KEY=VALUE`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "process key must not be empty".to_string(),
            ));
        }
        if self.args.first().is_none_or(|program| program.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "process '{}' has no command (args must not be empty)",
                self.key
            )));
        }
        if let Some(entry) = self.env.iter().find(|e| !is_env_entry(e)) {
            return Err(ConfigError::Validation(format!(
                "process '{}' has invalid env entry {:?} (expected KEY=VALUE)",
                self.key, entry
            )));
        }
        Ok(())
    }
}

/// Whether `entry` has the form `KEY=VALUE` with a non-empty key.
pub fn is_env_entry(entry: &str) -> bool {
    entry.split_once('=').is_some_and(|(name, _)| !name.is_empty())
}
