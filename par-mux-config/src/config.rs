//! Top-level `Config` struct plus load/save and path helpers.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::process::ProcessConfig;

/// Log verbosity for the debug log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging (log file not created)
    #[default]
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Geometry and scrollback for newly created panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Initial pane width in columns
    #[serde(default = "crate::defaults::cols")]
    pub cols: u16,

    /// Initial pane height in rows
    #[serde(default = "crate::defaults::rows")]
    pub rows: u16,

    /// Lines of scrollback kept per pane
    #[serde(default = "crate::defaults::scrollback_lines")]
    pub scrollback_lines: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            cols: crate::defaults::cols(),
            rows: crate::defaults::rows(),
            scrollback_lines: crate::defaults::scrollback_lines(),
        }
    }
}

/// par-mux configuration file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Debug log verbosity (overridden by `--log-level` and `RUST_LOG`)
    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub terminal: TerminalConfig,

    /// How long shutdown waits for killed processes to report their exit
    #[serde(default = "crate::defaults::shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Resolve every `${VAR}` in this file, not just allowlisted ones
    #[serde(default)]
    pub allow_all_env_vars: bool,

    /// Processes registered at startup, in display order
    #[serde(default)]
    pub processes: Vec<ProcessConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            terminal: TerminalConfig::default(),
            shutdown_grace_ms: crate::defaults::shutdown_grace_ms(),
            allow_all_env_vars: false,
            processes: Vec::new(),
        }
    }
}

impl Config {
    /// Directory holding `config.yaml` (`~/.config/par-mux` on Linux).
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("par-mux")
    }

    /// Default config file location.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Load from `path`, or from [`Config::config_path`] when `None`.
    ///
    /// A missing file yields the defaults (no processes); it is not created.
    ///
    /// # Errors
    /// Fails on unreadable files, invalid YAML, or a config that does not
    /// pass [`Config::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        log::info!("Config path: {:?}", config_path);

        if !config_path.exists() {
            if path.is_some() {
                return Err(ConfigError::io(
                    &config_path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
                ));
            }
            log::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents =
            fs::read_to_string(&config_path).map_err(|e| ConfigError::io(&config_path, e))?;
        let config = Self::from_yaml(&contents)?;
        log::info!(
            "Loaded config with {} process(es) from {:?}",
            config.processes.len(),
            config_path
        );
        Ok(config)
    }

    /// Parse config text, applying `${VAR}` substitution first.
    ///
    /// # Errors
    /// Fails on invalid YAML or a config that does not validate.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let allow_all = crate::env_vars::pre_scan_allow_all_env_vars(contents);
        let contents = crate::env_vars::substitute_variables_with_allowlist(contents, allow_all);
        let config: Config = serde_yaml_ng::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config to `path`, creating parent directories.
    ///
    /// # Errors
    /// Fails if the YAML cannot be produced or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }

        let yaml = serde_yaml_ng::to_string(self)?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml).map_err(|e| ConfigError::io(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| ConfigError::io(path, e))?;
        log::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check every process definition and key uniqueness.
    ///
    /// # Errors
    /// Returns the first [`ConfigError::Validation`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.terminal.cols == 0 || self.terminal.rows == 0 {
            return Err(ConfigError::Validation(format!(
                "terminal size must be non-zero (got {}x{})",
                self.terminal.cols, self.terminal.rows
            )));
        }

        let mut seen = HashSet::new();
        for process in &self.processes {
            process.validate()?;
            if !seen.insert(process.key.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate process key '{}'",
                    process.key
                )));
            }
        }
        Ok(())
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Number of processes started as soon as they are registered.
    pub fn autostart_count(&self) -> usize {
        self.processes.iter().filter(|p| p.autostart).count()
    }

    /// Sample config written by `par-mux init`.
    pub fn example() -> Self {
        let mut shell = ProcessConfig::new(
            "shell",
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "while true; do date; sleep 5; done".to_string(),
            ],
        );
        shell.title = "Clock".to_string();
        shell.icon = "⏱".to_string();

        Self {
            processes: vec![shell],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.terminal.cols, 120);
        assert_eq!(config.terminal.rows, 40);
        assert_eq!(config.terminal.scrollback_lines, 10_000);
        assert_eq!(config.shutdown_grace(), Duration::from_secs(2));
    }

    #[test]
    fn test_parse_processes_in_order() {
        let yaml = r#"
log_level: debug
terminal:
  cols: 100
processes:
  - key: web
    args: ["npm", "run", "dev"]
    title: Web
    cwd: /tmp
  - key: db
    args: ["postgres"]
    killable: false
    autostart: false
    env: ["PGDATA=/tmp/pg"]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.terminal.cols, 100);
        assert_eq!(config.terminal.rows, 40);

        let keys: Vec<&str> = config.processes.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["web", "db"]);

        let db = &config.processes[1];
        assert!(!db.killable);
        assert!(!db.autostart);
        assert_eq!(db.env, vec!["PGDATA=/tmp/pg".to_string()]);
        assert_eq!(config.processes[0].cwd.as_deref(), Some("/tmp"));
        assert_eq!(config.autostart_count(), 1);
    }

    #[test]
    fn test_autostart_count_without_autostart() {
        let yaml = r#"
processes:
  - key: web
    args: [a]
    autostart: false
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.processes.len(), 1);
        assert_eq!(config.autostart_count(), 0);
        assert_eq!(Config::default().autostart_count(), 0);
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let yaml = r#"
processes:
  - key: web
    args: [a]
  - key: web
    args: [b]
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = Config::from_yaml("terminal:\n  rows: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Config::from_yaml("processes: [key: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::Off.to_level_filter(), log::LevelFilter::Off);
        assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
    }

    #[test]
    fn test_example_is_valid() {
        assert!(Config::example().validate().is_ok());
    }
}
