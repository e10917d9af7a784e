//! Managed processes: one OS process plus the terminal adapter showing it.
//!
//! A [`ManagedProcess`] is created once per registration and lives until the
//! multiplexer shuts down. Restarting reuses the same adapter (cleared) and
//! replaces only the OS process underneath it.

use std::path::PathBuf;
use std::process::Command;

use par_mux_config::{ProcessConfig, is_env_entry};
use par_mux_terminal::{ExitHook, ProcessHandle, TerminalAdapter, TerminalSize};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::MuxError;
use crate::multiplexer::{MuxEvent, ProcessSummary};
use crate::platform;

/// Immutable description of a process, carried by the registration event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Unique identifier within the registry
    pub key: String,
    /// Command line; `args[0]` is the executable
    pub args: Vec<String>,
    pub icon: String,
    pub title: String,
    /// Working directory; `None` inherits the multiplexer's
    pub cwd: Option<PathBuf>,
    /// Whether UI-originated kills are honoured
    pub killable: bool,
    /// Start as soon as the registration is processed
    pub autostart: bool,
    /// Ordered `KEY=VALUE` entries. Non-empty replaces the inherited
    /// environment; empty inherits it.
    pub env: Vec<String>,
}

impl ProcessSpec {
    /// Spec with defaults for everything but the key and command.
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

    /// Reject specs that could never be launched.
    ///
    /// # Errors
    /// [`MuxError::EmptyKey`], [`MuxError::EmptyArgs`] or
    /// [`MuxError::InvalidEnv`].
    pub fn validate(&self) -> Result<(), MuxError> {
        if self.key.trim().is_empty() {
            return Err(MuxError::EmptyKey);
        }
        if self.args.first().is_none_or(|program| program.is_empty()) {
            return Err(MuxError::EmptyArgs {
                key: self.key.clone(),
            });
        }
        if let Some(entry) = self.env.iter().find(|e| !is_env_entry(e)) {
            return Err(MuxError::InvalidEnv {
                key: self.key.clone(),
                entry: entry.clone(),
            });
        }
        Ok(())
    }

    /// Build the OS launch descriptor, placed in its own process group.
    ///
    /// Callers must have validated the spec; an empty `args` yields a command
    /// with an empty program name, which fails to spawn.
    pub fn command(&self) -> Command {
        let program = self.args.first().map(String::as_str).unwrap_or_default();
        let mut command = Command::new(program);
        command.args(self.args.iter().skip(1));

        if !self.env.is_empty() {
            command.env_clear();
            for (name, value) in self.env.iter().filter_map(|e| e.split_once('=')) {
                command.env(name, value);
            }
        }

        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        platform::configure_process_group(&mut command);
        command
    }
}

impl From<&ProcessConfig> for ProcessSpec {
    fn from(config: &ProcessConfig) -> Self {
        Self {
            key: config.key.clone(),
            args: config.args.clone(),
            icon: config.icon.clone(),
            title: config.title.clone(),
            cwd: config
                .cwd
                .as_deref()
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            killable: config.killable,
            autostart: config.autostart,
            env: config.env.clone(),
        }
    }
}

/// One registered process and its terminal.
pub struct ManagedProcess {
    spec: ProcessSpec,
    terminal: Box<dyn TerminalAdapter>,
    handle: Option<ProcessHandle>,
    alive: bool,
    /// Incremented on every successful spawn; exit reports carry it
    generation: u64,
    last_exit_code: Option<i32>,
    last_error: Option<String>,
}

impl ManagedProcess {
    /// Wrap `spec` with the adapter that will display it. Nothing is spawned.
    pub fn new(spec: ProcessSpec, terminal: Box<dyn TerminalAdapter>) -> Self {
        Self {
            spec,
            terminal,
            handle: None,
            alive: false,
            generation: 0,
            last_exit_code: None,
            last_error: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.spec.key
    }

    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_killable(&self) -> bool {
        self.spec.killable
    }

    /// Handle of the most recent successful spawn.
    pub fn handle(&self) -> Option<ProcessHandle> {
        self.handle
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_exit_code(&self) -> Option<i32> {
        self.last_exit_code
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Spawn the process into a freshly cleared terminal.
    ///
    /// When the process exits, a [`MuxEvent::ProcessExited`] tagged with this
    /// spawn's generation is posted to `exits`.
    ///
    /// # Errors
    /// [`MuxError::AlreadyRunning`] if the current spawn has not exited yet, or
    /// [`MuxError::Spawn`] with the adapter's error unmodified. On a spawn
    /// failure the entity stays dead and the cleared buffer is kept.
    pub fn start(&mut self, exits: &UnboundedSender<MuxEvent>) -> Result<ProcessHandle, MuxError> {
        if self.alive {
            return Err(MuxError::AlreadyRunning(self.spec.key.clone()));
        }

        let command = self.spec.command();
        self.terminal.clear();

        let generation = self.generation + 1;
        let key = self.spec.key.clone();
        let exits = exits.clone();
        let on_exit: ExitHook = Box::new(move |exit_code| {
            // The loop may already be gone during teardown
            let _ = exits.send(MuxEvent::ProcessExited {
                key,
                generation,
                exit_code,
            });
        });

        match self.terminal.start(command, on_exit) {
            Ok(handle) => {
                log::info!(
                    "Started process '{}' ({}, generation {})",
                    self.spec.key,
                    handle,
                    generation
                );
                self.generation = generation;
                self.handle = Some(handle);
                self.alive = true;
                self.last_exit_code = None;
                self.last_error = None;
                Ok(handle)
            }
            Err(e) => {
                log::warn!("Failed to start process '{}': {}", self.spec.key, e);
                self.last_error = Some(e.to_string());
                Err(MuxError::Spawn(e))
            }
        }
    }

    /// Ask the process group to terminate, then release the adapter's I/O.
    ///
    /// Safe to call any number of times. The group of the last spawn is
    /// signalled even after its leader exited, so background children die
    /// too. Signalling failures (ESRCH once the group is empty) are only
    /// logged. `alive` flips when the exit report arrives, not here.
    pub fn kill(&mut self) {
        self.signal(platform::terminate_process_group, "terminate");
        self.terminal.close();
    }

    /// Forcefully kill the process group. Used when a process outlives the
    /// shutdown grace period.
    pub fn force_kill(&mut self) {
        self.signal(platform::kill_process_group, "force-kill");
    }

    fn signal(&self, send: fn(u32) -> std::io::Result<()>, what: &str) {
        let Some(handle) = self.handle else {
            log::debug!("Process '{}' was never started, nothing to {}", self.spec.key, what);
            return;
        };
        match send(handle.pid()) {
            Ok(()) => log::info!("Sent {} to process '{}' ({})", what, self.spec.key, handle),
            Err(e) => log::debug!(
                "Could not {} process '{}' ({}): {}",
                what,
                self.spec.key,
                handle,
                e
            ),
        }
    }

    /// Record the exit of spawn `generation`.
    ///
    /// Returns `false` (and changes nothing) for a report from an earlier
    /// spawn, so a late exit never marks a restarted process dead.
    pub fn mark_exited(&mut self, generation: u64, exit_code: Option<i32>) -> bool {
        if generation != self.generation || !self.alive {
            return false;
        }
        self.alive = false;
        self.last_exit_code = exit_code;
        true
    }

    // ------------------------------------------------------------------
    // Terminal delegation
    // ------------------------------------------------------------------

    pub fn scroll_up(&mut self, lines: usize) {
        self.terminal.scroll_up(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.terminal.scroll_down(lines);
    }

    pub fn scroll_reset(&mut self) {
        self.terminal.scroll_reset();
    }

    pub fn is_scrolling(&self) -> bool {
        self.terminal.is_scrolling()
    }

    pub fn scrollable(&self) -> bool {
        self.terminal.scrollable()
    }

    pub fn resize(&mut self, size: TerminalSize) {
        self.terminal.resize(size);
    }

    /// Current state as a plain value.
    pub fn summary(&self) -> ProcessSummary {
        ProcessSummary {
            key: self.spec.key.clone(),
            icon: self.spec.icon.clone(),
            title: self.spec.display_title().to_string(),
            killable: self.spec.killable,
            alive: self.alive,
            pid: self.handle.map(|h| h.pid()),
            generation: self.generation,
            scrolling: self.terminal.is_scrolling(),
            scrollable: self.terminal.scrollable(),
            last_exit_code: self.last_exit_code,
            last_error: self.last_error.clone(),
        }
    }
}

impl std::fmt::Debug for ManagedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedProcess")
            .field("spec", &self.spec)
            .field("handle", &self.handle)
            .field("alive", &self.alive)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_validate() {
        assert!(ProcessSpec::new("web", args(&["sh"])).validate().is_ok());
        assert!(matches!(
            ProcessSpec::new("", args(&["sh"])).validate(),
            Err(MuxError::EmptyKey)
        ));
        assert!(matches!(
            ProcessSpec::new("web", Vec::new()).validate(),
            Err(MuxError::EmptyArgs { key }) if key == "web"
        ));

        let mut spec = ProcessSpec::new("web", args(&["sh"]));
        spec.env = args(&["A=1", "broken"]);
        assert!(matches!(
            spec.validate(),
            Err(MuxError::InvalidEnv { entry, .. }) if entry == "broken"
        ));
    }

    #[test]
    fn test_command_program_and_args() {
        let spec = ProcessSpec::new("web", args(&["sh", "-c", "sleep 5"]));
        let command = spec.command();
        assert_eq!(command.get_program(), "sh");
        let got: Vec<_> = command.get_args().collect();
        assert_eq!(got, vec!["-c", "sleep 5"]);
        assert!(command.get_current_dir().is_none());
        assert_eq!(command.get_envs().count(), 0);
    }

    #[test]
    fn test_command_env_and_cwd() {
        let mut spec = ProcessSpec::new("web", args(&["env"]));
        spec.env = args(&["PORT=3000", "EMPTY=", "PORT=4000"]);
        spec.cwd = Some(PathBuf::from("/tmp"));
        let command = spec.command();

        assert_eq!(
            command.get_current_dir(),
            Some(std::path::Path::new("/tmp"))
        );
        let envs: Vec<_> = command
            .get_envs()
            .map(|(k, v)| (k.to_os_string(), v.map(|v| v.to_os_string())))
            .collect();
        // Later duplicates win
        assert!(envs.contains(&("PORT".into(), Some("4000".into()))));
        assert!(envs.contains(&("EMPTY".into(), Some("".into()))));
    }

    #[test]
    fn test_from_config() {
        let mut config = ProcessConfig::new("api", args(&["cargo", "run"]));
        config.cwd = Some(String::new());
        config.killable = false;
        config.title = "API".to_string();

        let spec = ProcessSpec::from(&config);
        assert_eq!(spec.key, "api");
        assert_eq!(spec.cwd, None);
        assert!(!spec.killable);
        assert_eq!(spec.display_title(), "API");

        config.cwd = Some("/srv".to_string());
        assert_eq!(ProcessSpec::from(&config).cwd, Some(PathBuf::from("/srv")));
    }
}
