//! Shared integration test helpers for par-mux.
//!
//! This module provides a recording stub [`TerminalAdapter`] and polling
//! utilities used across the `tests/` integration test suite.
//!
//! # Usage
//!
//! Include this module at the top of each test file that needs it:
//!
//! ```ignore
//! mod common;
//! use common::{StubFactory, wait_until};
//! ```
//!
//! Note: Rust integration tests use `mod common;` (not `use`) to bring in
//! helpers from `tests/common/mod.rs`. The `#[allow(dead_code)]` attributes
//! suppress warnings when only a subset of helpers are used per file.

#![allow(dead_code)]

use par_mux::{MuxHandle, RegistrySnapshot};
use par_mux_terminal::{
    ExitHook, ProcessHandle, TerminalAdapter, TerminalError, TerminalFactory, TerminalSize,
};
use parking_lot::Mutex;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything a [`StubTerminal`] has been asked to do.
#[derive(Debug, Default, Clone)]
pub struct StubState {
    /// Size the adapter was created with
    pub initial_size: Option<TerminalSize>,
    pub clears: usize,
    pub closes: usize,
    /// Pid of every successful spawn, oldest first
    pub starts: Vec<u32>,
    pub resizes: Vec<TerminalSize>,
    /// Lines available above the viewport
    pub scrollback: usize,
    pub offset: usize,
}

/// Adapter that really spawns the command (with null stdio) but keeps no
/// screen. Scrolling is modelled with a plain offset over `scrollback` lines.
pub struct StubTerminal {
    state: Arc<Mutex<StubState>>,
}

impl StubTerminal {
    pub fn new(size: TerminalSize) -> (Self, Arc<Mutex<StubState>>) {
        let state = Arc::new(Mutex::new(StubState {
            initial_size: Some(size),
            ..StubState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

impl TerminalAdapter for StubTerminal {
    fn clear(&mut self) {
        let mut state = self.state.lock();
        state.clears += 1;
        state.scrollback = 0;
        state.offset = 0;
    }

    fn start(
        &mut self,
        mut command: Command,
        on_exit: ExitHook,
    ) -> Result<ProcessHandle, TerminalError> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let mut child = command.spawn().map_err(|source| TerminalError::Spawn {
            program: command.get_program().to_string_lossy().into_owned(),
            source,
        })?;

        let pid = child.id();
        std::thread::spawn(move || {
            let code = child.wait().ok().and_then(|status| status.code());
            on_exit(code);
        });

        self.state.lock().starts.push(pid);
        Ok(ProcessHandle::new(pid))
    }

    fn close(&mut self) {
        self.state.lock().closes += 1;
    }

    fn resize(&mut self, size: TerminalSize) {
        self.state.lock().resizes.push(size);
    }

    fn scroll_up(&mut self, lines: usize) {
        let mut state = self.state.lock();
        state.offset = (state.offset + lines).min(state.scrollback);
    }

    fn scroll_down(&mut self, lines: usize) {
        let mut state = self.state.lock();
        state.offset = state.offset.saturating_sub(lines);
    }

    fn scroll_reset(&mut self) {
        self.state.lock().offset = 0;
    }

    fn is_scrolling(&self) -> bool {
        self.state.lock().offset > 0
    }

    fn scrollable(&self) -> bool {
        self.state.lock().scrollback > 0
    }
}

/// Factory handing out [`StubTerminal`]s and remembering each one's state,
/// in creation (= registration) order.
#[derive(Clone, Default)]
pub struct StubFactory {
    created: Arc<Mutex<Vec<Arc<Mutex<StubState>>>>>,
}

impl StubFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(&self) -> TerminalFactory {
        let created = Arc::clone(&self.created);
        Box::new(move |size| -> Box<dyn TerminalAdapter> {
            let (terminal, state) = StubTerminal::new(size);
            created.lock().push(state);
            Box::new(terminal)
        })
    }

    /// Number of adapters created so far.
    pub fn created(&self) -> usize {
        self.created.lock().len()
    }

    /// State of the `index`th adapter created.
    pub fn state(&self, index: usize) -> Arc<Mutex<StubState>> {
        Arc::clone(&self.created.lock()[index])
    }
}

/// Turn string literals into an owned argument vector.
pub fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Poll the published snapshot until `cond` holds or `timeout` expires.
/// Returns the last snapshot seen and whether the condition was met.
pub async fn wait_until(
    handle: &MuxHandle,
    timeout: Duration,
    cond: impl Fn(&RegistrySnapshot) -> bool,
) -> (Arc<RegistrySnapshot>, bool) {
    let deadline = Instant::now() + timeout;
    loop {
        let snapshot = handle.snapshot();
        if cond(&snapshot) {
            return (snapshot, true);
        }
        if Instant::now() >= deadline {
            return (snapshot, false);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Wait until process `key` reports `alive == expected`.
pub async fn wait_alive(handle: &MuxHandle, key: &str, expected: bool) -> RegistrySnapshot {
    let (snapshot, met) = wait_until(handle, Duration::from_secs(5), |s| {
        s.get(key).is_some_and(|p| p.alive == expected)
    })
    .await;
    assert!(
        met,
        "process '{}' did not reach alive == {}: {:?}",
        key,
        expected,
        snapshot.get(key)
    );
    (*snapshot).clone()
}
