//! The capability set the control plane consumes from a terminal adapter.

use std::fmt;
use std::process::Command;

use crate::error::TerminalError;

/// Callback invoked exactly once when a spawned process exits.
///
/// Receives the exit code, or `None` when the process was terminated by a
/// signal or its status could not be collected.
pub type ExitHook = Box<dyn FnOnce(Option<i32>) + Send + 'static>;

/// Produces a fresh adapter for a newly registered process.
pub type TerminalFactory = Box<dyn Fn(TerminalSize) -> Box<dyn TerminalAdapter> + Send>;

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}

impl TerminalSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

impl fmt::Display for TerminalSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// Opaque handle to one spawned OS process.
///
/// The process is also the leader of its own process group, so the pid doubles
/// as the group id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle {
    pid: u32,
}

impl ProcessHandle {
    pub fn new(pid: u32) -> Self {
        Self { pid }
    }

    /// OS process id (and process group id) of the spawned process.
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.pid)
    }
}

/// A virtual terminal attached to one managed process.
///
/// Adapters run their own I/O pumping in the background, so every method here
/// must be safe to call while output is still arriving.
pub trait TerminalAdapter: Send {
    /// Reset the screen buffer and scrollback to empty.
    fn clear(&mut self);

    /// Spawn `command` and begin pumping its output.
    ///
    /// The command arrives fully configured (arguments, environment, working
    /// directory, process group); adapters only attach their I/O. `on_exit`
    /// must be called once the process has exited and been reaped.
    ///
    /// # Errors
    /// Returns [`TerminalError::Spawn`] if the OS cannot launch the process.
    fn start(&mut self, command: Command, on_exit: ExitHook)
    -> Result<ProcessHandle, TerminalError>;

    /// Release the I/O pump and any OS-level terminal device. The screen
    /// contents stay readable.
    fn close(&mut self);

    /// Change the visible area.
    fn resize(&mut self, size: TerminalSize);

    /// Move the viewport `lines` towards older output.
    fn scroll_up(&mut self, lines: usize);

    /// Move the viewport `lines` towards live output.
    fn scroll_down(&mut self, lines: usize);

    /// Return the viewport to following live output.
    fn scroll_reset(&mut self);

    /// Whether the viewport is away from the live edge.
    fn is_scrolling(&self) -> bool;

    /// Whether there is scrollback content to scroll into.
    fn scrollable(&self) -> bool;
}
