//! Events carried by the multiplexer's single serialized queue.

use tokio::sync::oneshot;

use super::snapshot::ProcessSummary;
use crate::process::ProcessSpec;

/// Viewport movement requested for one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAction {
    /// Towards older output by this many lines
    Up(usize),
    /// Towards live output by this many lines
    Down(usize),
    /// Back to following live output
    Reset,
}

/// A request for the processing task.
///
/// Every registry mutation goes through one of these; nothing else touches the
/// registry.
#[derive(Debug)]
pub enum MuxEvent {
    /// Register a new process and start it if `autostart` is set.
    AddProcess(ProcessSpec),

    /// Restart a process that is not running.
    Start { key: String },

    /// UI-originated kill. Refused for non-killable processes.
    Kill { key: String },

    /// Move one process's viewport.
    Scroll { key: String, action: ScrollAction },

    /// New pane geometry for every adapter, current and future.
    Resize { cols: u16, rows: u16 },

    /// Posted by an exit hook once the OS process has been reaped.
    ProcessExited {
        key: String,
        generation: u64,
        exit_code: Option<i32>,
    },

    /// Reply with a summary taken on the processing task.
    Inspect {
        key: String,
        reply: oneshot::Sender<Option<ProcessSummary>>,
    },

    /// Kill everything and stop the loop.
    Shutdown,
}

impl MuxEvent {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddProcess(_) => "AddProcess",
            Self::Start { .. } => "Start",
            Self::Kill { .. } => "Kill",
            Self::Scroll { .. } => "Scroll",
            Self::Resize { .. } => "Resize",
            Self::ProcessExited { .. } => "ProcessExited",
            Self::Inspect { .. } => "Inspect",
            Self::Shutdown => "Shutdown",
        }
    }
}
