//! Cloneable producer side of the multiplexer.

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

use super::event::{MuxEvent, ScrollAction};
use super::snapshot::{ProcessSummary, RegistrySnapshot};
use crate::error::MuxError;
use crate::process::ProcessSpec;

/// Posts events to a running [`Multiplexer`](super::Multiplexer).
///
/// Every method except [`inspect`](Self::inspect) is non-blocking and can be
/// called from any thread, async or not. Results only cover enqueueing: what
/// the processing task does with an event is logged and reflected in the next
/// [`snapshot`](Self::snapshot).
///
/// The event loop shuts down once every handle has been dropped.
#[derive(Clone)]
pub struct MuxHandle {
    events: UnboundedSender<MuxEvent>,
    snapshot: Arc<ArcSwap<RegistrySnapshot>>,
}

impl MuxHandle {
    pub(super) fn new(
        events: UnboundedSender<MuxEvent>,
        snapshot: Arc<ArcSwap<RegistrySnapshot>>,
    ) -> Self {
        Self { events, snapshot }
    }

    fn send(&self, event: MuxEvent) -> Result<(), MuxError> {
        self.events.send(event).map_err(|_| MuxError::Closed)
    }

    /// Register a process. It is created (and started, if `autostart`) when
    /// the processing task reaches the event; spawn failures are not reported
    /// here.
    ///
    /// A `cwd` of `None` or an empty path inherits the multiplexer's working
    /// directory. A non-empty `env` replaces the inherited environment.
    ///
    /// # Errors
    /// [`MuxError::EmptyKey`], [`MuxError::EmptyArgs`] and
    /// [`MuxError::InvalidEnv`] for specs that could never launch, or
    /// [`MuxError::Closed`] if the loop has stopped.
    #[allow(clippy::too_many_arguments)]
    pub fn add_process(
        &self,
        key: impl Into<String>,
        args: Vec<String>,
        icon: impl Into<String>,
        title: impl Into<String>,
        cwd: Option<PathBuf>,
        killable: bool,
        autostart: bool,
        env: Vec<String>,
    ) -> Result<(), MuxError> {
        self.register(ProcessSpec {
            key: key.into(),
            args,
            icon: icon.into(),
            title: title.into(),
            cwd: cwd.filter(|dir| !dir.as_os_str().is_empty()),
            killable,
            autostart,
            env,
        })
    }

    /// Struct-based form of [`add_process`](Self::add_process).
    ///
    /// # Errors
    /// Same as [`add_process`](Self::add_process).
    pub fn register(&self, spec: ProcessSpec) -> Result<(), MuxError> {
        spec.validate()?;
        log::debug!("Enqueueing registration of '{}'", spec.key);
        self.send(MuxEvent::AddProcess(spec))
    }

    /// Restart a stopped process.
    pub fn start(&self, key: impl Into<String>) -> Result<(), MuxError> {
        self.send(MuxEvent::Start { key: key.into() })
    }

    /// Kill a process on behalf of the user.
    pub fn kill(&self, key: impl Into<String>) -> Result<(), MuxError> {
        self.send(MuxEvent::Kill { key: key.into() })
    }

    pub fn scroll_up(&self, key: impl Into<String>, lines: usize) -> Result<(), MuxError> {
        self.scroll(key, ScrollAction::Up(lines))
    }

    pub fn scroll_down(&self, key: impl Into<String>, lines: usize) -> Result<(), MuxError> {
        self.scroll(key, ScrollAction::Down(lines))
    }

    pub fn scroll_reset(&self, key: impl Into<String>) -> Result<(), MuxError> {
        self.scroll(key, ScrollAction::Reset)
    }

    fn scroll(&self, key: impl Into<String>, action: ScrollAction) -> Result<(), MuxError> {
        self.send(MuxEvent::Scroll {
            key: key.into(),
            action,
        })
    }

    /// Resize every pane, and every pane created from now on.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), MuxError> {
        self.send(MuxEvent::Resize { cols, rows })
    }

    /// Kill every process and stop the loop.
    pub fn shutdown(&self) -> Result<(), MuxError> {
        self.send(MuxEvent::Shutdown)
    }

    /// Summary of `key` taken on the processing task, after every event
    /// enqueued before this call has been handled.
    ///
    /// # Errors
    /// [`MuxError::Closed`] if the loop stops before answering.
    pub async fn inspect(&self, key: impl Into<String>) -> Result<Option<ProcessSummary>, MuxError> {
        let (reply, response) = oneshot::channel();
        self.send(MuxEvent::Inspect {
            key: key.into(),
            reply,
        })?;
        response.await.map_err(|_| MuxError::Closed)
    }

    /// Latest published registry state. Lock-free.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    /// Whether the event loop has stopped accepting events.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

impl std::fmt::Debug for MuxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MuxHandle")
            .field("closed", &self.events.is_closed())
            .finish_non_exhaustive()
    }
}
