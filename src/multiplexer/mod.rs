//! The multiplexer control plane.
//!
//! [`Multiplexer`] owns the registry of [`ManagedProcess`]es and a single
//! serialized event queue. Producers hold a cloneable [`MuxHandle`]; the
//! processing task started with [`Multiplexer::run`] is the only code that
//! creates, starts, or kills processes.
//!
//! Exit hooks report on a second, internal channel so that exits can still be
//! collected after the last handle is gone.

mod event;
mod handle;
mod snapshot;

pub use event::{MuxEvent, ScrollAction};
pub use handle::MuxHandle;
pub use snapshot::{ProcessSummary, RegistrySnapshot};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use par_mux_config::Config;
use par_mux_terminal::{TerminalFactory, TerminalSize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

use crate::error::MuxError;
use crate::process::{ManagedProcess, ProcessSpec};

/// How long to wait for exits after force-killing stragglers.
const FORCE_KILL_WAIT: Duration = Duration::from_millis(500);

/// Settings fixed for the lifetime of a multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxOptions {
    /// Pane size handed to new adapters until the first resize
    pub size: TerminalSize,
    /// How long shutdown waits for processes to exit before force-killing
    pub shutdown_grace: Duration,
}

impl Default for MuxOptions {
    fn default() -> Self {
        Self {
            size: TerminalSize::new(
                par_mux_config::defaults::cols(),
                par_mux_config::defaults::rows(),
            ),
            shutdown_grace: Duration::from_millis(par_mux_config::defaults::shutdown_grace_ms()),
        }
    }
}

impl From<&Config> for MuxOptions {
    fn from(config: &Config) -> Self {
        Self {
            size: TerminalSize::new(config.terminal.cols, config.terminal.rows),
            shutdown_grace: config.shutdown_grace(),
        }
    }
}

/// Registry of managed processes plus the loop that mutates it.
pub struct Multiplexer {
    processes: HashMap<String, ManagedProcess>,
    /// Keys in registration order
    order: Vec<String>,
    events: UnboundedReceiver<MuxEvent>,
    exits_tx: UnboundedSender<MuxEvent>,
    exits: UnboundedReceiver<MuxEvent>,
    factory: TerminalFactory,
    size: TerminalSize,
    shutdown_grace: Duration,
    snapshot: Arc<ArcSwap<RegistrySnapshot>>,
}

impl Multiplexer {
    /// Create an idle multiplexer and its first handle.
    ///
    /// `factory` produces one adapter per registered process. Nothing runs
    /// until [`run`](Self::run) is awaited.
    pub fn new(factory: TerminalFactory, options: MuxOptions) -> (Self, MuxHandle) {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (exits_tx, exits) = mpsc::unbounded_channel();
        let snapshot = Arc::new(ArcSwap::from_pointee(RegistrySnapshot::default()));

        let mux = Self {
            processes: HashMap::new(),
            order: Vec::new(),
            events,
            exits_tx,
            exits,
            factory,
            size: options.size,
            shutdown_grace: options.shutdown_grace,
            snapshot: Arc::clone(&snapshot),
        };
        (mux, MuxHandle::new(events_tx, snapshot))
    }

    /// Process events until a shutdown is requested or every handle is
    /// dropped, then stop all processes. Returns the final registry state.
    pub async fn run(mut self) -> RegistrySnapshot {
        log::info!(
            "Multiplexer event loop started (pane {}, grace {:?})",
            self.size,
            self.shutdown_grace
        );

        loop {
            let event = tokio::select! {
                biased;
                Some(exit) = self.exits.recv() => exit,
                event = self.events.recv() => match event {
                    Some(event) => event,
                    None => {
                        log::info!("All multiplexer handles dropped");
                        break;
                    }
                },
            };

            if matches!(event, MuxEvent::Shutdown) {
                log::info!("Shutdown requested");
                break;
            }

            let name = event.name();
            if let Err(e) = self.handle_event(event) {
                log::warn!("{} failed: {}", name, e);
            }
            self.publish();
        }

        self.shutdown().await
    }

    fn handle_event(&mut self, event: MuxEvent) -> Result<(), MuxError> {
        match event {
            MuxEvent::AddProcess(spec) => self.add_process(spec),
            MuxEvent::Start { key } => {
                let process = self
                    .processes
                    .get_mut(&key)
                    .ok_or(MuxError::UnknownProcess(key))?;
                process.start(&self.exits_tx).map(|_| ())
            }
            MuxEvent::Kill { key } => {
                let process = self.process_mut(&key)?;
                if !process.is_killable() {
                    return Err(MuxError::NotKillable(key));
                }
                process.kill();
                Ok(())
            }
            MuxEvent::Scroll { key, action } => {
                let process = self.process_mut(&key)?;
                match action {
                    ScrollAction::Up(lines) => process.scroll_up(lines),
                    ScrollAction::Down(lines) => process.scroll_down(lines),
                    ScrollAction::Reset => process.scroll_reset(),
                }
                Ok(())
            }
            MuxEvent::Resize { cols, rows } => {
                if cols == 0 || rows == 0 {
                    log::warn!("Ignoring resize to {}x{}", cols, rows);
                    return Ok(());
                }
                self.size = TerminalSize::new(cols, rows);
                for process in self.processes.values_mut() {
                    process.resize(self.size);
                }
                log::debug!("Resized {} pane(s) to {}", self.processes.len(), self.size);
                Ok(())
            }
            MuxEvent::ProcessExited {
                key,
                generation,
                exit_code,
            } => {
                let process = self.process_mut(&key)?;
                if process.mark_exited(generation, exit_code) {
                    log::info!("Process '{}' exited (code {:?})", key, exit_code);
                } else {
                    log::debug!(
                        "Ignoring stale exit of '{}' generation {} (current {})",
                        key,
                        generation,
                        process.generation()
                    );
                }
                Ok(())
            }
            MuxEvent::Inspect { key, reply } => {
                let summary = self.processes.get(&key).map(ManagedProcess::summary);
                // The caller may have stopped waiting
                let _ = reply.send(summary);
                Ok(())
            }
            // Handled by `run` before dispatch
            MuxEvent::Shutdown => Ok(()),
        }
    }

    fn add_process(&mut self, spec: ProcessSpec) -> Result<(), MuxError> {
        if self.processes.contains_key(&spec.key) {
            return Err(MuxError::DuplicateKey(spec.key));
        }

        let key = spec.key.clone();
        let autostart = spec.autostart;
        let mut process = ManagedProcess::new(spec, (self.factory)(self.size));
        log::info!("Registered process '{}'", key);

        let started = if autostart {
            process.start(&self.exits_tx).map(|_| ())
        } else {
            Ok(())
        };

        self.order.push(key.clone());
        self.processes.insert(key, process);
        started
    }

    fn process_mut(&mut self, key: &str) -> Result<&mut ManagedProcess, MuxError> {
        self.processes
            .get_mut(key)
            .ok_or_else(|| MuxError::UnknownProcess(key.to_string()))
    }

    fn build_snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            processes: self
                .order
                .iter()
                .filter_map(|key| self.processes.get(key))
                .map(ManagedProcess::summary)
                .collect(),
        }
    }

    fn publish(&self) {
        self.snapshot.store(Arc::new(self.build_snapshot()));
    }

    fn any_alive(&self) -> bool {
        self.processes.values().any(ManagedProcess::is_alive)
    }

    /// Collect exit reports until nothing is alive or `deadline` passes.
    /// Returns whether everything exited.
    async fn drain_exits(&mut self, deadline: Instant) -> bool {
        while self.any_alive() {
            match tokio::time::timeout_at(deadline, self.exits.recv()).await {
                Ok(Some(event)) => {
                    if let Err(e) = self.handle_event(event) {
                        log::debug!("Exit report during shutdown: {}", e);
                    }
                }
                Ok(None) | Err(_) => return false,
            }
        }
        true
    }

    async fn shutdown(mut self) -> RegistrySnapshot {
        // Refuse anything enqueued from here on
        self.events.close();

        log::info!("Stopping {} process(es)", self.processes.len());
        for key in &self.order {
            if let Some(process) = self.processes.get_mut(key) {
                process.kill();
            }
        }
        self.publish();

        let deadline = Instant::now() + self.shutdown_grace;
        if !self.drain_exits(deadline).await {
            // Exited leaders may have left children behind in their group
            for process in self.processes.values_mut().filter(|p| p.handle().is_some()) {
                if process.is_alive() {
                    log::warn!(
                        "Process '{}' still running after {:?}, force-killing",
                        process.key(),
                        self.shutdown_grace
                    );
                }
                process.force_kill();
            }
            if !self.drain_exits(Instant::now() + FORCE_KILL_WAIT).await {
                log::warn!("Some processes did not report an exit before shutdown completed");
            }
        }

        let snapshot = self.build_snapshot();
        self.snapshot.store(Arc::new(snapshot.clone()));
        log::info!("Multiplexer stopped");
        snapshot
    }
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("processes", &self.order)
            .field("size", &self.size)
            .field("shutdown_grace", &self.shutdown_grace)
            .finish_non_exhaustive()
    }
}
