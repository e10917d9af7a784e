//! Pipe-backed reference terminal adapter.
//!
//! [`PipeTerminal`] attaches piped stdin/stdout/stderr to the launched process.
//! Two pump threads feed stdout and stderr into a shared [`Screen`], and a
//! waiter thread owns the child, reaps it, and fires the exit hook.
//!
//! Every `start`/`close` bumps a pump generation. Pump threads carry the
//! generation they were started with and stop writing as soon as it goes
//! stale, so output from an abandoned spawn never lands in a restarted pane.

use std::io::{Read, Write};
use std::process::{ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::adapter::{ExitHook, ProcessHandle, TerminalAdapter, TerminalSize};
use crate::error::TerminalError;
use crate::screen::Screen;

/// Default number of scrollback lines kept per pane
pub const DEFAULT_SCROLLBACK_LINES: usize = 10_000;

const PUMP_BUFFER_SIZE: usize = 4096;

/// Line-oriented terminal adapter using piped stdio.
pub struct PipeTerminal {
    /// Screen buffer shared with the pump threads
    screen: Arc<Mutex<Screen>>,
    /// Writer to the child's stdin, if still open
    stdin: Option<ChildStdin>,
    /// Current pump generation; pumps from older generations detach
    pump_generation: Arc<AtomicU64>,
}

impl PipeTerminal {
    pub fn new(size: TerminalSize) -> Self {
        Self::new_with_scrollback(size, DEFAULT_SCROLLBACK_LINES)
    }

    pub fn new_with_scrollback(size: TerminalSize, scrollback_lines: usize) -> Self {
        log::debug!(
            "Creating pipe terminal: {}, scrollback: {}",
            size,
            scrollback_lines
        );
        Self {
            screen: Arc::new(Mutex::new(Screen::new(size, scrollback_lines))),
            stdin: None,
            pump_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Lines currently inside the viewport, top to bottom.
    pub fn visible_lines(&self) -> Vec<String> {
        self.screen.lock().visible_lines()
    }

    /// Full buffer as text.
    pub fn content(&self) -> String {
        self.screen.lock().content()
    }

    /// Shared handle to the screen, for renderers that poll it directly.
    pub fn screen(&self) -> Arc<Mutex<Screen>> {
        Arc::clone(&self.screen)
    }

    /// Send input to the running process.
    ///
    /// # Errors
    /// Fails if no process is attached or its stdin has been closed.
    pub fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "no process attached")
        })?;
        stdin.write_all(data)?;
        stdin.flush()
    }

    /// Start a new pump generation. Held under the screen lock so a pump
    /// never feeds between its generation check and this bump.
    fn bump_generation(&self) -> u64 {
        let _screen = self.screen.lock();
        self.pump_generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn spawn_pump<R>(&self, mut reader: R, generation: u64, pid: u32, stream: &'static str)
    where
        R: Read + Send + 'static,
    {
        let screen = Arc::clone(&self.screen);
        let current = Arc::clone(&self.pump_generation);
        let spawned = std::thread::Builder::new()
            .name(format!("par-mux-{stream}-{pid}"))
            .spawn(move || {
                let mut buf = [0u8; PUMP_BUFFER_SIZE];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => {
                            log::debug!("Pipe terminal {} EOF for pid {}", stream, pid);
                            break;
                        }
                        Ok(n) => {
                            // Checked under the screen lock so nothing lands after a clear
                            let mut screen = screen.lock();
                            if current.load(Ordering::Acquire) != generation {
                                log::debug!("Pipe terminal pump for pid {} detached", pid);
                                break;
                            }
                            screen.feed(&buf[..n]);
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            log::warn!("Pipe terminal {} read error for pid {}: {}", stream, pid, e);
                            break;
                        }
                    }
                }
            });
        if let Err(e) = spawned {
            log::error!("Failed to start {} pump for pid {}: {}", stream, pid, e);
        }
    }
}

impl TerminalAdapter for PipeTerminal {
    fn clear(&mut self) {
        self.screen.lock().clear();
    }

    fn start(
        &mut self,
        mut command: Command,
        on_exit: ExitHook,
    ) -> Result<ProcessHandle, TerminalError> {
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let program = command.get_program().to_string_lossy().into_owned();
        let mut child = command
            .spawn()
            .map_err(|source| TerminalError::Spawn { program, source })?;
        let pid = child.id();

        let generation = self.bump_generation();

        self.stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or(TerminalError::Capture("stdout"));
        let stderr = child.stderr.take().ok_or(TerminalError::Capture("stderr"));
        let (stdout, stderr) = match (stdout, stderr) {
            (Ok(out), Ok(err)) => (out, err),
            (Err(e), _) | (_, Err(e)) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };

        self.spawn_pump(stdout, generation, pid, "stdout");
        self.spawn_pump(stderr, generation, pid, "stderr");

        // Waiter thread owns the child so it is always reaped
        let waiter = std::thread::Builder::new()
            .name(format!("par-mux-wait-{pid}"))
            .spawn(move || {
                let code = match child.wait() {
                    Ok(status) => status.code(),
                    Err(e) => {
                        log::warn!("Failed to wait for pid {}: {}", pid, e);
                        None
                    }
                };
                log::debug!("Pipe terminal process {} exited (code={:?})", pid, code);
                on_exit(code);
            });
        if let Err(e) = waiter {
            log::error!("Failed to start waiter thread for pid {}: {}", pid, e);
        }

        log::info!("Pipe terminal started pid {}", pid);
        Ok(ProcessHandle::new(pid))
    }

    fn close(&mut self) {
        // Drop stdin to send EOF and detach the pumps
        self.stdin.take();
        self.bump_generation();
    }

    fn resize(&mut self, size: TerminalSize) {
        self.screen.lock().resize(size);
    }

    fn scroll_up(&mut self, lines: usize) {
        self.screen.lock().scroll_up(lines);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.screen.lock().scroll_down(lines);
    }

    fn scroll_reset(&mut self) {
        self.screen.lock().scroll_reset();
    }

    fn is_scrolling(&self) -> bool {
        self.screen.lock().is_scrolling()
    }

    fn scrollable(&self) -> bool {
        self.screen.lock().scrollable()
    }
}

impl Drop for PipeTerminal {
    fn drop(&mut self) {
        self.close();
    }
}
