//! Virtual terminal adapter boundary for the par-mux control plane.
//!
//! The control plane never talks to a terminal emulator directly. Each managed
//! process owns one [`TerminalAdapter`], which is responsible for:
//!
//! - Spawning the launch descriptor handed to it and pumping its output
//! - Maintaining the screen buffer and scrollback
//! - Reporting process exit through an [`ExitHook`]
//! - Scroll-state bookkeeping (clamping is the adapter's job)
//!
//! [`PipeTerminal`] is a line-oriented reference adapter built on piped stdio.
//! It is what the `par-mux` binary uses when no richer renderer is wired in.

pub mod adapter;
pub mod error;
pub mod pipe;
pub mod screen;
pub mod scroll;

// Re-export main types for convenience
pub use adapter::{ExitHook, ProcessHandle, TerminalAdapter, TerminalFactory, TerminalSize};
pub use error::TerminalError;
pub use pipe::PipeTerminal;
pub use screen::Screen;
pub use scroll::ScrollState;
