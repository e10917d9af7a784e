// Library exports for testing and potential library use
//
// # Concurrency model
//
// One processing task (`Multiplexer::run`) owns the registry and is the only
// code that creates, starts, or kills processes. Everything else talks to it
// through a `MuxHandle`, which only enqueues events.
//
//   - `tokio::sync::mpsc` unbounded channels carry events in; `oneshot` carries
//     `inspect` replies out.
//   - `arc_swap::ArcSwap` publishes an immutable registry snapshot after each
//     event, so readers never wait on the loop.
//   - `parking_lot::Mutex` guards terminal screens that pump threads write to.

/// Application version (root crate version, for use by sub-crates).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod debug;
pub mod error;
pub mod multiplexer;
pub mod platform;
pub mod process;

pub use error::MuxError;
pub use multiplexer::{
    Multiplexer, MuxEvent, MuxHandle, MuxOptions, ProcessSummary, RegistrySnapshot, ScrollAction,
};
pub use process::{ManagedProcess, ProcessSpec};
