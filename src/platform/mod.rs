//! Platform abstraction layer for par-mux.
//!
//! This module centralises the platform-specific process-group mechanics that
//! would otherwise be scattered across the codebase as inline `#[cfg]` blocks.
//!
//! # Conventions
//!
//! - Every public function in this module has a single, consistent cross-platform
//!   signature.  The platform branching is contained *inside* each function body.
//! - Consumers import `crate::platform` and call the function directly; no
//!   `#[cfg]` attributes are required at the call site.
//!
//! # Contents
//!
//! | Function | Description |
//! |---|---|
//! | [`configure_process_group`] | Make a launch descriptor start a new process group |
//! | [`terminate_process_group`] | Ask every process in a group to exit |
//! | [`kill_process_group`] | Forcefully kill every process in a group |
//! | [`process_group_id`] | Group id of a running process, where the OS exposes it |

mod process_group;

pub use process_group::{
    configure_process_group, current_process_group_id, kill_process_group, process_group_id,
    terminate_process_group,
};
