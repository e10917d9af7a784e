//! Process-group placement and group-wide termination.
//!
//! Each managed process leads its own group so a signal reaches everything it
//! spawned, not just the direct child. The group id equals the leader's pid.

use std::io;
use std::process::Command;

/// Configure `command` so the spawned process starts a new process group.
pub fn configure_process_group(command: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        command.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = command;
    }
}

/// Send SIGTERM to the process group led by `pid`.
///
/// # Errors
/// Returns the OS error when the group no longer exists (`ESRCH`) or cannot be
/// signalled. Callers treat termination as best-effort.
pub fn terminate_process_group(pid: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        signal_group(pid, libc::SIGTERM)
    }
    #[cfg(windows)]
    {
        taskkill_tree(pid)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = pid;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process groups are not supported on this platform",
        ))
    }
}

/// Send SIGKILL to the process group led by `pid`.
///
/// # Errors
/// Same as [`terminate_process_group`].
pub fn kill_process_group(pid: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        signal_group(pid, libc::SIGKILL)
    }
    #[cfg(windows)]
    {
        taskkill_tree(pid)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = pid;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process groups are not supported on this platform",
        ))
    }
}

/// Process group id of `pid`, or `None` if the process is gone or the
/// platform has no process-group concept.
pub fn process_group_id(pid: u32) -> Option<u32> {
    #[cfg(unix)]
    {
        let pid = libc::pid_t::try_from(pid).ok()?;
        // SAFETY: getpgid(2) only reads kernel state for the given pid.
        let pgid = unsafe { libc::getpgid(pid) };
        u32::try_from(pgid).ok()
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        None
    }
}

/// Process group id of the multiplexer itself.
pub fn current_process_group_id() -> Option<u32> {
    process_group_id(std::process::id())
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pid)
        .ok()
        .filter(|pgid| *pgid > 1)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to signal process group {pid}"),
            )
        })?;

    // SAFETY: kill(2) has no memory-safety preconditions; a negative pid
    // addresses the whole process group.
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc == 0 {
        log::debug!("Sent signal {} to process group {}", signal, pgid);
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(windows)]
fn taskkill_tree(pid: u32) -> io::Result<()> {
    let output = Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pid.to_string()])
        .output()?;

    if output.status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!(
            "taskkill failed for pid {}: {}",
            pid,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}
