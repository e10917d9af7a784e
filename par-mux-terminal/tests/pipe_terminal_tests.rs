//! Integration tests for the pipe-backed terminal adapter.
//!
//! These spawn real `sh` processes, so they only run on Unix.
#![cfg(unix)]

use par_mux_terminal::{ExitHook, PipeTerminal, TerminalAdapter, TerminalError, TerminalSize};
use std::process::Command;
use std::sync::mpsc;
use std::time::{Duration, Instant};

fn sh(script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", script]);
    cmd
}

fn exit_channel() -> (ExitHook, mpsc::Receiver<Option<i32>>) {
    let (tx, rx) = mpsc::channel();
    let hook: ExitHook = Box::new(move |code| {
        let _ = tx.send(code);
    });
    (hook, rx)
}

/// Poll until `cond` holds or the timeout expires.
fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    cond()
}

#[test]
fn test_captures_stdout_and_stderr() {
    let mut term = PipeTerminal::new(TerminalSize::new(80, 24));
    let (hook, exited) = exit_channel();

    term.start(sh("echo out; echo err 1>&2"), hook)
        .expect("Failed to start sh");

    let code = exited
        .recv_timeout(Duration::from_secs(5))
        .expect("exit hook was not called");
    assert_eq!(code, Some(0));

    assert!(
        wait_for(Duration::from_secs(2), || term.content().lines().count() == 2),
        "expected two lines, got {:?}",
        term.content()
    );
    let content = term.content();
    assert!(content.contains("out"));
    assert!(content.contains("err"));
}

#[test]
fn test_exit_hook_receives_exit_code() {
    let mut term = PipeTerminal::new(TerminalSize::default());
    let (hook, exited) = exit_channel();

    let handle = term.start(sh("exit 3"), hook).expect("Failed to start sh");
    assert!(handle.pid() > 0);

    let code = exited
        .recv_timeout(Duration::from_secs(5))
        .expect("exit hook was not called");
    assert_eq!(code, Some(3));
}

#[test]
fn test_spawn_failure_is_reported() {
    let mut term = PipeTerminal::new(TerminalSize::default());
    let (hook, exited) = exit_channel();

    let result = term.start(Command::new("nonexistent_binary_that_does_not_exist_12345"), hook);
    match result {
        Err(TerminalError::Spawn { program, source }) => {
            assert_eq!(program, "nonexistent_binary_that_does_not_exist_12345");
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("Expected spawn error, got: {:?}", other.map(|h| h.pid())),
    }

    // The hook is dropped without being called
    assert!(exited.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn test_scrolling_over_real_output() {
    let mut term = PipeTerminal::new(TerminalSize::new(80, 5));
    let (hook, exited) = exit_channel();

    term.start(sh("i=1; while [ $i -le 20 ]; do echo line$i; i=$((i+1)); done"), hook)
        .expect("Failed to start sh");
    exited
        .recv_timeout(Duration::from_secs(5))
        .expect("exit hook was not called");
    assert!(wait_for(Duration::from_secs(2), || term.content().lines().count() == 20));

    assert!(term.scrollable());
    assert!(!term.is_scrolling());
    assert_eq!(term.visible_lines().last().map(String::as_str), Some("line20"));

    term.scroll_up(3);
    assert!(term.is_scrolling());
    assert_eq!(term.visible_lines().last().map(String::as_str), Some("line17"));

    term.scroll_down(1);
    assert_eq!(term.visible_lines().last().map(String::as_str), Some("line18"));

    term.scroll_reset();
    assert!(!term.is_scrolling());
    assert_eq!(term.visible_lines().last().map(String::as_str), Some("line20"));
}

#[test]
fn test_clear_keeps_adapter_usable_for_restart() {
    let mut term = PipeTerminal::new(TerminalSize::default());

    let (hook, exited) = exit_channel();
    term.start(sh("echo first"), hook).expect("Failed to start sh");
    exited.recv_timeout(Duration::from_secs(5)).expect("no exit");
    assert!(wait_for(Duration::from_secs(2), || term.content() == "first"));
    term.close();

    term.clear();
    assert_eq!(term.content(), "");

    let (hook, exited) = exit_channel();
    term.start(sh("echo second"), hook).expect("Failed to restart sh");
    exited.recv_timeout(Duration::from_secs(5)).expect("no exit");
    assert!(
        wait_for(Duration::from_secs(2), || term.content() == "second"),
        "got {:?}",
        term.content()
    );
}

#[test]
fn test_detached_output_never_lands_after_clear() {
    let mut term = PipeTerminal::new(TerminalSize::default());

    // Writes as fast as it can; SIGPIPE ends it once the pumps detach
    let (hook, exited) = exit_channel();
    term.start(sh("while :; do echo old; done"), hook)
        .expect("Failed to start sh");
    assert!(wait_for(Duration::from_secs(2), || term.content().contains("old")));

    term.close();
    term.clear();
    exited.recv_timeout(Duration::from_secs(5)).expect("writer outlived its pumps");
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(term.content(), "");

    let (hook, exited) = exit_channel();
    term.start(sh("echo new"), hook).expect("Failed to restart sh");
    exited.recv_timeout(Duration::from_secs(5)).expect("no exit");
    assert!(
        wait_for(Duration::from_secs(2), || term.content() == "new"),
        "got {:?}",
        term.content()
    );
}

#[test]
fn test_write_reaches_stdin() {
    let mut term = PipeTerminal::new(TerminalSize::default());
    let (hook, exited) = exit_channel();

    term.start(sh("read line; echo got:$line"), hook)
        .expect("Failed to start sh");
    term.write(b"hello\n").expect("Failed to write stdin");

    exited.recv_timeout(Duration::from_secs(5)).expect("no exit");
    assert!(
        wait_for(Duration::from_secs(2), || term.content() == "got:hello"),
        "got {:?}",
        term.content()
    );
}

#[test]
fn test_write_without_process_fails() {
    let mut term = PipeTerminal::new(TerminalSize::default());
    let err = term.write(b"x").expect_err("write should fail without a process");
    assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);
}

#[test]
fn test_resize_reclamps_scroll() {
    let mut term = PipeTerminal::new(TerminalSize::new(80, 2));
    let (hook, exited) = exit_channel();
    term.start(sh("printf '1\\n2\\n3\\n4\\n'"), hook)
        .expect("Failed to start sh");
    exited.recv_timeout(Duration::from_secs(5)).expect("no exit");
    assert!(wait_for(Duration::from_secs(2), || term.content().lines().count() == 4));

    term.scroll_up(2);
    assert!(term.is_scrolling());

    term.resize(TerminalSize::new(80, 10));
    assert!(!term.is_scrolling());
    assert!(!term.scrollable());
}
