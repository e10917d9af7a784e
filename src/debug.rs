//! Unified logging for par-mux
//!
//! Every crate in the workspace logs through the `log` facade. This module
//! installs the one `log::Log` implementation, which writes to
//! /tmp/par_mux_debug.log on Unix/macOS, or %TEMP%\par_mux_debug.log on Windows.
//! Keeping log output in a file leaves stdout/stderr to the managed processes
//! and the status lines printed by the binary.
//!
//! Level precedence:
//! 1. `--log-level` on the command line
//! 2. `RUST_LOG` (which also mirrors every line to stderr)
//! 3. `log_level` from config.yaml, applied once the config is loaded

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{LevelFilter, Log, Metadata, Record};

const LOG_FILE_NAME: &str = "par_mux_debug.log";

struct FileLogger {
    file: Mutex<Option<File>>,
    mirror_stderr: bool,
}

impl FileLogger {
    fn new(mirror_stderr: bool) -> Self {
        // Silently run without a file if it can't be opened
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(log_path())
            .ok();
        Self {
            file: Mutex::new(file),
            mirror_stderr,
        }
    }

    fn write_raw(&self, msg: &str) {
        if let Some(ref mut file) = *self.file.lock() {
            let _ = file.write_all(msg.as_bytes());
            let _ = file.flush();
        }
        if self.mirror_stderr {
            eprint!("{}", msg);
        }
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.write_raw(&format!(
            "[{}] [{:<5}] [{}] {}\n",
            get_timestamp(),
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {
        if let Some(ref mut file) = *self.file.lock() {
            let _ = file.flush();
        }
    }
}

static LOGGER: OnceLock<FileLogger> = OnceLock::new();

/// Set when the CLI or `RUST_LOG` chose the level, so config cannot override it.
static LEVEL_PINNED: AtomicBool = AtomicBool::new(false);

fn get_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Location of the debug log file.
pub fn log_path() -> PathBuf {
    #[cfg(unix)]
    {
        PathBuf::from("/tmp").join(LOG_FILE_NAME)
    }
    #[cfg(not(unix))]
    {
        std::env::temp_dir().join(LOG_FILE_NAME)
    }
}

/// Level requested by a `RUST_LOG` value.
///
/// Only the bare level or the level of the first `target=level` directive is
/// honoured; per-module filtering is not supported.
pub fn parse_rust_log(value: &str) -> Option<LevelFilter> {
    let directive = value.split(',').next()?.trim();
    let level = directive
        .rsplit_once('=')
        .map_or(directive, |(_, level)| level);
    level.trim().parse().ok()
}

/// Install the logger. Call once, before anything logs.
///
/// `cli_level` wins over `RUST_LOG`. With neither, logging stays off until
/// [`apply_config_level`] is called.
pub fn init_log_bridge(cli_level: Option<LevelFilter>) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let env_level = rust_log.as_deref().and_then(parse_rust_log);

    let logger = LOGGER.get_or_init(|| FileLogger::new(rust_log.is_some()));
    if log::set_logger(logger).is_err() {
        // Already installed (e.g. called twice in tests)
        return;
    }

    let level = match cli_level.or(env_level) {
        Some(level) => {
            LEVEL_PINNED.store(true, Ordering::Relaxed);
            level
        }
        None => LevelFilter::Off,
    };
    log::set_max_level(level);

    if level != LevelFilter::Off {
        logger.write_raw(&format!(
            "\n{}\npar-mux debug session started at {} (level={})\n{}\n",
            "=".repeat(80),
            get_timestamp(),
            level,
            "=".repeat(80)
        ));
    }
}

/// Apply the level from config.yaml unless the CLI or `RUST_LOG` chose one.
pub fn apply_config_level(level: LevelFilter) {
    if LEVEL_PINNED.load(Ordering::Relaxed) {
        return;
    }
    log::set_max_level(level);
    log::info!("Log level set to {} from config", level);
}
