//! Command-line interface for par-mux.
//!
//! This module handles CLI argument parsing and the subcommands that finish
//! without starting the multiplexer (`check`, `init`).

use clap::{Parser, Subcommand};
use par_mux_config::{Config, ProcessConfig};
use std::path::PathBuf;
use std::time::Duration;

/// par-mux - Run named processes side by side, each in its own scrollable pane
#[derive(Parser)]
#[command(name = "par-mux")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Stop all processes and exit after the specified number of seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub exit_after: Option<f64>,

    /// Set debug log level (overrides config and RUST_LOG)
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the config file and list the processes it defines
    Check,

    /// Write an example config file
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Run a single ad-hoc process instead of the configured ones
    Run {
        /// Registry key for the process
        #[arg(long, default_value = "main")]
        key: String,

        /// Display title (defaults to the key)
        #[arg(long)]
        title: Option<String>,

        /// Icon shown next to the title
        #[arg(long, default_value = "")]
        icon: String,

        /// Working directory (defaults to the current one)
        #[arg(long, value_name = "DIR")]
        cwd: Option<PathBuf>,

        /// Environment entry (KEY=VALUE); repeatable. Replaces the inherited environment.
        #[arg(short, long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Command to run. A single argument is split like a shell would.
        #[arg(
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true,
            value_name = "COMMAND"
        )]
        command: Vec<String>,
    },
}

/// Runtime options passed from CLI to the multiplexer
#[derive(Clone, Debug, Default)]
pub struct RuntimeOptions {
    /// Config file override
    pub config_path: Option<PathBuf>,
    /// Stop everything after this long
    pub exit_after: Option<Duration>,
    /// Log level override from CLI
    pub log_level: Option<log::LevelFilter>,
    /// Ad-hoc process from `par-mux run`, replacing the configured ones
    pub adhoc: Option<ProcessConfig>,
}

/// Result of CLI processing
pub enum CliResult {
    /// Start the multiplexer with these options
    Continue(RuntimeOptions),
    /// Exit with the given code (subcommand completed)
    Exit(i32),
}

/// Split a command given as one string, the way a POSIX shell would.
/// Multi-part commands are taken verbatim.
pub fn parse_command(parts: Vec<String>) -> Result<Vec<String>, shell_words::ParseError> {
    match parts.as_slice() {
        [single] => shell_words::split(single),
        _ => Ok(parts),
    }
}

/// Process CLI arguments and handle subcommands
pub fn process_cli() -> CliResult {
    resolve(Cli::parse())
}

fn resolve(cli: Cli) -> CliResult {
    let exit_after = match cli.exit_after.map(Duration::try_from_secs_f64) {
        Some(Err(e)) => {
            eprintln!("par-mux: invalid --exit-after value: {}", e);
            return CliResult::Exit(2);
        }
        Some(Ok(duration)) => Some(duration),
        None => None,
    };

    let mut options = RuntimeOptions {
        config_path: cli.config,
        exit_after,
        log_level: cli.log_level.map(|l| l.to_level_filter()),
        adhoc: None,
    };

    match cli.command {
        Some(Commands::Check) => CliResult::Exit(check_config(options.config_path.as_deref())),
        Some(Commands::Init { force }) => {
            CliResult::Exit(init_config(options.config_path.as_deref(), force))
        }
        Some(Commands::Run {
            key,
            title,
            icon,
            cwd,
            env,
            command,
        }) => {
            let args = match parse_command(command) {
                Ok(args) => args,
                Err(e) => {
                    eprintln!("par-mux: could not parse command: {}", e);
                    return CliResult::Exit(2);
                }
            };
            let mut process = ProcessConfig::new(key, args);
            process.title = title.unwrap_or_default();
            process.icon = icon;
            process.cwd = cwd.map(|dir| dir.to_string_lossy().into_owned());
            process.env = env;
            if let Err(e) = process.validate() {
                eprintln!("par-mux: {}", e);
                return CliResult::Exit(2);
            }
            options.adhoc = Some(process);
            CliResult::Continue(options)
        }
        None => CliResult::Continue(options),
    }
}

fn check_config(path: Option<&std::path::Path>) -> i32 {
    let shown = path.map_or_else(Config::config_path, PathBuf::from);
    match Config::load(path) {
        Ok(config) => {
            println!("{}: OK", shown.display());
            if config.processes.is_empty() {
                println!("  (no processes defined)");
            }
            for process in &config.processes {
                println!(
                    "  {} {} [{}] {}{}{}",
                    if process.icon.is_empty() { "-" } else { process.icon.as_str() },
                    process.display_title(),
                    process.key,
                    process.args.join(" "),
                    if process.autostart { "" } else { " (manual start)" },
                    if process.killable { "" } else { " (not killable)" },
                );
            }
            0
        }
        Err(e) => {
            eprintln!("{}: {}", shown.display(), e);
            1
        }
    }
}

fn init_config(path: Option<&std::path::Path>, force: bool) -> i32 {
    let path = path.map_or_else(Config::config_path, PathBuf::from);
    if path.exists() && !force {
        eprintln!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
        return 1;
    }
    match Config::example().save_to(&path) {
        Ok(()) => {
            println!("Wrote example config to {}", path.display());
            0
        }
        Err(e) => {
            eprintln!("par-mux: {}", e);
            1
        }
    }
}
