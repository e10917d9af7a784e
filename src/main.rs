use anyhow::{Context, Result};
use par_mux::cli;
use par_mux::{Multiplexer, MuxHandle, MuxOptions, ProcessSpec, RegistrySnapshot};
use par_mux_config::Config;
use par_mux_terminal::{PipeTerminal, TerminalAdapter, TerminalFactory};
use std::collections::HashMap;
use std::time::Duration;
use tokio::runtime::Runtime;

/// How often the status watcher looks at the registry.
const STATUS_INTERVAL: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    // Process CLI arguments first (before logging init for cleaner output)
    let options = match cli::process_cli() {
        cli::CliResult::Exit(code) => {
            if code == 0 {
                return Ok(());
            }
            // Nothing has been spawned yet, so no destructors are skipped.
            std::process::exit(code);
        }
        cli::CliResult::Continue(options) => options,
    };
    // CLI --log-level flag takes highest precedence, then RUST_LOG, then config (applied below).
    par_mux::debug::init_log_bridge(options.log_level);

    log::info!("Starting par-mux {}", par_mux::VERSION);

    let config_path = options
        .config_path
        .clone()
        .unwrap_or_else(Config::config_path);
    let mut config = Config::load(options.config_path.as_deref())
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    par_mux::debug::apply_config_level(config.log_level.to_level_filter());

    if let Some(process) = options.adhoc {
        config.processes = vec![process];
    }
    if config.processes.is_empty() {
        eprintln!(
            "par-mux: no processes configured in {} (try `par-mux init` or `par-mux run -- CMD`)",
            config_path.display()
        );
        return Ok(());
    }
    if config.autostart_count() == 0 {
        // Nothing here can start a manual process, so there is nothing to wait for
        eprintln!(
            "par-mux: none of the {} configured process(es) has autostart enabled in {}",
            config.processes.len(),
            config_path.display()
        );
        return Ok(());
    }

    let runtime = Runtime::new()?;
    let result = runtime.block_on(run(config, options.exit_after));

    // Use `shutdown_timeout` to avoid blocking forever if a background task hangs.
    log::info!("Event loop exited, shutting down runtime");
    runtime.shutdown_timeout(Duration::from_secs(2));

    let snapshot = result?;
    for process in &snapshot.processes {
        println!("{}", process);
    }
    Ok(())
}

async fn run(config: Config, exit_after: Option<Duration>) -> Result<RegistrySnapshot> {
    let scrollback_lines = config.terminal.scrollback_lines;
    let factory: TerminalFactory = Box::new(move |size| -> Box<dyn TerminalAdapter> {
        Box::new(PipeTerminal::new_with_scrollback(size, scrollback_lines))
    });

    let (mux, handle) = Multiplexer::new(factory, MuxOptions::from(&config));
    let mux_task = tokio::spawn(mux.run());

    for process in &config.processes {
        handle
            .register(ProcessSpec::from(process))
            .with_context(|| format!("Failed to register process '{}'", process.key))?;
    }

    let deadline = async {
        match exit_after {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            log::info!("Interrupted, stopping processes");
        }
        _ = deadline => {
            log::info!("--exit-after elapsed, stopping processes");
        }
        _ = watch_status(&handle, config.processes.len()) => {
            log::info!("All processes have stopped");
        }
    }

    // The loop may already be gone if it stopped on its own
    let _ = handle.shutdown();
    drop(handle);
    mux_task.await.context("Multiplexer task failed")
}

/// Print a line whenever a process starts or stops. Returns once every
/// expected process is registered and none is running.
async fn watch_status(handle: &MuxHandle, expected: usize) {
    let mut last: HashMap<String, (bool, u64)> = HashMap::new();
    let mut interval = tokio::time::interval(STATUS_INTERVAL);

    loop {
        interval.tick().await;
        let snapshot = handle.snapshot();

        for process in &snapshot.processes {
            let state = (process.alive, process.generation);
            if last.get(&process.key) != Some(&state) {
                println!("{}", process);
                last.insert(process.key.clone(), state);
            }
        }

        if snapshot.len() >= expected && snapshot.alive_count() == 0 {
            return;
        }
    }
}
