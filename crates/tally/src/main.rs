//! tally - studio tally and silence detector monitor
//!
//! Subcommands:
//! - `tally run` - Sample the inputs and send notifications until stopped
//! - `tally config` - Show the effective configuration and where it came from
//! - `tally lines` - Show the monitored line table

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tallyconf::TallyConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tally::{
    build_sinks, telemetry, DebounceFilter, Dispatcher, InputSource, LineTable, Monitor,
    SharedInput, SysfsGpio,
};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Studio on-air, mic-live and silence detector monitor")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor the inputs until SIGINT or SIGTERM
    Run {
        /// Config file (replaces ./tally.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use in-memory inputs driven from stdin ("<line> <0|1>") instead of GPIO
        #[arg(long)]
        simulate: bool,
    },

    /// Print the effective configuration with secrets masked
    Config {
        /// Config file (replaces ./tally.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the monitored line table
    Lines {
        /// Config file (replaces ./tally.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, simulate } => run(config, simulate).await,
        Commands::Config { config } => show_config(config),
        Commands::Lines { config } => show_lines(config),
    }
}

async fn run(config_path: Option<PathBuf>, simulate: bool) -> Result<()> {
    let (config, sources) = TallyConfig::load_with_sources_from(config_path.as_deref())
        .context("Failed to load configuration")?;

    telemetry::init(&config.infra.telemetry);

    for path in &sources.files {
        info!(path = %path.display(), "loaded config file");
    }
    match &sources.env_file {
        Some(path) => info!(path = %path.display(), "loaded env file"),
        None => warn!("no .env file found, using process environment only"),
    }

    let disabled = config.validate().context("Invalid configuration")?;
    for sink in &disabled {
        warn!(sink = sink.sink, field = sink.field, "sink disabled, credential not set");
    }

    let table = LineTable::from_config(&config.lines).context("Invalid line table")?;

    let input: Box<dyn InputSource> = if simulate {
        let shared = SharedInput::new();
        // Audio present: the silence relay holds its input low.
        shared.set(&table.silence_relay().name, false);
        let driver = shared.clone();
        std::thread::spawn(move || drive_from_stdin(driver));
        info!("simulated inputs, reading \"<line> <0|1>\" from stdin");
        Box::new(shared)
    } else {
        let gpio = &config.infra.gpio;
        Box::new(
            SysfsGpio::open(&gpio.sysfs_root, gpio.pin_offset, &table)
                .context("Failed to open GPIO inputs")?,
        )
    };

    let sinks = build_sinks(&config.sinks).context("Failed to build notification sinks")?;
    let dispatcher = Dispatcher::new(sinks);
    info!(sinks = ?dispatcher.sink_names(), "notification sinks ready");

    let filter = DebounceFilter::new(config.infra.monitor.debounce());
    let mut monitor =
        Monitor::start(table, input, filter, dispatcher).context("Failed to read initial line state")?;
    monitor.announce_started();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        on_signal.cancel();
    });

    monitor
        .run(config.infra.monitor.poll_interval(), cancel)
        .await
        .context("Monitor stopped on input error")?;

    let stats = monitor.dispatcher().stats();
    info!(
        attempted = stats.attempted(),
        delivered = stats.delivered(),
        failed = stats.failed(),
        in_flight = monitor.dispatcher().in_flight(),
        "Shutdown complete"
    );
    Ok(())
}

fn show_config(config_path: Option<PathBuf>) -> Result<()> {
    let (config, sources) = TallyConfig::load_with_sources_from(config_path.as_deref())
        .context("Failed to load configuration")?;

    if sources.files.is_empty() {
        println!("# No config files found, using defaults");
    }
    for path in &sources.files {
        println!("# Loaded: {}", path.display());
    }
    if let Some(path) = &sources.env_file {
        println!("# Env file: {}", path.display());
    }
    for var in &sources.env_overrides {
        println!("# Env override: {}", var);
    }
    println!();
    print!("{}", config.to_toml());
    Ok(())
}

fn show_lines(config_path: Option<PathBuf>) -> Result<()> {
    let config = TallyConfig::load_from(config_path.as_deref())
        .context("Failed to load configuration")?;
    let table = LineTable::from_config(&config.lines).context("Invalid line table")?;

    println!("{:<4} {:<22} {:>4}  {:<14} {}", "ID", "NAME", "PIN", "ROLE", "STUDIO");
    for line in table.iter() {
        println!(
            "{:<4} {:<22} {:>4}  {:<14} {}",
            line.id.0,
            line.name,
            line.pin,
            line.role.as_str(),
            line.studio.map(|s| s.label()).unwrap_or("-"),
        );
    }
    Ok(())
}

/// Apply `<line> <0|1>` commands from stdin to the simulated inputs.
///
/// Blocking; runs on its own thread.
fn drive_from_stdin(input: SharedInput) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "stdin closed");
                break;
            }
        };

        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(name), Some("0")) => input.set(name, false),
            (Some(name), Some("1")) => input.set(name, true),
            (None, _) => {}
            _ => warn!(input = %line, "expected \"<line> <0|1>\""),
        }
    }
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = sigterm() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}
