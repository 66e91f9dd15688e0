use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::{info, warn};

use instrument_console::config::Config;
use instrument_console::console::{Console, Input, Step};
use instrument_console::dispatch::Context;
use instrument_console::history::History;
use instrument_console::registry::DeviceRegistry;
use instrument_console::transport::VisaBus;

/// Console for VISA-addressed lab instruments: multimeters, oscilloscopes,
/// function generators, power supplies, RF analyzers and electronic loads.
///
/// With no COMMANDS an interactive prompt starts. Otherwise each COMMAND is
/// one console line, run in order; the first failure stops the run.
#[derive(Debug, Parser)]
#[command(version, about, long_about)]
struct Cli {
    /// Configuration file [default: <config dir>/instrument-console/config.toml]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Timeout for every bus operation, in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Resource reported by devicelist (repeatable; replaces the configured list)
    #[arg(long = "resource", value_name = "RESOURCE")]
    resources: Vec<String>,

    /// Only list configured resources that accept a connection
    #[arg(long)]
    probe: bool,

    /// Do not scan serial ports or the VISA library in devicelist
    #[arg(long)]
    no_scan: bool,

    /// Select this resource before running any command
    #[arg(long, value_name = "RESOURCE")]
    select: Option<String>,

    /// Log level written to stderr
    #[arg(long, default_value = "warn")]
    log_level: tracing::Level,

    /// Console lines to run instead of prompting, e.g. "read_voltage"
    #[arg(value_name = "COMMANDS")]
    commands: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .init();

    let mut config = Config::load_or_default(cli.config.as_deref()).context("loading configuration")?;
    if let Some(ms) = cli.timeout_ms {
        anyhow::ensure!(ms > 0, "--timeout-ms must be greater than zero");
        config.timeout_ms = ms;
    }
    if !cli.resources.is_empty() {
        config.discovery.resources = cli.resources.clone();
    }
    config.discovery.probe |= cli.probe;
    config.discovery.scan &= !cli.no_scan;
    info!("configuration: {config:?}");

    let history = open_history(&config, cli.commands.is_empty());
    let bus = VisaBus::from_config(&config);
    let ctx = Context::new(DeviceRegistry::new(Box::new(bus)), history);
    let mut console = Console::new(ctx, io::stdout());

    if let Some(resource) = &cli.select {
        if console.select_at_start(resource).await? == Step::Failed {
            return Ok(ExitCode::FAILURE);
        }
    }

    if cli.commands.is_empty() {
        let input = Input::stdin().context("starting console input")?;
        console
            .interactive(input, interrupted())
            .await
            .context("reading console input")?;
        return Ok(ExitCode::SUCCESS);
    }

    Ok(match console.run_batch(&cli.commands).await? {
        Step::Failed => ExitCode::FAILURE,
        Step::Continue | Step::Exit => ExitCode::SUCCESS,
    })
}

/// Completes on Ctrl+C. If the handler cannot be installed, never.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl+C handler unavailable: {e}");
        std::future::pending::<()>().await;
    }
}

/// Persistent history for interactive sessions; one-shot runs keep it in
/// memory only.
fn open_history(config: &Config, interactive: bool) -> History {
    if !interactive {
        return History::in_memory(config.history_limit);
    }
    let Some(path) = config.history_path() else {
        return History::in_memory(config.history_limit);
    };
    History::load(path, config.history_limit).unwrap_or_else(|e| {
        warn!("history unavailable: {e}");
        History::in_memory(config.history_limit)
    })
}
