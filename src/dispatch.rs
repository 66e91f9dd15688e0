//! Runs a parsed [`Command`] against the console state.

use tracing::{info, warn};

use crate::command::{Command, ConsoleCommand, DeviceCommand, Outcome};
use crate::error::{Error, Result};
use crate::history::History;
use crate::registry::DeviceRegistry;
use crate::resource::ResourceAddress;

/// Everything a command may touch.
pub struct Context {
    pub registry: DeviceRegistry,
    pub history: History,
}

impl Context {
    pub fn new(registry: DeviceRegistry, history: History) -> Self {
        Self { registry, history }
    }
}

/// Execute one command.
///
/// Commands that talk to an instrument are rejected up front when nothing
/// is selected, before anything reaches the bus.
pub async fn execute(ctx: &mut Context, command: &Command) -> Result<Outcome> {
    if command.needs_device() && ctx.registry.selected().is_none() {
        return Err(Error::NoDeviceSelected);
    }
    match command {
        Command::Device(cmd) => device(ctx, cmd).await,
        Command::Console(cmd) => Ok(console(ctx, cmd)),
        Command::Scpi(cmd) => cmd.execute(ctx.registry.session()?).await,
        Command::Dmm(cmd) => cmd.plan().execute(ctx.registry.session()?).await,
        Command::Scope(cmd) => cmd.execute(ctx.registry.session()?).await,
        Command::Afg(cmd) => cmd.plan().execute(ctx.registry.session()?).await,
        Command::Psu(cmd) => cmd.plan().execute(ctx.registry.session()?).await,
        Command::Rf(cmd) => cmd.execute(ctx.registry.session()?).await,
        Command::Eload(cmd) => cmd.plan().execute(ctx.registry.session()?).await,
        Command::Diagnostic(cmd) => cmd.execute(ctx.registry.session()?).await,
    }
}

async fn device(ctx: &mut Context, command: &DeviceCommand) -> Result<Outcome> {
    match command {
        DeviceCommand::List => {
            let resources = ctx.registry.list().await?;
            if resources.is_empty() {
                return Ok(Outcome::Done("No VISA resources detected.".into()));
            }
            let mut lines = vec!["Available VISA Resources:".to_string()];
            lines.extend(resources.iter().map(|r| format!("  {r}")));
            Ok(Outcome::Lines(lines))
        }
        DeviceCommand::Select { resource } => {
            let address = ctx.registry.select(resource).await?.to_string();
            let mut lines = vec![format!("Successfully selected and connected to: {address}")];
            let session = ctx.registry.session()?;
            match session.query("*IDN?").await {
                Ok(idn) => {
                    info!("{address} identifies as {idn}");
                    lines.push(format!("Instrument IDN: {idn}"));
                }
                Err(e) => warn!("*IDN? on {address} failed: {e}"),
            }
            Ok(Outcome::Lines(lines))
        }
        DeviceCommand::Info { resource } => {
            let address: ResourceAddress = resource.parse()?;
            let mut lines = vec![format!("Device ID: {address}")];
            lines.extend(address.describe().into_iter().map(|(key, value)| format!("  {key}: {value}")));
            lines.push("To get manufacturer/model, use 'deviceselect' then 'id' (which queries *IDN?).".into());
            Ok(Outcome::Lines(lines))
        }
    }
}

fn console(ctx: &mut Context, command: &ConsoleCommand) -> Outcome {
    match command {
        ConsoleCommand::History { count } => Outcome::Lines(ctx.history.listing(*count)),
        ConsoleCommand::Exit => Outcome::Exit,
    }
}
