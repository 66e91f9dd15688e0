use clap::Subcommand;
use tracing::{debug, warn};

use super::{Outcome, Plan};
use crate::error::{Error, Result};
use crate::scpi;
use crate::transport::Session;

const CAPABILITY_PROBES: [&str; 7] = [
    ":MEASure:VOLTage:DC?",
    ":MEASure:VOLTage:AC?",
    ":MEASure:CURRent:DC?",
    ":MEASure:RESistance?",
    ":WAVeform:DATA?",
    ":TRIGger:SOURce?",
    ":OUTPut:STATe?",
];

/// IEEE 488.2 common commands and raw SCPI access.
#[derive(Debug, Clone, Subcommand)]
pub enum ScpiCommand {
    /// Query the instrument identification string (*IDN?).
    #[command(name = "id", after_help = "Example: id")]
    Id,

    /// Send a raw SCPI command, without reading a reply.
    #[command(name = "write", after_help = "Example: write \":SOURce:VOLTage 5.0\"")]
    Write {
        /// SCPI command; several words are joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Send a raw SCPI query and print the reply.
    #[command(name = "query", after_help = "Example: query \":MEASure:VOLTage?\"")]
    Query {
        /// SCPI query; several words are joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Reset the instrument to its default state (*RST).
    #[command(name = "reset", after_help = "Example: reset")]
    Reset,

    /// Block until pending operations complete (*OPC?).
    #[command(name = "wait_opc", after_help = "Example: wait_opc")]
    WaitOpc,

    /// Pop the oldest entry from the instrument error queue.
    #[command(name = "get_error", after_help = "Example: get_error")]
    GetError,
}

impl ScpiCommand {
    pub fn plan(&self) -> Option<Plan> {
        let plan = match self {
            ScpiCommand::Id => Plan::query("*IDN?", "Instrument IDN"),
            ScpiCommand::Write { command } => {
                let command = command.join(" ");
                let done = format!("Sent: {command}");
                Plan::write(command, done)
            }
            ScpiCommand::Query { command } => Plan::query(command.join(" "), "Response"),
            ScpiCommand::Reset => Plan::write("*RST", "Instrument reset command (*RST) sent."),
            ScpiCommand::GetError => Plan::query(":SYSTem:ERRor?", "Instrument Error"),
            ScpiCommand::WaitOpc => return None,
        };
        Some(plan)
    }

    pub async fn execute(&self, session: &mut dyn Session) -> Result<Outcome> {
        if let Some(plan) = self.plan() {
            return plan.execute(session).await;
        }
        // wait_opc: the reply only matters as proof the queue drained.
        let reply = session.query("*OPC?").await?;
        debug!("*OPC? returned {reply}");
        Ok(Outcome::Done("Operation Complete (*OPC?) verified.".into()))
    }
}

/// Connection checks.
#[derive(Debug, Clone, Subcommand)]
pub enum DiagnosticCommand {
    /// Check that the instrument answers (*OPC? should return 1).
    #[command(name = "ping_device", after_help = "Example: ping_device")]
    PingDevice,

    /// Query identification and options, then probe common SCPI queries.
    ///
    /// Probe failures are expected on instruments that lack a subsystem and
    /// are not reported as errors.
    #[command(name = "check_capabilities", after_help = "Example: check_capabilities")]
    CheckCapabilities,
}

impl DiagnosticCommand {
    pub async fn execute(&self, session: &mut dyn Session) -> Result<Outcome> {
        match self {
            DiagnosticCommand::PingDevice => ping(session).await,
            DiagnosticCommand::CheckCapabilities => check_capabilities(session).await,
        }
    }
}

async fn ping(session: &mut dyn Session) -> Result<Outcome> {
    let reply = session.query("*OPC?").await?;
    if scpi::parse_on_off(&reply) {
        Ok(Outcome::Done("Instrument communication OK.".into()))
    } else {
        Ok(Outcome::Text {
            label: "Unexpected response".into(),
            text: reply,
        })
    }
}

async fn check_capabilities(session: &mut dyn Session) -> Result<Outcome> {
    let mut lines = vec!["Checking instrument capabilities...".to_string(), String::new()];

    match session.query("*IDN?").await {
        Ok(idn) => lines.push(format!("IDN: {idn}")),
        Err(e) => {
            stop_if_gone(&e)?;
            debug!("*IDN? probe failed: {e}");
            lines.push("IDN query not supported or failed.".into());
        }
    }
    match session.query("*OPT?").await {
        Ok(options) => lines.push(format!("Options: {options}")),
        Err(e) => {
            stop_if_gone(&e)?;
            debug!("*OPT? probe failed: {e}");
            lines.push("Options query not supported.".into());
        }
    }

    let mut supported = Vec::new();
    for probe in CAPABILITY_PROBES {
        match session.query(probe).await {
            Ok(_) => supported.push(probe),
            Err(e) => {
                stop_if_gone(&e)?;
                debug!("{probe} probe failed: {e}");
            }
        }
    }

    lines.push(String::new());
    if supported.is_empty() {
        lines.push("Could not auto-detect SCPI feature set from probes.".into());
    } else {
        lines.push("Likely supported SCPI commands (best-effort probe):".into());
        lines.extend(supported.iter().map(|c| format!("  {c}")));
    }
    Ok(Outcome::Lines(lines))
}

/// A probe may fail, but a dropped connection ends the check.
fn stop_if_gone(e: &Error) -> Result<()> {
    if let Error::Disconnected { resource } = e {
        warn!("{resource} went away during capability probing");
        return Err(Error::Disconnected {
            resource: resource.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, Transport};

    async fn session(mock: &MockTransport) -> Box<dyn Session> {
        let mut transport = mock.clone();
        transport
            .open(&"TCPIP0::10.0.0.5::inst0::INSTR".parse().unwrap())
            .await
            .ok()
            .unwrap()
    }

    #[test]
    fn raw_commands_are_joined() {
        let write = ScpiCommand::Write {
            command: vec![":SOURce:VOLTage".into(), "5.0".into()],
        };
        assert_eq!(write.plan().unwrap().commands(), vec![":SOURce:VOLTage 5.0"]);
        assert_eq!(ScpiCommand::GetError.plan().unwrap().commands(), vec![":SYSTem:ERRor?"]);
        assert!(ScpiCommand::WaitOpc.plan().is_none());
    }

    #[tokio::test]
    async fn wait_opc_and_query() {
        let mock = MockTransport::new(Vec::<String>::new());
        mock.reply("*OPC?", "1").reply(":SYSTem:ERRor?", "0,\"No error\"");
        let mut s = session(&mock).await;

        let done = ScpiCommand::WaitOpc.execute(s.as_mut()).await.unwrap();
        assert_eq!(done.to_string(), "Operation Complete (*OPC?) verified.");

        let err = ScpiCommand::GetError.execute(s.as_mut()).await.unwrap();
        assert_eq!(err.to_string(), "Instrument Error: 0,\"No error\"");
    }

    #[tokio::test]
    async fn ping_reports_unexpected_reply() {
        let mock = MockTransport::new(Vec::<String>::new());
        mock.reply("*OPC?", "TRUE");
        let mut s = session(&mock).await;
        let ok = DiagnosticCommand::PingDevice.execute(s.as_mut()).await.unwrap();
        assert_eq!(ok.to_string(), "Instrument communication OK.");

        mock.reply("*OPC?", "0");
        let odd = DiagnosticCommand::PingDevice.execute(s.as_mut()).await.unwrap();
        assert_eq!(odd.to_string(), "Unexpected response: 0");
    }

    #[tokio::test]
    async fn capability_probe_failures_are_swallowed() {
        let mock = MockTransport::new(Vec::<String>::new());
        mock.reply("*IDN?", "ACME,DMM-1,42,1.0")
            .reply(":MEASure:VOLTage:DC?", "+1.0E+00")
            .reply(":OUTPut:STATe?", "0");
        let mut s = session(&mock).await;

        let Outcome::Lines(lines) = DiagnosticCommand::CheckCapabilities
            .execute(s.as_mut())
            .await
            .unwrap()
        else {
            panic!("expected lines");
        };
        assert!(lines.contains(&"IDN: ACME,DMM-1,42,1.0".to_string()));
        assert!(lines.contains(&"Options query not supported.".to_string()));
        let probed: Vec<&String> = lines.iter().filter(|l| l.starts_with("  ")).collect();
        assert_eq!(probed, vec!["  :MEASure:VOLTage:DC?", "  :OUTPut:STATe?"]);
    }
}
