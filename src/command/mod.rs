//! The closed set of console commands.
//!
//! Each instrument category is its own clap `Subcommand` enum; [`Command`]
//! flattens them into one namespace so a console line is parsed with a
//! single multicall parser. The doc comment on each variant is the help
//! text shown by `help <command>`.
//!
//! Most operations reduce to a [`Plan`]: a fixed list of writes, or one
//! query whose reply is reported. The plan is pure, which keeps the exact
//! instrument strings testable without a bus.

use std::fmt;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::error::Result;
use crate::scpi;
use crate::transport::Session;

pub mod args;
mod afg;
mod common;
mod device;
mod dmm;
mod eload;
mod psu;
mod rf;
mod scope;

pub use afg::AfgCommand;
pub use common::{DiagnosticCommand, ScpiCommand};
pub use device::{ConsoleCommand, DeviceCommand};
pub use dmm::DmmCommand;
pub use eload::EloadCommand;
pub use psu::PsuCommand;
pub use rf::RfCommand;
pub use scope::ScopeCommand;

/// One console line.
#[derive(Debug, Parser)]
#[command(
    multicall = true,
    disable_help_flag = true,
    subcommand_value_name = "COMMAND",
    subcommand_help_heading = "Commands"
)]
pub struct Line {
    #[command(subcommand)]
    pub command: Command,
}

impl Line {
    /// Parse already-tokenised words. Help requests come back as a
    /// `clap::Error` of kind `DisplayHelp`, ready to print.
    pub fn parse_words<I, T>(words: I) -> std::result::Result<Command, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Line::try_parse_from(words).map(|line| line.command)
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    #[command(flatten)]
    Device(DeviceCommand),
    #[command(flatten)]
    Scpi(ScpiCommand),
    #[command(flatten)]
    Dmm(DmmCommand),
    #[command(flatten)]
    Scope(ScopeCommand),
    #[command(flatten)]
    Afg(AfgCommand),
    #[command(flatten)]
    Psu(PsuCommand),
    #[command(flatten)]
    Rf(RfCommand),
    #[command(flatten)]
    Eload(EloadCommand),
    #[command(flatten)]
    Diagnostic(DiagnosticCommand),
    #[command(flatten)]
    Console(ConsoleCommand),
}

impl Command {
    /// Whether the command needs a selected device before it may run.
    pub fn needs_device(&self) -> bool {
        !matches!(self, Command::Device(_) | Command::Console(_))
    }
}

/// Fixed instrument traffic for one operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Send every command in order, then report `done`.
    Write { commands: Vec<String>, done: String },
    /// One query whose reply must be a number.
    Measure {
        query: String,
        label: String,
        unit: &'static str,
    },
    /// One query whose reply is reported verbatim.
    Query { query: String, label: String },
}

impl Plan {
    pub(crate) fn write(command: impl Into<String>, done: impl Into<String>) -> Self {
        Plan::Write {
            commands: vec![command.into()],
            done: done.into(),
        }
    }

    pub(crate) fn measure(query: impl Into<String>, label: impl Into<String>, unit: &'static str) -> Self {
        Plan::Measure {
            query: query.into(),
            label: label.into(),
            unit,
        }
    }

    pub(crate) fn query(query: impl Into<String>, label: impl Into<String>) -> Self {
        Plan::Query {
            query: query.into(),
            label: label.into(),
        }
    }

    /// Every command string the plan puts on the bus, in order.
    pub fn commands(&self) -> Vec<&str> {
        match self {
            Plan::Write { commands, .. } => commands.iter().map(String::as_str).collect(),
            Plan::Measure { query, .. } | Plan::Query { query, .. } => vec![query.as_str()],
        }
    }

    pub async fn execute(&self, session: &mut dyn Session) -> Result<Outcome> {
        match self {
            Plan::Write { commands, done } => {
                for command in commands {
                    session.write(command).await?;
                }
                Ok(Outcome::Done(done.clone()))
            }
            Plan::Measure { query, label, unit } => {
                let raw = session.query(query).await?;
                let value = scpi::parse_f64(query, &raw)?;
                debug!("{label} = {value}");
                Ok(Outcome::Reading {
                    label: label.clone(),
                    value,
                    raw,
                    unit: *unit,
                })
            }
            Plan::Query { query, label } => {
                let text = session.query(query).await?;
                Ok(Outcome::Text {
                    label: label.clone(),
                    text,
                })
            }
        }
    }
}

/// What a command produced, for the console to print.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A write (or a series of writes) was accepted.
    Done(String),
    /// A numeric reply. `raw` is the text as the instrument sent it.
    Reading {
        label: String,
        value: f64,
        raw: String,
        unit: &'static str,
    },
    Text { label: String, text: String },
    Lines(Vec<String>),
    Exit,
}

impl Outcome {
    /// The numeric value, for readings.
    pub fn value(&self) -> Option<f64> {
        match self {
            Outcome::Reading { value, .. } => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done(message) => f.write_str(message),
            Outcome::Reading { label, raw, unit, .. } if unit.is_empty() => write!(f, "{label}: {raw}"),
            Outcome::Reading { label, raw, unit, .. } => write!(f, "{label}: {raw} {unit}"),
            Outcome::Text { label, text } => write!(f, "{label}: {text}"),
            Outcome::Lines(lines) => f.write_str(&lines.join("\n")),
            Outcome::Exit => f.write_str("Exiting console. Goodbye!"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(line: &str) -> Command {
        Line::parse_words(line.split_whitespace()).unwrap()
    }

    #[test]
    fn every_category_parses() {
        for line in [
            "devicelist",
            "deviceselect GPIB0::2::INSTR",
            "id",
            "write *RST",
            "dmm_measure_dc_v",
            "read_voltage",
            "oscope_set_vertscale 1,0.5",
            "afg_set_wave SIN,1000,1.0",
            "psu_set_voltage 5.0",
            "vna_set_sweep 1GHz,2GHz,201",
            "eload_set_mode curr",
            "ping_device",
            "history",
            "exit",
        ] {
            let words: Vec<&str> = line.split_whitespace().collect();
            assert!(Line::parse_words(words).is_ok(), "{line}");
        }
    }

    #[test]
    fn unknown_command_and_bad_argument_are_parse_errors() {
        let err = Line::parse_words(["frobnicate"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);

        let err = Line::parse_words(["oscope_set_vertscale", "one,0.5"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let err = Line::parse_words(["psu_set_voltage"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn help_is_available_per_command() {
        let err = Line::parse_words(["help", "afg_set_wave"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        let text = err.render().to_string();
        assert!(text.contains("SIN,1000,1.0"), "{text}");
    }

    #[test]
    fn device_management_needs_no_device() {
        assert!(!parse("devicelist").needs_device());
        assert!(!parse("deviceinfo GPIB0::2::INSTR").needs_device());
        assert!(!parse("history").needs_device());
        assert!(parse("read_voltage").needs_device());
        assert!(parse("get_error").needs_device());
        assert!(parse("check_capabilities").needs_device());
    }

    #[test]
    fn reading_display_uses_raw_reply() {
        let outcome = Outcome::Reading {
            label: "DC Voltage".into(),
            value: 1.2345,
            raw: "+1.23450E+00".into(),
            unit: "V",
        };
        assert_eq!(outcome.to_string(), "DC Voltage: +1.23450E+00 V");
        assert_eq!(outcome.value(), Some(1.2345));
    }
}
