use clap::Subcommand;

use super::Plan;
use super::args::{LoadMode, Numeric, Quantity, Transient};

/// Programmable electronic load.
#[derive(Debug, Clone, Subcommand)]
pub enum EloadCommand {
    /// Set the operating mode: constant current, voltage, resistance or power.
    #[command(name = "eload_set_mode", after_help = "Example: eload_set_mode CURR")]
    SetMode {
        /// CURR, VOLT, RES or POW
        mode: LoadMode,
    },

    /// Set the constant-current level in amps.
    #[command(name = "eload_set_current", after_help = "Example: eload_set_current 1.5")]
    SetCurrent {
        /// Amps
        #[arg(allow_hyphen_values = true)]
        current: Numeric,
    },

    /// Set the constant-voltage level in volts.
    #[command(name = "eload_set_voltage", after_help = "Example: eload_set_voltage 12.0")]
    SetVoltage {
        /// Volts
        #[arg(allow_hyphen_values = true)]
        voltage: Numeric,
    },

    /// Set the constant-resistance level in ohms.
    #[command(name = "eload_set_resistance", after_help = "Example: eload_set_resistance 10.0")]
    SetResistance {
        /// Ohms
        #[arg(allow_hyphen_values = true)]
        resistance: Numeric,
    },

    /// Set the constant-power level in watts.
    #[command(name = "eload_set_power", after_help = "Example: eload_set_power 50.0")]
    SetPower {
        /// Watts
        #[arg(allow_hyphen_values = true)]
        power: Numeric,
    },

    /// Start sinking current.
    #[command(name = "eload_input_on", after_help = "Example: eload_input_on")]
    InputOn,

    /// Stop sinking current.
    #[command(name = "eload_input_off", after_help = "Example: eload_input_off")]
    InputOff,

    /// Read the voltage or current at the load input.
    #[command(name = "eload_measure_input", after_help = "Example: eload_measure_input CURR")]
    MeasureInput {
        /// VOLT or CURR
        quantity: Quantity,
    },

    /// Set the current slew rate in A/s.
    #[command(name = "eload_set_slew", after_help = "Example: eload_set_slew 0.1")]
    SetSlew {
        /// Amps per second
        #[arg(allow_hyphen_values = true)]
        rate: Numeric,
    },

    /// Configure a constant-current transient between two levels.
    #[command(
        name = "eload_set_transient",
        after_help = "Example: eload_set_transient 0.5A,2.0A,10ms"
    )]
    SetTransient {
        /// <level_A>,<level_B>,<pulse_width>
        #[arg(allow_hyphen_values = true)]
        transient: Transient,
    },

    /// Set the over-voltage limit in volts.
    #[command(name = "eload_set_ovl", after_help = "Example: eload_set_ovl 60.0")]
    SetOvl {
        /// Volts
        #[arg(allow_hyphen_values = true)]
        voltage: Numeric,
    },

    /// Set the over-power limit in watts.
    #[command(name = "eload_set_opl", after_help = "Example: eload_set_opl 150.0")]
    SetOpl {
        /// Watts
        #[arg(allow_hyphen_values = true)]
        power: Numeric,
    },
}

impl EloadCommand {
    pub fn plan(&self) -> Plan {
        match self {
            EloadCommand::SetMode { mode } => Plan::write(
                format!(":FUNCtion:MODE {}", mode.as_scpi()),
                format!("Electronic Load mode set to: {}", mode.as_scpi()),
            ),
            EloadCommand::SetCurrent { current } => {
                Plan::write(format!(":CURRent {current}"), format!("CC current set to {current} A."))
            }
            EloadCommand::SetVoltage { voltage } => {
                Plan::write(format!(":VOLTage {voltage}"), format!("CV voltage set to {voltage} V."))
            }
            EloadCommand::SetResistance { resistance } => Plan::write(
                format!(":RESistance {resistance}"),
                format!("CR resistance set to {resistance} Ohm."),
            ),
            EloadCommand::SetPower { power } => {
                Plan::write(format!(":POWer {power}"), format!("CP power set to {power} W."))
            }
            EloadCommand::InputOn => Plan::write(":INPut ON", "Electronic Load Input ON (Load active)."),
            EloadCommand::InputOff => {
                Plan::write(":INPut OFF", "Electronic Load Input OFF (Load inactive).")
            }
            EloadCommand::MeasureInput { quantity } => Plan::measure(
                format!(":MEASure:{}?", quantity.as_scpi()),
                format!("ELoad Input {}", quantity.as_scpi()),
                quantity.unit(),
            ),
            EloadCommand::SetSlew { rate } => Plan::write(
                format!(":CURRent:SLEW:RATE {rate}"),
                format!("CC Slew Rate set to {rate} A/s."),
            ),
            EloadCommand::SetTransient { transient } => Plan::Write {
                commands: vec![
                    format!(":CURRent:STATic {}", transient.level_a),
                    format!(":CURRent:TRANsient:LEVel {}", transient.level_b),
                    format!(":CURRent:TRANsient:PULSe:WIDTh {}", transient.width),
                    ":FUNCtion:MODE TRANsient".to_string(),
                ],
                done: format!(
                    "ELoad set for transient test: A={}, B={}, Width={}.",
                    transient.level_a, transient.level_b, transient.width
                ),
            },
            EloadCommand::SetOvl { voltage } => Plan::write(
                format!(":VOLTage:PROTection:LEVel {voltage}"),
                format!("OVL set to {voltage} V"),
            ),
            EloadCommand::SetOpl { power } => Plan::write(
                format!(":POWer:PROTection:LEVel {power}"),
                format!("OPL set to {power} W"),
            ),
        }
    }
}
