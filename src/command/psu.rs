use clap::Subcommand;

use super::Plan;
use super::args::{Numeric, Quantity};

/// Programmable DC power supply.
#[derive(Debug, Clone, Subcommand)]
pub enum PsuCommand {
    /// Set the output voltage in volts.
    #[command(name = "psu_set_voltage", after_help = "Example: psu_set_voltage 5.0")]
    SetVoltage {
        /// Volts
        #[arg(allow_hyphen_values = true)]
        voltage: Numeric,
    },

    /// Set the output current limit in amps.
    #[command(name = "psu_set_current", after_help = "Example: psu_set_current 0.5")]
    SetCurrent {
        /// Amps
        #[arg(allow_hyphen_values = true)]
        current: Numeric,
    },

    /// Enable the supply output.
    #[command(name = "psu_output_on", after_help = "Example: psu_output_on")]
    OutputOn,

    /// Disable the supply output.
    #[command(name = "psu_output_off", after_help = "Example: psu_output_off")]
    OutputOff,

    /// Set the over-voltage protection level in volts.
    #[command(name = "psu_set_ovp", after_help = "Example: psu_set_ovp 12.5")]
    SetOvp {
        /// Volts
        #[arg(allow_hyphen_values = true)]
        voltage: Numeric,
    },

    /// Set the over-current protection level in amps.
    #[command(name = "psu_set_ocp", after_help = "Example: psu_set_ocp 1.2")]
    SetOcp {
        /// Amps
        #[arg(allow_hyphen_values = true)]
        current: Numeric,
    },

    /// Set the over-temperature protection level in degrees Celsius.
    #[command(name = "psu_set_otp", after_help = "Example: psu_set_otp 85")]
    SetOtp {
        /// Degrees Celsius
        #[arg(allow_hyphen_values = true)]
        temperature: Numeric,
    },

    /// Read back the actual output voltage or current.
    #[command(name = "psu_measure_output", after_help = "Example: psu_measure_output VOLT")]
    MeasureOutput {
        /// VOLT or CURR
        quantity: Quantity,
    },

    /// Clear latched protection trips (*CLS).
    #[command(name = "psu_protection_clear", after_help = "Example: psu_protection_clear")]
    ProtectionClear,
}

impl PsuCommand {
    pub fn plan(&self) -> Plan {
        match self {
            PsuCommand::SetVoltage { voltage } => {
                Plan::write(format!(":VOLTage {voltage}"), format!("Voltage set to {voltage} V"))
            }
            PsuCommand::SetCurrent { current } => Plan::write(
                format!(":CURRent {current}"),
                format!("Current limit set to {current} A"),
            ),
            PsuCommand::OutputOn => Plan::write(":OUTPut ON", "Power supply output ON."),
            PsuCommand::OutputOff => Plan::write(":OUTPut OFF", "Power supply output OFF."),
            PsuCommand::SetOvp { voltage } => Plan::write(
                format!(":VOLTage:PROTection:LEVel {voltage}"),
                format!("OVP set to {voltage} V"),
            ),
            PsuCommand::SetOcp { current } => Plan::write(
                format!(":CURRent:PROTection:LEVel {current}"),
                format!("OCP set to {current} A"),
            ),
            PsuCommand::SetOtp { temperature } => Plan::write(
                format!(":SENSe:TEMPerature:PROTection:LEVel {temperature}"),
                format!("OTP level set to {temperature} °C."),
            ),
            PsuCommand::MeasureOutput { quantity } => Plan::measure(
                format!(":MEASure:{}?", quantity.as_scpi()),
                format!("Output {}", quantity.as_scpi()),
                quantity.unit(),
            ),
            PsuCommand::ProtectionClear => {
                Plan::write("*CLS", "PSU protection trip state cleared (*CLS sent).")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scpi;

    fn set_voltage(v: &str) -> Plan {
        PsuCommand::SetVoltage {
            voltage: v.parse().unwrap(),
        }
        .plan()
    }

    #[test]
    fn setpoints_and_protection() {
        assert_eq!(set_voltage("5.0").commands(), vec![":VOLTage 5"]);
        let ocp = PsuCommand::SetOcp {
            current: "1.2".parse().unwrap(),
        };
        assert_eq!(ocp.plan().commands(), vec![":CURRent:PROTection:LEVel 1.2"]);
        let otp = PsuCommand::SetOtp {
            temperature: "85".parse().unwrap(),
        };
        assert_eq!(otp.plan().commands(), vec![":SENSe:TEMPerature:PROTection:LEVel 85"]);
        assert_eq!(PsuCommand::ProtectionClear.plan().commands(), vec!["*CLS"]);
    }

    #[test]
    fn measure_output_picks_unit() {
        let plan = PsuCommand::MeasureOutput {
            quantity: Quantity::Curr,
        }
        .plan();
        assert_eq!(plan, Plan::measure(":MEASure:CURR?", "Output CURR", "A"));
    }

    #[test]
    fn numeric_arguments_round_trip_through_decoder() {
        for typed in ["5", "0.25", "-1.5", "12.125", "3e-3", "100mV", "MAX", "min", "DEFault"] {
            let plan = set_voltage(typed);
            let sent = plan.commands()[0];
            let decoded = scpi::decode_numeric_argument(sent).unwrap();
            let original: Numeric = typed.parse().unwrap();
            assert_eq!(decoded, original, "{sent}");
        }
    }
}
