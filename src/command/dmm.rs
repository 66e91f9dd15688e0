use clap::Subcommand;

use super::Plan;
use super::args::{Keyword, Numeric, Range, Switch};

/// Digital multimeter.
#[derive(Debug, Clone, Subcommand)]
pub enum DmmCommand {
    /// Set the measurement function.
    ///
    /// Common functions: VOLT:DC, VOLT:AC, CURR:DC, CURR:AC, RES, FRES, FREQ.
    #[command(name = "dmm_func_set", after_help = "Example: dmm_func_set VOLT:DC")]
    FuncSet {
        /// SCPI function name
        function: Keyword,
    },

    /// Set the measurement range for the active function.
    #[command(name = "dmm_range_set", after_help = "Example: dmm_range_set 10")]
    RangeSet {
        /// Range value, or AUTO
        #[arg(allow_hyphen_values = true)]
        range: Range,
    },

    /// Turn auto-ranging on or off for the active function.
    #[command(name = "dmm_autoranging", after_help = "Example: dmm_autoranging ON")]
    Autoranging {
        /// ON/OFF (1/0)
        state: Switch,
    },

    /// Set the trigger-to-measurement delay in seconds.
    #[command(name = "dmm_delay_set", after_help = "Example: dmm_delay_set 0.1")]
    DelaySet {
        /// Delay in seconds
        #[arg(allow_hyphen_values = true)]
        seconds: Numeric,
    },

    /// Set the measurement resolution.
    #[command(name = "dmm_resolution_set", after_help = "Example: dmm_resolution_set 0.0001")]
    ResolutionSet {
        /// Resolution, in units of the active function
        #[arg(allow_hyphen_values = true)]
        resolution: Numeric,
    },

    /// Measure DC voltage.
    #[command(
        name = "dmm_measure_dc_v",
        visible_alias = "read_voltage",
        after_help = "Example: dmm_measure_dc_v"
    )]
    MeasureDcVoltage,

    /// Measure AC voltage (RMS).
    #[command(name = "dmm_measure_ac_v", after_help = "Example: dmm_measure_ac_v")]
    MeasureAcVoltage,

    /// Measure DC current.
    #[command(
        name = "dmm_measure_dc_i",
        visible_alias = "read_current",
        after_help = "Example: dmm_measure_dc_i"
    )]
    MeasureDcCurrent,

    /// Measure AC current (RMS).
    #[command(name = "dmm_measure_ac_i", after_help = "Example: dmm_measure_ac_i")]
    MeasureAcCurrent,

    /// Measure continuity; low resistance means a closed circuit.
    #[command(name = "dmm_measure_continuity", after_help = "Example: dmm_measure_continuity")]
    MeasureContinuity,

    /// Measure diode forward voltage.
    #[command(name = "dmm_measure_diode", after_help = "Example: dmm_measure_diode")]
    MeasureDiode,

    /// Measure 2-wire resistance.
    #[command(
        name = "dmm_measure2_resistance",
        visible_alias = "read_resistance",
        after_help = "Example: dmm_measure2_resistance"
    )]
    Measure2Resistance,

    /// Measure 4-wire resistance (Kelvin), for low-value precision work.
    #[command(name = "dmm_measure4_resistance", after_help = "Example: dmm_measure4_resistance")]
    Measure4Resistance,
}

impl DmmCommand {
    pub fn plan(&self) -> Plan {
        match self {
            DmmCommand::FuncSet { function } => Plan::write(
                format!(":SENSe:FUNCtion \"{function}\""),
                format!("DMM function set to: {function}"),
            ),
            DmmCommand::RangeSet { range } => {
                Plan::write(format!(":SENSe:RANGe {range}"), format!("DMM range set to: {range}"))
            }
            DmmCommand::Autoranging { state } => Plan::write(
                format!(":SENSe:RANGe:AUTO {}", state.as_str()),
                format!("DMM auto-ranging set to: {}", state.as_str()),
            ),
            DmmCommand::DelaySet { seconds } => Plan::write(
                format!(":SENSe:DELay {seconds}"),
                format!("DMM measurement delay set to: {seconds} s"),
            ),
            DmmCommand::ResolutionSet { resolution } => Plan::write(
                format!(":SENSe:RESolution {resolution}"),
                format!("DMM resolution set to: {resolution}"),
            ),
            DmmCommand::MeasureDcVoltage => Plan::measure(":MEASure:VOLTage:DC?", "DC Voltage", "V"),
            DmmCommand::MeasureAcVoltage => Plan::measure(":MEASure:VOLTage:AC?", "AC Voltage (RMS)", "V"),
            DmmCommand::MeasureDcCurrent => Plan::measure(":MEASure:CURRent:DC?", "DC Current", "A"),
            DmmCommand::MeasureAcCurrent => Plan::measure(":MEASure:CURRent:AC?", "AC Current (RMS)", "A"),
            DmmCommand::MeasureContinuity => {
                Plan::measure(":MEASure:CONTinuity?", "Continuity Resistance", "Ohm")
            }
            DmmCommand::MeasureDiode => Plan::measure(":MEASure:DIODe?", "Diode Forward Voltage", "V"),
            DmmCommand::Measure2Resistance => Plan::measure(":MEASure:RESistance?", "Resistance", "Ohm"),
            DmmCommand::Measure4Resistance => {
                Plan::measure(":MEASure:FRESistance?", "4-Wire Resistance", "Ohm")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, Line};

    fn commands(line: &str) -> Vec<String> {
        let command = Line::parse_words(line.split_whitespace()).unwrap();
        let Command::Dmm(dmm) = command else {
            panic!("{line} is not a DMM command");
        };
        dmm.plan().commands().into_iter().map(String::from).collect()
    }

    #[test]
    fn configuration_strings() {
        assert_eq!(commands("dmm_func_set volt:dc"), [":SENSe:FUNCtion \"VOLT:DC\""]);
        assert_eq!(commands("dmm_range_set auto"), [":SENSe:RANGe AUTO"]);
        assert_eq!(commands("dmm_range_set 10"), [":SENSe:RANGe 10"]);
        assert_eq!(commands("dmm_autoranging 0"), [":SENSe:RANGe:AUTO OFF"]);
        assert_eq!(commands("dmm_delay_set 0.1"), [":SENSe:DELay 0.1"]);
        assert_eq!(commands("dmm_resolution_set 1e-4"), [":SENSe:RESolution 0.0001"]);
    }

    #[test]
    fn aliases_measure_the_same_thing() {
        assert_eq!(commands("read_voltage"), commands("dmm_measure_dc_v"));
        assert_eq!(commands("read_current"), [":MEASure:CURRent:DC?"]);
        assert_eq!(commands("read_resistance"), [":MEASure:RESistance?"]);
        assert_eq!(commands("dmm_measure4_resistance"), [":MEASure:FRESistance?"]);
        assert_eq!(commands("dmm_measure_continuity"), [":MEASure:CONTinuity?"]);
    }

    #[test]
    fn measurements_carry_units() {
        match DmmCommand::MeasureAcCurrent.plan() {
            Plan::Measure { unit, label, .. } => {
                assert_eq!(unit, "A");
                assert_eq!(label, "AC Current (RMS)");
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }
}
