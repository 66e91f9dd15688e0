use clap::Subcommand;

use super::Plan;
use super::args::{SlewRate, Waveform};

/// Arbitrary function generator.
#[derive(Debug, Clone, Subcommand)]
pub enum AfgCommand {
    /// Set waveform shape, frequency (Hz) and amplitude (Vpp).
    #[command(name = "afg_set_wave", after_help = "Example: afg_set_wave SIN,1000,1.0")]
    SetWave {
        /// <WAVE>,<frequency>,<amplitude>; WAVE is SIN, SQU, RAMP, PULS, ...
        #[arg(allow_hyphen_values = true)]
        wave: Waveform,
    },

    /// Enable the generator output.
    #[command(name = "afg_output_on", after_help = "Example: afg_output_on")]
    OutputOn,

    /// Disable the generator output.
    #[command(name = "afg_output_off", after_help = "Example: afg_output_off")]
    OutputOff,

    /// Set the output voltage slew rate in V/s.
    ///
    /// Shared by generators and supplies that support it. A channel may be
    /// given for reference; the rate applies to the active output.
    #[command(name = "afg_psu_slew_set", after_help = "Example: afg_psu_slew_set 1,10.0")]
    SlewSet {
        /// [<channel>,]<rate>
        #[arg(allow_hyphen_values = true)]
        rate: SlewRate,
    },
}

impl AfgCommand {
    pub fn plan(&self) -> Plan {
        match self {
            AfgCommand::SetWave { wave } => Plan::Write {
                commands: vec![
                    format!(":FUNCtion {}", wave.shape),
                    format!(":FREQuency {}", wave.frequency),
                    format!(":VOLTage {}", wave.amplitude),
                ],
                done: format!(
                    "AFG set to {} wave, {} Hz, {} Vpp",
                    wave.shape, wave.frequency, wave.amplitude
                ),
            },
            AfgCommand::OutputOn => Plan::write(":OUTPut ON", "AFG output turned ON."),
            AfgCommand::OutputOff => Plan::write(":OUTPut OFF", "AFG output turned OFF."),
            AfgCommand::SlewSet { rate } => {
                let done = match rate.channel {
                    Some(channel) => format!("Slew rate set to {} V/s (channel {channel}).", rate.rate),
                    None => format!("Slew rate set to {} V/s.", rate.rate),
                };
                Plan::write(format!(":VOLTage:SLEW:RATE {}", rate.rate), done)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waveform_is_three_writes_in_order() {
        let plan = AfgCommand::SetWave {
            wave: "sin, 1000, 1.0".parse().unwrap(),
        }
        .plan();
        assert_eq!(plan.commands(), vec![":FUNCtion SIN", ":FREQuency 1000", ":VOLTage 1"]);
    }

    #[test]
    fn slew_rate_ignores_channel_in_command() {
        let with_channel = AfgCommand::SlewSet {
            rate: "2,10.5".parse().unwrap(),
        }
        .plan();
        let without = AfgCommand::SlewSet {
            rate: "10.5".parse().unwrap(),
        }
        .plan();
        assert_eq!(with_channel.commands(), without.commands());
        assert_eq!(without.commands(), vec![":VOLTage:SLEW:RATE 10.5"]);
    }

    #[test]
    fn output_switches() {
        assert_eq!(AfgCommand::OutputOn.plan().commands(), vec![":OUTPut ON"]);
        assert_eq!(AfgCommand::OutputOff.plan().commands(), vec![":OUTPut OFF"]);
    }
}
