use clap::Subcommand;

use super::args::{ChannelParameter, ChannelSlope, ChannelValue, DataFile, ImageFile, Keyword, Numeric};
use super::{Outcome, Plan};
use crate::capture;
use crate::error::{Error, Result};
use crate::transport::Session;

const SETUP_PREVIEW: usize = 200;

/// Oscilloscope.
#[derive(Debug, Clone, Subcommand)]
pub enum ScopeCommand {
    /// Set the horizontal scale in seconds per division.
    #[command(name = "oscope_set_timebase", after_help = "Example: oscope_set_timebase 0.001")]
    SetTimebase {
        /// Seconds per division
        #[arg(allow_hyphen_values = true)]
        seconds_per_div: Numeric,
    },

    /// Set the vertical scale of a channel in volts per division.
    #[command(name = "oscope_set_vertscale", after_help = "Example: oscope_set_vertscale 1,0.5")]
    SetVertscale {
        /// <channel>,<volts_per_div>
        #[arg(allow_hyphen_values = true)]
        scale: ChannelValue,
    },

    /// Read an automatic measurement (FREQ, PERiod, VPP, VMAX, ...) on a channel.
    #[command(name = "oscope_measure_param", after_help = "Example: oscope_measure_param 1,FREQ")]
    MeasureParam {
        /// <channel>,<parameter>
        measurement: ChannelParameter,
    },

    /// Set the trigger source (CHAN1, CHAN2, EXT, LINE, ...).
    #[command(
        name = "oscope_set_trigger_source",
        after_help = "Example: oscope_set_trigger_source CHAN1"
    )]
    SetTriggerSource {
        /// Trigger source mnemonic
        source: Keyword,
    },

    /// Set the trigger level in volts.
    ///
    /// The channel only documents which source the level is meant for; the
    /// level applies to the current trigger source.
    #[command(
        name = "oscope_set_trigger_level",
        after_help = "Example: oscope_set_trigger_level 1,0.5"
    )]
    SetTriggerLevel {
        /// <channel>,<volts>
        #[arg(allow_hyphen_values = true)]
        level: ChannelValue,
    },

    /// Set the edge trigger slope.
    #[command(
        name = "oscope_set_trigger_slope",
        after_help = "Example: oscope_set_trigger_slope 1,POS"
    )]
    SetTriggerSlope {
        /// <channel>,<POS|NEG|EITH>
        slope: ChannelSlope,
    },

    /// Show the beginning of the instrument setup string.
    #[command(name = "oscope_get_setup", after_help = "Example: oscope_get_setup")]
    GetSetup,

    /// Start continuous acquisition.
    #[command(name = "oscope_run", after_help = "Example: oscope_run")]
    Run,

    /// Save a screenshot; the file extension picks PNG or JPEG.
    #[command(
        name = "oscope_screen_capture",
        after_help = "Example: oscope_screen_capture scope_shot.png"
    )]
    ScreenCapture {
        /// Output file (.png, .jpeg or .jpg)
        file: ImageFile,
    },

    /// Save the current waveform in volts and seconds as CSV or text.
    ///
    /// The raw samples are scaled with the waveform preamble.
    #[command(
        name = "oscope_capture_data",
        after_help = "Example: oscope_capture_data sine_wave.csv"
    )]
    CaptureData {
        /// Output file (.csv or .txt)
        file: DataFile,
    },
}

impl ScopeCommand {
    pub fn plan(&self) -> Option<Plan> {
        let plan = match self {
            ScopeCommand::SetTimebase { seconds_per_div } => Plan::write(
                format!(":HORizontal:SCAle {seconds_per_div}"),
                format!("Oscilloscope timebase set to: {seconds_per_div} s/div"),
            ),
            ScopeCommand::SetVertscale { scale } => Plan::write(
                format!(":CHANnel{}:SCAle {}", scale.channel, scale.value),
                format!(
                    "Oscilloscope Channel {} scale set to: {} V/div",
                    scale.channel, scale.value
                ),
            ),
            ScopeCommand::MeasureParam { measurement } => Plan::query(
                format!(":MEASure:{}? CHANnel{}", measurement.parameter, measurement.channel),
                format!("Channel {} {}", measurement.channel, measurement.parameter),
            ),
            ScopeCommand::SetTriggerSource { source } => Plan::write(
                format!(":TRIGger:SOURce {source}"),
                format!("Oscilloscope trigger source set to: {source}"),
            ),
            ScopeCommand::SetTriggerLevel { level } => Plan::write(
                format!(":TRIGger:LEVel {}", level.value),
                format!(
                    "Oscilloscope trigger level set to: {} V (channel {} source)",
                    level.value, level.channel
                ),
            ),
            ScopeCommand::SetTriggerSlope { slope } => Plan::write(
                format!(":TRIGger:EDGE:SLOpe {}", slope.slope.as_scpi()),
                format!(
                    "Oscilloscope trigger slope set to: {} (channel {} source)",
                    slope.slope.as_scpi(),
                    slope.channel
                ),
            ),
            ScopeCommand::Run => Plan::write(":RUN", "Oscilloscope set to RUN mode."),
            ScopeCommand::GetSetup | ScopeCommand::ScreenCapture { .. } | ScopeCommand::CaptureData { .. } => {
                return None;
            }
        };
        Some(plan)
    }

    pub async fn execute(&self, session: &mut dyn Session) -> Result<Outcome> {
        match self {
            ScopeCommand::GetSetup => {
                let setup = session.query(":SETup?").await?;
                let preview: String = setup.chars().take(SETUP_PREVIEW).collect();
                Ok(Outcome::Text {
                    label: format!("Oscilloscope Setup String (truncated to {SETUP_PREVIEW} chars)"),
                    text: format!("{preview}..."),
                })
            }
            ScopeCommand::ScreenCapture { file } => capture::screen(session, file).await,
            ScopeCommand::CaptureData { file } => capture::waveform(session, file).await,
            other => match other.plan() {
                Some(plan) => plan.execute(session).await,
                None => Err(Error::InvalidArgument(format!("no instrument traffic for {other:?}"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, Line};
    use crate::transport::{MockTransport, Transport};

    fn scope(line: &str) -> ScopeCommand {
        match Line::parse_words(line.split_whitespace()).unwrap() {
            Command::Scope(cmd) => cmd,
            other => panic!("{line} parsed as {other:?}"),
        }
    }

    fn commands(line: &str) -> Vec<String> {
        scope(line)
            .plan()
            .unwrap()
            .commands()
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn formatted_strings() {
        assert_eq!(commands("oscope_set_timebase 0.001"), [":HORizontal:SCAle 0.001"]);
        assert_eq!(commands("oscope_set_vertscale 2,0.5"), [":CHANnel2:SCAle 0.5"]);
        assert_eq!(commands("oscope_measure_param 1,freq"), [":MEASure:FREQ? CHANnel1"]);
        assert_eq!(commands("oscope_set_trigger_source chan1"), [":TRIGger:SOURce CHAN1"]);
        assert_eq!(commands("oscope_set_trigger_level 1,-0.25"), [":TRIGger:LEVel -0.25"]);
        assert_eq!(commands("oscope_set_trigger_slope 1,eith"), [":TRIGger:EDGE:SLOpe EITH"]);
        assert_eq!(commands("oscope_run"), [":RUN"]);
    }

    #[test]
    fn captures_have_no_fixed_plan() {
        assert!(scope("oscope_screen_capture shot.png").plan().is_none());
        assert!(scope("oscope_capture_data wave.txt").plan().is_none());
        assert!(Line::parse_words(["oscope_screen_capture", "shot.bmp"]).is_err());
    }

    #[tokio::test]
    async fn setup_is_truncated() {
        let mut mock = MockTransport::new(Vec::<String>::new());
        mock.reply(":SETup?", &"A".repeat(500));
        let mut session = mock
            .open(&"TCPIP0::10.0.0.3::inst0::INSTR".parse().unwrap())
            .await
            .ok()
            .unwrap();
        let Outcome::Text { text, .. } = ScopeCommand::GetSetup.execute(session.as_mut()).await.unwrap() else {
            panic!("expected text");
        };
        assert_eq!(text.len(), 203);
        assert!(text.ends_with("A..."));
    }
}
