use clap::Subcommand;

use super::args::{Bandwidths, ImageFile, Index, Numeric, SParameterFormat, Sweep, TraceAssignment};
use super::{Outcome, Plan};
use crate::capture;
use crate::error::{Error, Result};
use crate::scpi;
use crate::transport::Session;

const FDATA_QUERY: &str = ":CALCulate:SELected:DATA:FDATa?";
const FDATA_PREVIEW: usize = 10;

/// Spectrum and vector network analyzers.
#[derive(Debug, Clone, Subcommand)]
pub enum RfCommand {
    /// Set the center frequency (units such as MHz or GHz are passed through).
    #[command(name = "rf_set_center_freq", after_help = "Example: rf_set_center_freq 2.45GHz")]
    SetCenterFreq {
        /// Frequency
        #[arg(allow_hyphen_values = true)]
        frequency: Numeric,
    },

    /// Set the frequency span.
    #[command(name = "rf_set_span", after_help = "Example: rf_set_span 100MHz")]
    SetSpan {
        /// Frequency span
        #[arg(allow_hyphen_values = true)]
        span: Numeric,
    },

    /// Set the source power, or the reference level on a spectrum analyzer.
    #[command(name = "rf_set_power", after_help = "Example: rf_set_power -10dBm")]
    SetPower {
        /// Power level
        #[arg(allow_hyphen_values = true)]
        level: Numeric,
    },

    /// Set resolution and video bandwidth.
    #[command(name = "sa_set_rbw_vbw", after_help = "Example: sa_set_rbw_vbw 10kHz,3kHz")]
    SetRbwVbw {
        /// <rbw>,<vbw>
        #[arg(allow_hyphen_values = true)]
        bandwidths: Bandwidths,
    },

    /// Read the frequency and amplitude of a marker.
    #[command(name = "sa_read_marker", after_help = "Example: sa_read_marker 1")]
    ReadMarker {
        /// Marker number
        marker: Index,
    },

    /// Set sweep start, stop and number of points.
    #[command(name = "vna_set_sweep", after_help = "Example: vna_set_sweep 1GHz,2GHz,201")]
    SetSweep {
        /// <start_freq>,<stop_freq>,<points>
        #[arg(allow_hyphen_values = true)]
        sweep: Sweep,
    },

    /// Measure an S-parameter in the given display format (MLOG, PHAS, SWR, ...).
    #[command(name = "vna_measure_sparam", after_help = "Example: vna_measure_sparam S21,MLOG")]
    MeasureSparam {
        /// <sparam>,<format>
        measurement: SParameterFormat,
    },

    /// Assign an S-parameter to a trace in a display window.
    #[command(name = "vna_set_trace", after_help = "Example: vna_set_trace 2,S21,1")]
    SetTrace {
        /// <trace_num>,<sparam>,<window_num>
        assignment: TraceAssignment,
    },

    /// Read the formatted data of the selected trace.
    #[command(name = "vna_query_data", after_help = "Example: vna_query_data")]
    QueryData,

    /// Save a screenshot of an analyzer; the extension picks PNG or JPEG.
    #[command(name = "rf_screen_capture", after_help = "Example: rf_screen_capture sa_trace.png")]
    ScreenCapture {
        /// Output file (.png, .jpeg or .jpg)
        file: ImageFile,
    },
}

impl RfCommand {
    pub fn plan(&self) -> Option<Plan> {
        let plan = match self {
            RfCommand::SetCenterFreq { frequency } => Plan::write(
                format!(":SENSe:FREQuency:CENTer {frequency}"),
                format!("Center frequency set to: {frequency}"),
            ),
            RfCommand::SetSpan { span } => Plan::write(
                format!(":SENSe:FREQuency:SPAN {span}"),
                format!("Span set to: {span}"),
            ),
            RfCommand::SetPower { level } => Plan::write(
                format!(":SOURce:POWer:LEVel {level}"),
                format!("RF Power/Ref Level set to: {level}"),
            ),
            RfCommand::SetRbwVbw { bandwidths } => Plan::Write {
                commands: vec![
                    format!(":SENSe:BANDwidth:RESolution {}", bandwidths.resolution),
                    format!(":SENSe:BANDwidth:VIDeo {}", bandwidths.video),
                ],
                done: format!(
                    "RBW set to {}, VBW set to {}",
                    bandwidths.resolution, bandwidths.video
                ),
            },
            RfCommand::SetSweep { sweep } => Plan::Write {
                commands: vec![
                    format!(":SENSe:FREQuency:STARt {}", sweep.start),
                    format!(":SENSe:FREQuency:STOP {}", sweep.stop),
                    format!(":SENSe:SWEep:POINts {}", sweep.points),
                ],
                done: format!(
                    "VNA sweep set: {} to {}, {} points.",
                    sweep.start, sweep.stop, sweep.points
                ),
            },
            RfCommand::MeasureSparam { measurement } => {
                let SParameterFormat { parameter, format } = measurement;
                Plan::Write {
                    commands: vec![
                        format!(":CALCulate:PARameter:DEFine \"Trc1_{parameter}\",{parameter}"),
                        format!(":CALCulate:SELected:FORMat {format}"),
                    ],
                    done: format!("VNA Measurement set to {parameter} with format {format}."),
                }
            }
            RfCommand::SetTrace { assignment } => {
                let TraceAssignment {
                    trace,
                    parameter,
                    window,
                } = assignment;
                Plan::Write {
                    commands: vec![
                        format!(":CALCulate{window}:PARameter{trace}:DEFine \"{parameter}\""),
                        format!(":DISPlay:WINDow{window}:TRACe{trace}:FEED \"{parameter}\""),
                    ],
                    done: format!("Trace {trace} in Window {window} now displays {parameter}."),
                }
            }
            RfCommand::ReadMarker { .. } | RfCommand::QueryData | RfCommand::ScreenCapture { .. } => {
                return None;
            }
        };
        Some(plan)
    }

    pub async fn execute(&self, session: &mut dyn Session) -> Result<Outcome> {
        match self {
            RfCommand::ReadMarker { marker } => read_marker(session, *marker).await,
            RfCommand::QueryData => query_data(session).await,
            RfCommand::ScreenCapture { file } => capture::screen(session, file).await,
            other => match other.plan() {
                Some(plan) => plan.execute(session).await,
                None => Err(Error::InvalidArgument(format!("no instrument traffic for {other:?}"))),
            },
        }
    }
}

async fn read_marker(session: &mut dyn Session, marker: Index) -> Result<Outcome> {
    let x_query = format!(":CALCulate:MARKer{marker}:X?");
    let y_query = format!(":CALCulate:MARKer{marker}:Y?");
    let frequency = session.query(&x_query).await?;
    scpi::parse_f64(&x_query, &frequency)?;
    let amplitude = session.query(&y_query).await?;
    scpi::parse_f64(&y_query, &amplitude)?;
    Ok(Outcome::Text {
        label: format!("Marker {marker}"),
        text: format!("Frequency = {frequency} Hz, Amplitude = {amplitude} dBm"),
    })
}

async fn query_data(session: &mut dyn Session) -> Result<Outcome> {
    let reply = session.query(FDATA_QUERY).await?;
    let values = scpi::parse_f64_list(FDATA_QUERY, scpi::strip_block_header(&reply))?;
    let preview = &values[..values.len().min(FDATA_PREVIEW)];
    Ok(Outcome::Lines(vec![
        format!("VNA Trace Data Queried: {} values received.", values.len()),
        format!("First {FDATA_PREVIEW} values: {preview:?}..."),
    ]))
}
