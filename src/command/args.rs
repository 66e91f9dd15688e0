//! Argument types for console commands.
//!
//! Composite arguments keep the comma-separated form operators already type
//! (`1,0.5`, `SIN,1000,1.0`). Each type validates only what the SCPI syntax
//! needs: numbers must be numbers, mnemonics must be mnemonics, channel and
//! marker indices must be positive. Ranges are the instrument's business.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;

pub use crate::scpi::Numeric;

/// Split `s` into exactly `N` trimmed comma-separated fields.
fn fields<const N: usize>(s: &str, usage: &str) -> Result<[String; N], String> {
    let parts: Vec<String> = s.split(',').map(|p| p.trim().to_string()).collect();
    <[String; N]>::try_from(parts).map_err(|_| format!("invalid format, use {usage}"))
}

/// A 1-based channel, trace, window or marker index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index(u8);

impl Index {
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Index {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u8>() {
            Ok(n) if n >= 1 => Ok(Index(n)),
            _ => Err(format!("expected a positive index, got {s:?}")),
        }
    }
}

/// A SCPI mnemonic or keyword (`FREQ`, `CHAN1`, `MLOG`, `VOLT:DC`),
/// normalised to upper case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword(String);

impl Keyword {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Keyword {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_matches('"').trim();
        if s.is_empty() {
            return Err("expected a SCPI keyword".into());
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '.'))
        {
            return Err(format!("{s:?} is not a SCPI keyword"));
        }
        Ok(Keyword(s.to_ascii_uppercase()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    #[value(name = "ON", alias = "on", alias = "1")]
    On,
    #[value(name = "OFF", alias = "off", alias = "0")]
    Off,
}

impl Switch {
    pub fn as_str(self) -> &'static str {
        match self {
            Switch::On => "ON",
            Switch::Off => "OFF",
        }
    }
}

/// What a supply or load reads back from `:MEASure:<TYPE>?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Quantity {
    #[value(name = "VOLT", alias = "volt")]
    Volt,
    #[value(name = "CURR", alias = "curr")]
    Curr,
}

impl Quantity {
    pub fn as_scpi(self) -> &'static str {
        match self {
            Quantity::Volt => "VOLT",
            Quantity::Curr => "CURR",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Quantity::Volt => "V",
            Quantity::Curr => "A",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LoadMode {
    #[value(name = "CURR", alias = "curr")]
    Curr,
    #[value(name = "VOLT", alias = "volt")]
    Volt,
    #[value(name = "RES", alias = "res")]
    Res,
    #[value(name = "POW", alias = "pow")]
    Pow,
}

impl LoadMode {
    pub fn as_scpi(self) -> &'static str {
        match self {
            LoadMode::Curr => "CURR",
            LoadMode::Volt => "VOLT",
            LoadMode::Res => "RES",
            LoadMode::Pow => "POW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slope {
    Pos,
    Neg,
    Either,
}

impl Slope {
    pub fn as_scpi(self) -> &'static str {
        match self {
            Slope::Pos => "POS",
            Slope::Neg => "NEG",
            Slope::Either => "EITH",
        }
    }
}

impl FromStr for Slope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POS" => Ok(Slope::Pos),
            "NEG" => Ok(Slope::Neg),
            "EITH" => Ok(Slope::Either),
            _ => Err("invalid slope, use POS, NEG or EITH".into()),
        }
    }
}

/// `dmm_range_set` accepts a value or `AUTO`.
#[derive(Debug, Clone, PartialEq)]
pub enum Range {
    Auto,
    Value(Numeric),
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Range::Auto => f.write_str("AUTO"),
            Range::Value(v) => fmt::Display::fmt(v, f),
        }
    }
}

impl FromStr for Range {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("AUTO") {
            Ok(Range::Auto)
        } else {
            s.parse().map(Range::Value)
        }
    }
}

/// `<channel>,<number>`
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelValue {
    pub channel: Index,
    pub value: Numeric,
}

impl FromStr for ChannelValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [channel, value]: [String; 2] = fields(s, "<channel>,<value> (e.g. 1,0.5)")?;
        Ok(ChannelValue {
            channel: channel.parse()?,
            value: value.parse()?,
        })
    }
}

/// `<channel>,<PARAMETER>`
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelParameter {
    pub channel: Index,
    pub parameter: Keyword,
}

impl FromStr for ChannelParameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [channel, parameter]: [String; 2] = fields(s, "<channel>,<parameter> (e.g. 1,FREQ)")?;
        Ok(ChannelParameter {
            channel: channel.parse()?,
            parameter: parameter.parse()?,
        })
    }
}

/// `<channel>,<POS|NEG|EITH>`
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSlope {
    pub channel: Index,
    pub slope: Slope,
}

impl FromStr for ChannelSlope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [channel, slope]: [String; 2] = fields(s, "<channel>,<POS|NEG|EITH> (e.g. 1,POS)")?;
        Ok(ChannelSlope {
            channel: channel.parse()?,
            slope: slope.parse()?,
        })
    }
}

/// `<WAVE>,<frequency>,<amplitude>`
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub shape: Keyword,
    pub frequency: Numeric,
    pub amplitude: Numeric,
}

impl FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [shape, frequency, amplitude]: [String; 3] = fields(s, "WAVE,FREQ,AMPL (e.g. SIN,1000,1.0)")?;
        Ok(Waveform {
            shape: shape.parse()?,
            frequency: frequency.parse()?,
            amplitude: amplitude.parse()?,
        })
    }
}

/// `[<channel>,]<rate>`
#[derive(Debug, Clone, PartialEq)]
pub struct SlewRate {
    pub channel: Option<Index>,
    pub rate: Numeric,
}

impl FromStr for SlewRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(',') {
            let [channel, rate]: [String; 2] = fields(s, "[<channel>,]<rate> (e.g. 1,10.0)")?;
            Ok(SlewRate {
                channel: Some(channel.parse()?),
                rate: rate.parse()?,
            })
        } else {
            Ok(SlewRate {
                channel: None,
                rate: s.parse()?,
            })
        }
    }
}

/// `<rbw>,<vbw>`
#[derive(Debug, Clone, PartialEq)]
pub struct Bandwidths {
    pub resolution: Numeric,
    pub video: Numeric,
}

impl FromStr for Bandwidths {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [resolution, video]: [String; 2] = fields(s, "<rbw>,<vbw> (e.g. 10kHz,3kHz)")?;
        Ok(Bandwidths {
            resolution: resolution.parse()?,
            video: video.parse()?,
        })
    }
}

/// `<start>,<stop>,<points>`
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    pub start: Numeric,
    pub stop: Numeric,
    pub points: u32,
}

impl FromStr for Sweep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [start, stop, points]: [String; 3] = fields(s, "<start_freq>,<stop_freq>,<points> (e.g. 1GHz,2GHz,201)")?;
        Ok(Sweep {
            start: start.parse()?,
            stop: stop.parse()?,
            points: points
                .parse()
                .map_err(|_| format!("sweep points must be a whole number, got {points:?}"))?,
        })
    }
}

/// A scattering parameter name, `S11` through `S99`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SParameter(String);

impl fmt::Display for SParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SParameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_uppercase();
        let b = s.as_bytes();
        if b.len() == 3 && b[0] == b'S' && b[1].is_ascii_digit() && b[2].is_ascii_digit() {
            Ok(SParameter(s))
        } else {
            Err(format!("expected an S-parameter like S21, got {s:?}"))
        }
    }
}

/// `<Smn>,<FORMAT>`
#[derive(Debug, Clone, PartialEq)]
pub struct SParameterFormat {
    pub parameter: SParameter,
    pub format: Keyword,
}

impl FromStr for SParameterFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [parameter, format]: [String; 2] = fields(s, "<sparam>,<format> (e.g. S21,MLOG)")?;
        Ok(SParameterFormat {
            parameter: parameter.parse()?,
            format: format.parse()?,
        })
    }
}

/// `<trace>,<Smn>,<window>`
#[derive(Debug, Clone, PartialEq)]
pub struct TraceAssignment {
    pub trace: Index,
    pub parameter: SParameter,
    pub window: Index,
}

impl FromStr for TraceAssignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [trace, parameter, window]: [String; 3] = fields(s, "<trace_num>,<sparam>,<window_num> (e.g. 2,S21,1)")?;
        Ok(TraceAssignment {
            trace: trace.parse()?,
            parameter: parameter.parse()?,
            window: window.parse()?,
        })
    }
}

/// `<level_A>,<level_B>,<pulse_width>`
#[derive(Debug, Clone, PartialEq)]
pub struct Transient {
    pub level_a: Numeric,
    pub level_b: Numeric,
    pub width: Numeric,
}

impl FromStr for Transient {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [level_a, level_b, width]: [String; 3] = fields(s, "<level_A>,<level_B>,<pulse_width> (e.g. 0.5A,2.0A,10ms)")?;
        Ok(Transient {
            level_a: level_a.parse()?,
            level_b: level_b.parse()?,
            width: width.parse()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Jpg,
}

impl ImageFormat {
    pub fn as_scpi(self) -> &'static str {
        match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Jpg => "JPG",
        }
    }
}

/// Destination of a screen capture; the extension picks the image format.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub path: PathBuf,
    pub format: ImageFormat,
}

impl FromStr for ImageFile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match extension(s).as_deref() {
            Some("PNG") => ImageFormat::Png,
            Some("JPEG") => ImageFormat::Jpeg,
            Some("JPG") => ImageFormat::Jpg,
            _ => return Err("unsupported format for screen capture, use PNG or JPEG/JPG".into()),
        };
        Ok(ImageFile {
            path: PathBuf::from(s.trim()),
            format,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Txt,
}

/// Destination of a waveform capture; the extension picks CSV or text.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFile {
    pub path: PathBuf,
    pub format: DataFormat,
}

impl FromStr for DataFile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match extension(s).as_deref() {
            Some("CSV") => DataFormat::Csv,
            Some("TXT") => DataFormat::Txt,
            _ => return Err("unsupported format for data capture, use CSV or TXT".into()),
        };
        Ok(DataFile {
            path: PathBuf::from(s.trim()),
            format,
        })
    }
}

fn extension(s: &str) -> Option<String> {
    std::path::Path::new(s.trim())
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_value_pairs() {
        let cv: ChannelValue = "2, 0.5".parse().unwrap();
        assert_eq!(cv.channel.get(), 2);
        assert_eq!(cv.value.value(), Some(0.5));

        assert!("0,0.5".parse::<ChannelValue>().is_err());
        assert!("1".parse::<ChannelValue>().is_err());
        assert!("1,2,3".parse::<ChannelValue>().is_err());
        assert!("1,abc".parse::<ChannelValue>().is_err());
    }

    #[test]
    fn keywords_are_uppercased_and_checked() {
        assert_eq!("chan1".parse::<Keyword>().unwrap().as_str(), "CHAN1");
        assert_eq!("\"volt:dc\"".parse::<Keyword>().unwrap().as_str(), "VOLT:DC");
        assert!("volt dc".parse::<Keyword>().is_err());
        assert!("FREQ;*RST".parse::<Keyword>().is_err());
    }

    #[test]
    fn slope_and_range() {
        assert_eq!("eith".parse::<Slope>().unwrap(), Slope::Either);
        assert!("RISE".parse::<Slope>().is_err());
        assert_eq!("auto".parse::<Range>().unwrap(), Range::Auto);
        assert_eq!("10".parse::<Range>().unwrap().to_string(), "10");
        assert_eq!("min".parse::<Range>().unwrap().to_string(), "MIN");
    }

    #[test]
    fn slew_rate_channel_is_optional() {
        let plain: SlewRate = "10.0".parse().unwrap();
        assert_eq!(plain.channel, None);
        let with_channel: SlewRate = "2,10.0".parse().unwrap();
        assert_eq!(with_channel.channel.map(Index::get), Some(2));
    }

    #[test]
    fn composite_vna_arguments() {
        let sweep: Sweep = "1GHz,2GHz,201".parse().unwrap();
        assert_eq!(sweep.points, 201);
        assert_eq!(sweep.start.to_string(), "1GHz");
        assert!("1GHz,2GHz,many".parse::<Sweep>().is_err());

        let trace: TraceAssignment = "2,s21,1".parse().unwrap();
        assert_eq!(trace.parameter.to_string(), "S21");
        assert!("2,S2,1".parse::<TraceAssignment>().is_err());
    }

    #[test]
    fn file_formats_follow_extension() {
        assert_eq!("shot.PNG".parse::<ImageFile>().unwrap().format, ImageFormat::Png);
        assert_eq!("shot.jpg".parse::<ImageFile>().unwrap().format, ImageFormat::Jpg);
        assert!("shot.bmp".parse::<ImageFile>().is_err());
        assert_eq!("wave.txt".parse::<DataFile>().unwrap().format, DataFormat::Txt);
        assert!("wave".parse::<DataFile>().is_err());
    }
}
