//! Screen and waveform captures written to local files.

use std::path::Path;

use tracing::{debug, info};

use crate::command::Outcome;
use crate::command::args::{DataFile, DataFormat, ImageFile};
use crate::error::{Error, Result};
use crate::scpi;
use crate::transport::Session;

const PREAMBLE_QUERY: &str = ":WAVeform:PREamble?";
const DATA_QUERY: &str = ":WAVeform:DATA?";

/// Scale factors from `:WAVeform:PREamble?`.
///
/// Only the fields needed for conversion are kept: x increment (field 5),
/// y increment (field 7) and y reference (field 8).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preamble {
    pub x_increment: f64,
    pub y_increment: f64,
    pub y_reference: f64,
}

impl Preamble {
    pub fn parse(reply: &str) -> Result<Self> {
        let fields = scpi::parse_f64_list(PREAMBLE_QUERY, reply)?;
        if fields.len() < 9 {
            return Err(Error::malformed(
                PREAMBLE_QUERY,
                format!("expected at least 9 preamble fields, got {}", fields.len()),
            ));
        }
        Ok(Preamble {
            x_increment: fields[5],
            y_increment: fields[7],
            y_reference: fields[8],
        })
    }

    /// Convert raw samples to `(seconds, volts)` pairs.
    pub fn scale(&self, raw: &[f64]) -> Vec<(f64, f64)> {
        raw.iter()
            .enumerate()
            .map(|(i, sample)| {
                let t = i as f64 * self.x_increment;
                let v = self.y_increment * (sample - self.y_reference);
                (t, v)
            })
            .collect()
    }
}

/// Fetch the display image and store it in `file`.
pub async fn screen(session: &mut dyn Session, file: &ImageFile) -> Result<Outcome> {
    let query = format!(":DISPlay:DATA? {}", file.format.as_scpi());
    let image = session.query_block(&query).await?;
    if image.is_empty() {
        return Err(Error::malformed(query, "received no image data from the instrument"));
    }
    write_file(&file.path, &image).await?;
    info!("saved {} byte screen capture to {}", image.len(), file.path.display());
    Ok(Outcome::Done(format!(
        "Screen capture successfully saved to: {}",
        file.path.display()
    )))
}

/// Fetch the current waveform, scale it and store it in `file`.
pub async fn waveform(session: &mut dyn Session, file: &DataFile) -> Result<Outcome> {
    let preamble = Preamble::parse(&session.query(PREAMBLE_QUERY).await?)?;
    debug!("waveform preamble {preamble:?}");

    session.write(":WAVeform:FORMat ASCii").await?;
    let reply = session.query(DATA_QUERY).await?;
    let raw = scpi::parse_f64_list(DATA_QUERY, scpi::strip_block_header(&reply))?;
    if raw.is_empty() {
        return Err(Error::malformed(DATA_QUERY, "no waveform samples in reply"));
    }

    let points = preamble.scale(&raw);
    let contents = match file.format {
        DataFormat::Csv => to_csv(&points)?,
        DataFormat::Txt => to_text(&points).into_bytes(),
    };
    write_file(&file.path, &contents).await?;
    Ok(Outcome::Done(format!(
        "Waveform data successfully processed and saved to: {} ({} points).",
        file.path.display(),
        points.len()
    )))
}

fn to_csv(points: &[(f64, f64)]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Time (s)", "Voltage (V)"])?;
    for point in points {
        writer.serialize(point)?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Csv(csv::Error::from(e.into_error())))
}

fn to_text(points: &[(f64, f64)]) -> String {
    let mut out = String::from("Time (s)\tVoltage (V)\n");
    for (t, v) in points {
        out.push_str(&format!("{t:.6e}\t{v:.6e}\n"));
    }
    out
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| Error::file(path, e))
}
