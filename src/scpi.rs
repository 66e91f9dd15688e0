//! SCPI text helpers: reply decoding, numeric arguments and IEEE 488.2
//! definite-length blocks.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Decode a textual reply: UTF-8, NUL padding and line terminators removed.
/// An empty reply is treated as malformed.
pub fn decode_reply(command: &str, raw: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| Error::malformed(command, format!("reply is not UTF-8: {e}")))?;
    let trimmed = text.trim_matches(char::from(0)).trim();
    if trimmed.is_empty() {
        return Err(Error::malformed(command, "empty response from device"));
    }
    Ok(trimmed.to_string())
}

pub fn parse_f64(command: &str, reply: &str) -> Result<f64> {
    reply
        .trim()
        .parse::<f64>()
        .map_err(|e| Error::malformed(command, format!("expected a number, got {reply:?} ({e})")))
}

/// Parse a comma-separated list of numbers, as returned by waveform and
/// trace queries.
pub fn parse_f64_list(command: &str, reply: &str) -> Result<Vec<f64>> {
    reply
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_f64(command, s))
        .collect()
}

/// `*OPC?` style boolean: `1`/`ON`/`TRUE` are true.
pub fn parse_on_off(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("ON") || value.eq_ignore_ascii_case("TRUE")
}

/// A numeric command argument as typed by the operator: a number with an
/// optional engineering suffix (`2.45GHz`, `10ms`, `-10dBm`), or one of the
/// SCPI numeric keywords `MIN`, `MAX` and `DEF`.
///
/// The suffix is passed through to the instrument untouched; only the
/// number is validated. Keywords are accepted in short or long form, any
/// case, and sent in upper-case short form.
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric {
    Value { value: f64, suffix: String },
    Min,
    Max,
    Default,
}

impl Numeric {
    pub fn with_suffix(value: f64, suffix: impl Into<String>) -> Self {
        Numeric::Value {
            value,
            suffix: suffix.into(),
        }
    }

    /// The number, or `None` for a keyword.
    pub fn value(&self) -> Option<f64> {
        match self {
            Numeric::Value { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn suffix(&self) -> &str {
        match self {
            Numeric::Value { suffix, .. } => suffix,
            _ => "",
        }
    }

    fn keyword(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MIN" | "MINIMUM" => Some(Numeric::Min),
            "MAX" | "MAXIMUM" => Some(Numeric::Max),
            "DEF" | "DEFAULT" => Some(Numeric::Default),
            _ => None,
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Value { value, suffix } => write!(f, "{value}{suffix}"),
            Numeric::Min => f.write_str("MIN"),
            Numeric::Max => f.write_str("MAX"),
            Numeric::Default => f.write_str("DEF"),
        }
    }
}

impl FromStr for Numeric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(keyword) = Numeric::keyword(s) {
            return Ok(keyword);
        }
        // The mantissa ends at the first letter that cannot start an exponent.
        let split = mantissa_len(s);
        let (number, suffix) = s.split_at(split);
        if number.is_empty() {
            return Err(format!("expected a number or MIN/MAX/DEF, got {s:?}"));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| format!("expected a number, got {s:?}"))?;
        if !value.is_finite() {
            return Err(format!("{s:?} is not a finite number"));
        }
        if !suffix.chars().all(|c| c.is_ascii_alphabetic() || c == '/') {
            return Err(format!("unexpected characters in unit suffix {suffix:?}"));
        }
        Ok(Numeric::with_suffix(value, suffix))
    }
}

fn mantissa_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
        i += 1;
    }
    // Exponent only if followed by digits, so `1e3` is a number but `1EXT`
    // keeps its suffix.
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let digits_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > digits_start {
            i = j;
        }
    }
    i
}

/// Reference decoder for the last argument of a formatted command string:
/// `":SENSe:FREQuency:CENTer 2450000000Hz"` yields `2450000000 Hz`.
pub fn decode_numeric_argument(command: &str) -> Option<Numeric> {
    let arg = command.trim().rsplit([' ', ',']).next()?;
    arg.parse().ok()
}

/// Where the payload of an IEEE 488.2 block sits inside a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// More bytes are needed before the payload is complete.
    Incomplete,
    /// Payload byte range within the buffer.
    Complete(Range<usize>),
}

/// Locate a `#<n><len><payload>` block. Leading whitespace is skipped. An
/// indefinite block (`#0`) runs until a trailing newline.
pub fn locate_block(command: &str, buf: &[u8]) -> Result<Block> {
    let start = match buf.iter().position(|b| !b.is_ascii_whitespace()) {
        Some(i) => i,
        None => return Ok(Block::Incomplete),
    };
    if buf[start] != b'#' {
        return Err(Error::malformed(command, "binary block does not start with '#'"));
    }
    let Some(&digit) = buf.get(start + 1) else {
        return Ok(Block::Incomplete);
    };
    if !digit.is_ascii_digit() {
        return Err(Error::malformed(command, "binary block header has no length digit"));
    }
    let width = usize::from(digit - b'0');
    let header_end = start + 2 + width;

    if width == 0 {
        return Ok(match buf[start + 2..].iter().rposition(|b| *b == b'\n') {
            Some(nl) => Block::Complete(start + 2..start + 2 + nl),
            None => Block::Incomplete,
        });
    }

    if buf.len() < header_end {
        return Ok(Block::Incomplete);
    }
    let len_text = std::str::from_utf8(&buf[start + 2..header_end])
        .map_err(|_| Error::malformed(command, "binary block length is not ASCII"))?;
    let len: usize = len_text
        .parse()
        .map_err(|_| Error::malformed(command, format!("bad binary block length {len_text:?}")))?;

    if buf.len() < header_end + len {
        Ok(Block::Incomplete)
    } else {
        Ok(Block::Complete(header_end..header_end + len))
    }
}

/// Some instruments wrap ASCII waveform data in a block header even in ASCII
/// mode; return the bare text either way.
pub fn strip_block_header(reply: &str) -> &str {
    let reply = reply.trim();
    let bytes = reply.as_bytes();
    if bytes.first() != Some(&b'#') {
        return reply;
    }
    match bytes.get(1) {
        Some(d) if d.is_ascii_digit() => {
            let width = usize::from(d - b'0');
            reply.get(2 + width..).unwrap_or("").trim()
        }
        _ => reply,
    }
}
