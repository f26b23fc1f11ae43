use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimecodeError {
    #[error("empty timecode")]
    Empty,
    #[error("fps must be > 0 for HH:MM:SS:FF parsing: {value}")]
    InvalidFps { value: String },
    #[error("unsupported timecode format: {value}")]
    Format { value: String },
}

/// Parses `HH:MM:SS:FF`, `HH:MM:SS[.ms]`, `MM:SS[.ms]` or plain seconds into seconds.
///
/// `;` is accepted as a separator for drop-frame exports and a comma may stand in
/// for the decimal point of plain seconds. No rounding happens here.
pub fn parse_timecode(value: &str, fps: f64) -> Result<f64, TimecodeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TimecodeError::Empty);
    }
    let normalized = trimmed.replace(';', ":");

    if is_plain_seconds(&normalized) {
        return normalized
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| format_error(value));
    }

    let parts: Vec<&str> = normalized.split(':').collect();
    match parts.as_slice() {
        [hh, mm, ss, ff] => {
            let hours = parse_int(hh, value)?;
            let minutes = parse_int(mm, value)?;
            let seconds = parse_int(ss, value)?;
            let frames = parse_int(ff, value)?;
            if fps <= 0.0 {
                return Err(TimecodeError::InvalidFps {
                    value: value.to_string(),
                });
            }
            Ok(hours * 3600.0 + minutes * 60.0 + seconds + frames / fps)
        }
        [hh, mm, ss] => {
            let hours = parse_int(hh, value)?;
            let minutes = parse_int(mm, value)?;
            let seconds = parse_float(ss, value)?;
            Ok(hours * 3600.0 + minutes * 60.0 + seconds)
        }
        [mm, ss] => {
            let minutes = parse_int(mm, value)?;
            let seconds = parse_float(ss, value)?;
            Ok(minutes * 60.0 + seconds)
        }
        _ => Err(format_error(value)),
    }
}

fn is_plain_seconds(value: &str) -> bool {
    let (whole, fraction) = match value.find(['.', ',']) {
        Some(idx) => (&value[..idx], Some(&value[idx + 1..])),
        None => (value, None),
    };
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole) && fraction.map_or(true, all_digits)
}

// Whole-number parts are returned as f64; arithmetic on them never overflows.
fn parse_int(part: &str, value: &str) -> Result<f64, TimecodeError> {
    part.trim()
        .parse::<i64>()
        .map(|number| number as f64)
        .map_err(|_| format_error(value))
}

fn parse_float(part: &str, value: &str) -> Result<f64, TimecodeError> {
    part.trim().parse::<f64>().map_err(|_| format_error(value))
}

fn format_error(value: &str) -> TimecodeError {
    TimecodeError::Format {
        value: value.to_string(),
    }
}

/// A time as it appears in output JSON: a number, or a fixed-decimal string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(f64),
    Fixed(String),
}

impl TimeValue {
    pub fn as_seconds(&self) -> Option<f64> {
        match self {
            TimeValue::Seconds(value) => Some(*value),
            TimeValue::Fixed(text) => text.trim().parse::<f64>().ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFormat {
    pub round_digits: Option<u32>,
    pub as_string: bool,
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self {
            round_digits: Some(2),
            as_string: false,
        }
    }
}

impl TimeFormat {
    /// Negative digit counts disable rounding.
    pub fn from_round(round: i32, as_string: bool) -> Self {
        Self {
            round_digits: u32::try_from(round).ok(),
            as_string,
        }
    }

    pub fn format(&self, seconds: f64) -> TimeValue {
        let value = match self.round_digits {
            Some(digits) => round_to(seconds, digits),
            None => seconds,
        };
        if self.as_string {
            let precision = self.round_digits.unwrap_or(2) as usize;
            TimeValue::Fixed(format!("{value:.precision$}"))
        } else {
            TimeValue::Seconds(value)
        }
    }
}

pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}
