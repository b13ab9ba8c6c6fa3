//! `HH:MM:SS.mmm` timestamp formatting.

use thiserror::Error;

/// Errors from parsing a display timestamp.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimecodeError {
    /// The string does not have the `HH:MM:SS[.mmm]` shape.
    #[error("Malformed timestamp: {0}")]
    Malformed(String),

    /// Minutes or seconds field is 60 or more, or the hours do not fit.
    #[error("Field out of range in timestamp: {0}")]
    OutOfRange(String),
}

/// Format seconds as `HH:MM:SS.mmm`.
///
/// Milliseconds are truncated from the fractional part, never rounded.
/// Hours are not bounded. Callers pass a non-negative value.
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let whole = seconds.floor() as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;
    let millis = ((seconds % 1.0) * 1000.0).floor() as u64;

    format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
}

/// Parse `HH:MM:SS.mmm` (or `HH:MM:SS`) back into seconds.
pub fn parse_timestamp(text: &str) -> Result<f64, TimecodeError> {
    let malformed = || TimecodeError::Malformed(text.to_string());

    let (clock, millis) = match text.split_once('.') {
        Some((clock, frac)) => {
            if frac.is_empty() || frac.len() > 3 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            // "5" means 500 ms, "05" means 50 ms
            let padded = format!("{frac:0<3}");
            (clock, padded.parse::<u64>().map_err(|_| malformed())?)
        }
        None => (text, 0),
    };

    let fields: Vec<&str> = clock.split(':').collect();
    if fields.len() != 3 || fields.iter().any(|f| f.is_empty()) {
        return Err(malformed());
    }

    let mut parsed = [0u64; 3];
    for (slot, field) in parsed.iter_mut().zip(&fields) {
        *slot = field.parse().map_err(|_| malformed())?;
    }
    let [hours, minutes, secs] = parsed;

    if minutes >= 60 || secs >= 60 {
        return Err(TimecodeError::OutOfRange(text.to_string()));
    }

    let whole = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + secs))
        .ok_or_else(|| TimecodeError::OutOfRange(text.to_string()))?;
    Ok(whole as f64 + millis as f64 / 1000.0)
}
