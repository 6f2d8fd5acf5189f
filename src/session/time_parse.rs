use log::warn;

use crate::error::ConfigError;

pub const DEFAULT_SESSION_SECS: u64 = 300;
pub const MAX_SESSION_SECS: u64 = 6 * 60 * 60;

/// Accepts `SS`, `M:SS`, `:SS` and `H:MM:SS`.
pub fn try_parse_session_time(input: &str) -> Result<u64, ConfigError> {
    let malformed = || ConfigError::MalformedTime(input.to_string());
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(malformed());
    }

    let parts: Vec<&str> = trimmed.split(':').map(str::trim).collect();
    let number = |part: &str, allow_empty: bool| -> Result<u64, ConfigError> {
        if part.is_empty() && allow_empty {
            return Ok(0);
        }
        part.parse::<u64>().map_err(|_| malformed())
    };

    let (hours, mins, secs) = match parts.as_slice() {
        [secs] => (0, 0, number(*secs, false)?),
        [mins, secs] => (0, number(*mins, true)?, number(*secs, false)?),
        [hours, mins, secs] => (
            number(*hours, false)?,
            number(*mins, false)?,
            number(*secs, false)?,
        ),
        _ => return Err(malformed()),
    };
    let seconds = hours
        .saturating_mul(3600)
        .saturating_add(mins.saturating_mul(60))
        .saturating_add(secs);

    if seconds == 0 || seconds > MAX_SESSION_SECS {
        return Err(ConfigError::OutOfRange {
            field: "session_length_s",
            value: seconds as f64,
            min: 1.0,
            max: MAX_SESSION_SECS as f64,
        });
    }
    Ok(seconds)
}

/// Lenient variant for the live control path: falls back to five minutes.
pub fn parse_session_time(input: &str) -> u64 {
    try_parse_session_time(input).unwrap_or_else(|err| {
        warn!("{}; using {} s", err, DEFAULT_SESSION_SECS);
        DEFAULT_SESSION_SECS
    })
}
