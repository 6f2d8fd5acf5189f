//! Error taxonomy shared across the engine.
//!
//! Application seams (controllers, settings, the runner) use `anyhow`; the
//! enums here name the failures that callers are expected to branch on.

use std::path::PathBuf;

/// Segment source could not be read. Callers degrade to an empty library.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read segment source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed segment data in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("segment source {0} contained no usable segments")]
    Empty(PathBuf),
}

/// A single segment record failed validation and is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    #[error("keyframe position {0} is outside 0-100")]
    PositionOutOfRange(i64),

    #[error("keyframe offset {0} is negative")]
    NegativeOffset(i64),

    #[error("segment needs at least 2 keyframes, got {0}")]
    TooFewKeyframes(usize),

    #[error("keyframe offsets decrease at index {0}")]
    DecreasingOffsets(usize),
}

/// Device command could not be delivered. Logged and dropped, never retried
/// from the timing loop.
#[derive(Debug, thiserror::Error)]
pub enum TransmissionError {
    #[error("device request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("device bridge returned HTTP {0}")]
    HttpStatus(u16),

    #[error("device request timed out after {0} ms")]
    Timeout(u64),

    #[error("device dispatcher is closed")]
    ChannelClosed,
}

/// Malformed user-supplied configuration. Live control paths clamp or
/// default instead of surfacing this.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed session time {0:?}")]
    MalformedTime(String),

    #[error("{field} value {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_names_field() {
        let err = ConfigError::OutOfRange {
            field: "stroke_min",
            value: 120.0,
            min: 0.0,
            max: 100.0,
        };
        assert_eq!(err.to_string(), "stroke_min value 120 is outside 0..=100");
    }

    #[test]
    fn transmission_error_display_status() {
        assert_eq!(
            TransmissionError::HttpStatus(503).to_string(),
            "device bridge returned HTTP 503"
        );
    }
}
