use serde::{Deserialize, Serialize};

use crate::error::SegmentError;

pub const MAX_POSITION: u8 = 100;

/// A single (time, position) pair. Offsets are relative to the start of the
/// script or sequence the keyframe belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    pub offset_ms: u64,
    pub position: u8,
}

impl Keyframe {
    pub fn new(offset_ms: u64, position: u8) -> Result<Self, SegmentError> {
        if position > MAX_POSITION {
            return Err(SegmentError::PositionOutOfRange(position as i64));
        }
        Ok(Self {
            offset_ms,
            position,
        })
    }

    /// Builds a keyframe from raw funscript values (`at` may be fractional in
    /// some exporters, `pos` may be written as a float).
    pub fn from_raw(at: f64, pos: f64) -> Result<Self, SegmentError> {
        if at < 0.0 {
            return Err(SegmentError::NegativeOffset(at as i64));
        }
        let rounded = pos.round();
        if !(0.0..=MAX_POSITION as f64).contains(&rounded) {
            return Err(SegmentError::PositionOutOfRange(rounded as i64));
        }
        Ok(Self {
            offset_ms: at.round() as u64,
            position: rounded as u8,
        })
    }
}
