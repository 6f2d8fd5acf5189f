use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

/// Timing tunables for the playback engine.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Scheduler tick period
    pub tick_interval: Duration,

    /// Minimum spacing between two position commands sent to the device
    pub min_command_interval: Duration,

    /// Ramp used for the last keyframe of a sequence
    pub last_ramp_ms: u32,

    /// Neutral ramp on a regular stop and on an emergency stop
    pub stop_ramp_ms: u32,
    pub emergency_ramp_ms: u32,

    /// Ramp stretch factor while slow mode is on
    pub slow_mode_factor: f64,

    /// Pending sequences kept ready ahead of playback
    pub queue_capacity: usize,
    pub low_water: usize,

    /// How often the production loop checks the queue level
    pub produce_interval: Duration,

    /// Position assumed before anything has played
    pub home_position: u8,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(10),
            min_command_interval: Duration::from_millis(20),
            last_ramp_ms: 500,
            stop_ramp_ms: 1000,
            emergency_ramp_ms: 500,
            slow_mode_factor: 1.5,
            queue_capacity: 4,
            low_water: 2,
            produce_interval: Duration::from_millis(250),
            home_position: 50,
        }
    }
}

/// Portion of the device travel that script positions are mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeRange {
    pub min: u8,
    pub max: u8,
}

impl Default for StrokeRange {
    fn default() -> Self {
        Self { min: 0, max: 100 }
    }
}

impl StrokeRange {
    /// Out-of-range values are clamped, swapped bounds are reordered and an
    /// empty range falls back to full travel.
    pub fn clamped(min: u8, max: u8) -> Self {
        let (min, max) = (min.min(100), max.min(100));
        let (min, max) = if min > max { (max, min) } else { (min, max) };
        if min == max {
            warn!("Stroke range {}-{} is empty; using full travel", min, max);
            return Self::default();
        }
        Self { min, max }
    }

    /// Maps a 0-100 script position into the range, normalized to 0.0-1.0 and
    /// rounded to two decimals.
    pub fn normalize(&self, position: u8) -> f64 {
        let span = (self.max - self.min) as f64;
        let mapped = self.min as f64 + position.min(100) as f64 / 100.0 * span;
        mapped.round() / 100.0
    }
}

/// Live settings the control surface can change while playback runs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackOptions {
    pub range: StrokeRange,
    pub slow_mode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_clamped_and_ordered() {
        assert_eq!(StrokeRange::clamped(20, 80), StrokeRange { min: 20, max: 80 });
        assert_eq!(StrokeRange::clamped(90, 10), StrokeRange { min: 10, max: 90 });
        assert_eq!(StrokeRange::clamped(30, 250), StrokeRange { min: 30, max: 100 });
        assert_eq!(StrokeRange::clamped(40, 40), StrokeRange::default());
    }

    #[test]
    fn normalize_maps_into_range() {
        let full = StrokeRange::default();
        assert_eq!(full.normalize(0), 0.0);
        assert_eq!(full.normalize(37), 0.37);
        assert_eq!(full.normalize(100), 1.0);

        let narrow = StrokeRange::clamped(20, 60);
        assert_eq!(narrow.normalize(0), 0.2);
        assert_eq!(narrow.normalize(50), 0.4);
        assert_eq!(narrow.normalize(100), 0.6);
    }
}
