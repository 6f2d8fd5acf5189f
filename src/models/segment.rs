use serde::{Deserialize, Serialize};

use crate::error::SegmentError;

use super::keyframe::Keyframe;

/// Coarse stroke depth. `Deep` is the low end of the 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PositionClass {
    Deep,
    Mid,
    Shallow,
}

impl PositionClass {
    pub const ALL: [PositionClass; 3] = [
        PositionClass::Deep,
        PositionClass::Mid,
        PositionClass::Shallow,
    ];

    /// Strict bands used to categorize segment endpoints. Positions in the
    /// gaps between bands (31-34, 66-69) belong to no class.
    pub fn band(position: u8) -> Option<Self> {
        match position {
            0..=30 => Some(PositionClass::Deep),
            35..=65 => Some(PositionClass::Mid),
            70..=100 => Some(PositionClass::Shallow),
            _ => None,
        }
    }

    /// Loose classification for live positions and fallbacks.
    pub fn nearest(position: f64) -> Self {
        if position <= 35.0 {
            PositionClass::Deep
        } else if position >= 65.0 {
            PositionClass::Shallow
        } else {
            PositionClass::Mid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionClass::Deep => "deep",
            PositionClass::Mid => "mid",
            PositionClass::Shallow => "shallow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpeedClass {
    Slow,
    Medium,
    Fast,
}

impl SpeedClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedClass::Slow => "slow",
            SpeedClass::Medium => "medium",
            SpeedClass::Fast => "fast",
        }
    }
}

/// Percentile-derived intensity bucket, recomputed for every loaded library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntensityTier {
    Gentle,
    Medium,
    Intense,
}

impl IntensityTier {
    pub fn speed_class(self) -> SpeedClass {
        match self {
            IntensityTier::Gentle => SpeedClass::Slow,
            IntensityTier::Medium => SpeedClass::Medium,
            IntensityTier::Intense => SpeedClass::Fast,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MotionKind {
    Hold(PositionClass),
    Transition {
        from: PositionClass,
        to: PositionClass,
    },
}

const HOLD_MAX_DRIFT: u8 = 20;

impl MotionKind {
    pub fn classify(start: u8, end: u8) -> Self {
        match (PositionClass::band(start), PositionClass::band(end)) {
            (Some(from), Some(to)) if from == to && start.abs_diff(end) <= HOLD_MAX_DRIFT => {
                MotionKind::Hold(from)
            }
            (Some(from), Some(to)) if from != to => MotionKind::Transition { from, to },
            _ => {
                let average = (start as f64 + end as f64) / 2.0;
                MotionKind::Hold(PositionClass::nearest(average))
            }
        }
    }
}

/// An immutable motion script plus its classification tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    name: String,
    keyframes: Vec<Keyframe>,
    intensity: f64,
    motion: MotionKind,
    speed_class: SpeedClass,
    tier: IntensityTier,
    #[serde(skip)]
    declared_speed: Option<SpeedClass>,
}

impl Segment {
    pub fn new(name: impl Into<String>, keyframes: Vec<Keyframe>) -> Result<Self, SegmentError> {
        if keyframes.len() < 2 {
            return Err(SegmentError::TooFewKeyframes(keyframes.len()));
        }
        if let Some(index) = keyframes
            .windows(2)
            .position(|pair| pair[1].offset_ms < pair[0].offset_ms)
        {
            return Err(SegmentError::DecreasingOffsets(index + 1));
        }

        let intensity = mean_speed(&keyframes);
        let motion = MotionKind::classify(
            keyframes[0].position,
            keyframes[keyframes.len() - 1].position,
        );

        Ok(Self {
            name: name.into(),
            keyframes,
            intensity,
            motion,
            speed_class: SpeedClass::Medium,
            tier: IntensityTier::Medium,
            declared_speed: None,
        })
    }

    pub fn with_intensity(mut self, intensity: f64) -> Self {
        if intensity.is_finite() && intensity >= 0.0 {
            self.intensity = intensity;
        }
        self
    }

    pub fn with_speed_class(mut self, speed_class: SpeedClass) -> Self {
        self.declared_speed = Some(speed_class);
        self.speed_class = speed_class;
        self
    }

    /// A declared speed class wins over the tier-derived one.
    pub(crate) fn assign_tier(&mut self, tier: IntensityTier) {
        self.tier = tier;
        self.speed_class = self.declared_speed.unwrap_or_else(|| tier.speed_class());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn start_position(&self) -> u8 {
        self.keyframes[0].position
    }

    pub fn end_position(&self) -> u8 {
        self.keyframes[self.keyframes.len() - 1].position
    }

    pub fn start_ms(&self) -> u64 {
        self.keyframes[0].offset_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.keyframes[self.keyframes.len() - 1].offset_ms - self.keyframes[0].offset_ms
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn motion(&self) -> MotionKind {
        self.motion
    }

    pub fn speed_class(&self) -> SpeedClass {
        self.speed_class
    }

    pub fn tier(&self) -> IntensityTier {
        self.tier
    }

    pub fn position_class(&self) -> PositionClass {
        let average = (self.start_position() as f64 + self.end_position() as f64) / 2.0;
        PositionClass::nearest(average)
    }
}

/// Mean absolute speed in position units per millisecond.
fn mean_speed(keyframes: &[Keyframe]) -> f64 {
    let speeds: Vec<f64> = keyframes
        .windows(2)
        .filter_map(|pair| {
            let dt = pair[1].offset_ms.saturating_sub(pair[0].offset_ms);
            (dt > 0).then(|| pair[1].position.abs_diff(pair[0].position) as f64 / dt as f64)
        })
        .collect();

    if speeds.is_empty() {
        0.0
    } else {
        speeds.iter().sum::<f64>() / speeds.len() as f64
    }
}
