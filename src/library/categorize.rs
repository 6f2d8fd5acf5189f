use serde::Serialize;

use crate::models::IntensityTier;

pub const GENTLE_PERCENTILE: f64 = 40.0;
pub const INTENSE_PERCENTILE: f64 = 75.0;

/// Intensity cut points computed from the loaded set, so tiers stay populated
/// whatever the skew of the source material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierThresholds {
    pub gentle_max: f64,
    pub medium_max: f64,
}

impl TierThresholds {
    pub fn from_intensities(intensities: &[f64]) -> Self {
        let mut sorted: Vec<f64> = intensities
            .iter()
            .copied()
            .filter(|value| value.is_finite())
            .collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Self {
            gentle_max: percentile(&sorted, GENTLE_PERCENTILE),
            medium_max: percentile(&sorted, INTENSE_PERCENTILE),
        }
    }

    pub fn tier_for(&self, intensity: f64) -> IntensityTier {
        if intensity <= self.gentle_max {
            IntensityTier::Gentle
        } else if intensity <= self.medium_max {
            IntensityTier::Medium
        } else {
            IntensityTier::Intense
        }
    }
}

/// Linear-interpolated percentile over an ascending slice.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = (pct.clamp(0.0, 100.0) / 100.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_ranks() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert!((percentile(&values, 40.0) - 2.6).abs() < 1e-9);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert_eq!(percentile(&[], 40.0), 0.0);
    }

    #[test]
    fn skewed_sets_still_fill_every_tier() {
        // Heavily skewed towards low values.
        let mut values: Vec<f64> = (0..90).map(|i| 0.01 + i as f64 * 0.0001).collect();
        values.extend((0..10).map(|i| 1.0 + i as f64));
        let thresholds = TierThresholds::from_intensities(&values);

        let mut counts = [0usize; 3];
        for value in &values {
            match thresholds.tier_for(*value) {
                IntensityTier::Gentle => counts[0] += 1,
                IntensityTier::Medium => counts[1] += 1,
                IntensityTier::Intense => counts[2] += 1,
            }
        }

        assert!(counts.iter().all(|count| *count > 0), "{counts:?}");
        assert!((35..=45).contains(&counts[0]));
        assert!((20..=30).contains(&counts[2]));
    }
}
