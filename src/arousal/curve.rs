use std::f64::consts::TAU;

use rand::Rng;
use serde::Serialize;

pub const MIN_PEAKS: u32 = 1;
pub const MAX_PEAKS: u32 = 10;

/// Target returned when no curve exists.
pub const DEFAULT_AROUSAL: f64 = 50.0;

const MIN_SAMPLES: usize = 20;
/// One sample per this many seconds of session.
const SECONDS_PER_SAMPLE: u64 = 15;

const BASELINE_START: f64 = 20.0;
const BASELINE_RISE: f64 = 30.0;
const AMPLITUDE_START: f64 = 35.0;
const AMPLITUDE_RISE: f64 = 20.0;
const JITTER: f64 = 3.0;
const CREST_BOOST_START: f64 = 10.0;
const CREST_BOOST_RISE: f64 = 20.0;
/// Half-width, in oscillation phase, of the window boosted around each crest.
const CREST_HALF_WINDOW: f64 = 0.125;
const CREST_PHASE: f64 = 0.25;

const FLOOR: f64 = 10.0;
const CEILING: f64 = 95.0;
const START_LOW: f64 = 15.0;
const START_HIGH: f64 = 25.0;

/// Arousal targets (0-100) sampled evenly across a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArousalCurve {
    samples: Vec<f64>,
    session_length_s: u64,
    peak_count: u32,
}

impl ArousalCurve {
    /// Rising baseline with `peak_count` oscillations whose amplitude grows
    /// towards the end of the session.
    pub fn generate<R: Rng + ?Sized>(session_length_s: u64, peak_count: u32, rng: &mut R) -> Self {
        let peaks = peak_count.clamp(MIN_PEAKS, MAX_PEAKS);
        let count = MIN_SAMPLES.max((session_length_s / SECONDS_PER_SAMPLE) as usize);

        let mut raw: Vec<f64> = (0..count)
            .map(|i| {
                let progress = i as f64 / (count - 1) as f64;
                let mut value = sample_at(progress, peaks);
                value += rng.gen_range(-JITTER..=JITTER);
                value.clamp(FLOOR, CEILING)
            })
            .collect();

        raw[0] = rng.gen_range(START_LOW..=START_HIGH);

        Self {
            samples: smooth(&raw),
            session_length_s,
            peak_count: peaks,
        }
    }

    pub fn from_samples(samples: Vec<f64>, session_length_s: u64) -> Self {
        Self {
            samples,
            session_length_s,
            peak_count: MIN_PEAKS,
        }
    }

    /// Nearest-lower sample for the elapsed time; no interpolation.
    pub fn get_target(&self, elapsed_s: f64) -> f64 {
        if self.samples.is_empty() || self.session_length_s == 0 {
            return DEFAULT_AROUSAL;
        }
        let progress = (elapsed_s.max(0.0) / self.session_length_s as f64).min(1.0);
        let index = (progress * (self.samples.len() - 1) as f64).floor() as usize;
        self.samples[index.min(self.samples.len() - 1)]
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn session_length_s(&self) -> u64 {
        self.session_length_s
    }

    pub fn peak_count(&self) -> u32 {
        self.peak_count
    }
}

/// Noise-free curve value at `progress` in [0, 1].
fn sample_at(progress: f64, peaks: u32) -> f64 {
    let baseline = BASELINE_START + progress * BASELINE_RISE;
    let amplitude = AMPLITUDE_START + progress * AMPLITUDE_RISE;
    let wave = (progress * peaks as f64 * TAU).sin() * amplitude * 0.5;

    let mut value = baseline + wave;
    if peaks > 1 {
        let phase = (progress * peaks as f64).fract();
        let distance = (phase - CREST_PHASE).abs();
        if distance < CREST_HALF_WINDOW {
            let bonus = CREST_BOOST_START + progress * CREST_BOOST_RISE;
            value += bonus * (1.0 - distance / CREST_HALF_WINDOW);
        }
    }
    value
}

/// Three-point moving average; endpoints keep their values.
fn smooth(values: &[f64]) -> Vec<f64> {
    if values.len() < 3 {
        return values.to_vec();
    }
    let mut out = values.to_vec();
    for i in 1..values.len() - 1 {
        out[i] = (values[i - 1] + values[i] + values[i + 1]) / 3.0;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Counts excursions above the rising baseline, with hysteresis so jitter
    /// around the midline is not counted twice.
    fn count_excursions(curve: &ArousalCurve) -> u32 {
        const BAND: f64 = 6.0;
        let samples = curve.samples();
        let n = samples.len();
        let mut above = false;
        let mut count = 0;
        for (i, value) in samples.iter().enumerate() {
            let progress = i as f64 / (n - 1) as f64;
            let midline = BASELINE_START + progress * BASELINE_RISE;
            if !above && *value > midline + BAND {
                above = true;
                count += 1;
            } else if above && *value < midline - BAND {
                above = false;
            }
        }
        count
    }

    #[test]
    fn sample_count_follows_session_length() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(ArousalCurve::generate(60, 3, &mut rng).len(), 20);
        assert_eq!(ArousalCurve::generate(300, 3, &mut rng).len(), 20);
        assert_eq!(ArousalCurve::generate(900, 3, &mut rng).len(), 60);
        assert_eq!(ArousalCurve::generate(3600, 3, &mut rng).len(), 240);
    }

    #[test]
    fn values_stay_in_bounds_and_start_low() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let peaks = (seed as u32 % 10) + 1;
            let curve = ArousalCurve::generate(600 + seed * 90, peaks, &mut rng);
            assert!(curve
                .samples()
                .iter()
                .all(|value| (FLOOR..=CEILING).contains(value)));
            assert!((START_LOW..=START_HIGH).contains(&curve.samples()[0]));
        }
    }

    #[test]
    fn oscillation_count_tracks_peak_count() {
        for peaks in 1..=10 {
            for seed in 0..5 {
                let mut rng = StdRng::seed_from_u64(seed * 31 + peaks as u64);
                let curve = ArousalCurve::generate(3600, peaks, &mut rng);
                let excursions = count_excursions(&curve);
                assert!(
                    excursions.abs_diff(peaks) <= 1,
                    "peaks={peaks} seed={seed} excursions={excursions}"
                );
            }
        }
    }

    #[test]
    fn peak_count_is_clamped() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(ArousalCurve::generate(600, 0, &mut rng).peak_count(), 1);
        assert_eq!(ArousalCurve::generate(600, 42, &mut rng).peak_count(), 10);
    }

    #[test]
    fn target_maps_progress_to_lower_index() {
        let samples: Vec<f64> = (0..20).map(|i| i as f64 * 5.0).collect();
        let curve = ArousalCurve::from_samples(samples, 190);

        assert_eq!(curve.get_target(0.0), 0.0);
        // 95 / 190 * 19 = 9.5 -> index 9
        assert_eq!(curve.get_target(95.0), 45.0);
        assert_eq!(curve.get_target(190.0), 95.0);
        assert_eq!(curve.get_target(10_000.0), 95.0);
        assert_eq!(curve.get_target(-3.0), 0.0);
    }

    #[test]
    fn target_defaults_without_curve() {
        assert_eq!(ArousalCurve::default().get_target(12.0), DEFAULT_AROUSAL);
        assert_eq!(
            ArousalCurve::from_samples(vec![30.0, 40.0], 0).get_target(1.0),
            DEFAULT_AROUSAL
        );
    }
}
