pub const MIN_SPEED_MULTIPLIER: f64 = 0.4;
pub const MAX_SPEED_MULTIPLIER: f64 = 3.0;

const CATCH_UP_GAP: f64 = 15.0;

/// Ramp-duration multiplier for the device: low targets stretch strokes,
/// high targets shorten them. The gap between current and target arousal
/// nudges the result so the device leans towards the target.
pub fn speed_multiplier(current: f64, target: f64) -> f64 {
    let base: f64 = match target {
        t if t < 25.0 => 2.0,
        t if t < 40.0 => 1.5,
        t if t < 60.0 => 1.0,
        t if t < 80.0 => 0.8,
        _ => 0.6,
    };

    let gap = target - current;
    let adjusted = if gap > CATCH_UP_GAP {
        base * 0.9
    } else if gap < -CATCH_UP_GAP {
        base * 1.2
    } else {
        base
    };

    adjusted.clamp(MIN_SPEED_MULTIPLIER, MAX_SPEED_MULTIPLIER)
}

/// Converts a ramp-duration multiplier into the bridge's speed factor, where
/// values above 1.0 mean faster strokes.
pub fn device_speed(ramp_multiplier: f64) -> f64 {
    1.0 / ramp_multiplier.clamp(MIN_SPEED_MULTIPLIER, MAX_SPEED_MULTIPLIER)
}
