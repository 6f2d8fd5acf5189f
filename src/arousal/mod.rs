pub mod curve;
pub mod speed;

pub use curve::{ArousalCurve, DEFAULT_AROUSAL, MAX_PEAKS, MIN_PEAKS};
pub use speed::{device_speed, speed_multiplier};
