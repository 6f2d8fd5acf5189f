pub mod keyframe;
pub mod segment;

pub use keyframe::Keyframe;
pub use segment::{IntensityTier, MotionKind, PositionClass, Segment, SpeedClass};
