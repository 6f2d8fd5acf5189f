pub mod categorize;
pub mod loader;
pub mod store;

pub use categorize::TierThresholds;
pub use loader::{load, load_or_empty};
pub use store::{LibrarySummary, SegmentLibrary};
