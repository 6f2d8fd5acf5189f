pub mod history;
pub mod policy;
pub mod selector;

pub use history::RecentHistory;
pub use policy::{arousal_blend, continuity_table, Movement, SpeedShare, WeightedMove};
pub use selector::SegmentSelector;

/// Tunables for segment selection.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// How many recent picks per selection stream are excluded from the pool
    pub history_len: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self { history_len: 3 }
    }
}
