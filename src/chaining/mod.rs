pub mod chainer;
pub mod composer;

pub use chainer::{chain, ChainPart, ChainedSequence};
pub use composer::{ComposeMode, PatternComposer};

/// Splicing tunables.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Position jumps larger than this get a bridging keyframe
    pub bridge_threshold: u8,

    /// Time allotted to a bridging move
    pub bridge_ms: u64,

    /// Pause inserted after every segment
    pub gap_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            bridge_threshold: 20,
            bridge_ms: 200,
            gap_ms: 0,
        }
    }
}

/// Tunables for building one queued sequence out of several segments.
#[derive(Debug, Clone)]
pub struct ComposeConfig {
    pub target_duration_ms: u64,

    /// Window bounds when cropping segments in arousal mode
    pub min_window_ms: u64,
    pub max_window_ms: u64,

    pub chain: ChainConfig,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            target_duration_ms: 60_000,
            min_window_ms: 5_000,
            max_window_ms: 10_000,
            chain: ChainConfig::default(),
        }
    }
}
