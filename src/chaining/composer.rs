use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::selection::SegmentSelector;

use super::chainer::{chain, ChainPart, ChainedSequence};
use super::ComposeConfig;

/// Every pick consumes at least this much of the duration budget.
const MIN_STEP_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComposeMode {
    /// Whole segments that keep stroke depth continuous.
    Continuity,
    /// Random windows from segments matching the target arousal.
    Arousal(f64),
}

/// Builds one playable sequence of roughly the configured duration.
pub struct PatternComposer {
    selector: SegmentSelector,
    config: ComposeConfig,
    rng: StdRng,
}

impl PatternComposer {
    pub fn new(selector: SegmentSelector, config: ComposeConfig) -> Self {
        Self::with_rng(selector, config, StdRng::from_entropy())
    }

    pub fn with_rng(selector: SegmentSelector, mut config: ComposeConfig, rng: StdRng) -> Self {
        config.min_window_ms = config.min_window_ms.max(MIN_STEP_MS);
        if config.max_window_ms < config.min_window_ms {
            config.max_window_ms = config.min_window_ms;
        }
        Self {
            selector,
            config,
            rng,
        }
    }

    pub fn selector(&self) -> &SegmentSelector {
        &self.selector
    }

    /// Returns `None` when nothing could be selected or every part cropped
    /// away.
    pub fn compose(&mut self, mode: ComposeMode, start_position: u8) -> Option<ChainedSequence> {
        let mut parts = Vec::new();
        let mut used_ms = 0;
        let mut position = start_position as f64;

        while used_ms < self.config.target_duration_ms {
            let target = match mode {
                ComposeMode::Arousal(arousal) => Some(arousal),
                ComposeMode::Continuity => None,
            };
            let Some(segment) = self.selector.select_next(position, target) else {
                break;
            };

            match mode {
                ComposeMode::Continuity => {
                    used_ms += segment.duration_ms().max(MIN_STEP_MS);
                    position = segment.end_position() as f64;
                    parts.push(ChainPart::whole(segment));
                }
                ComposeMode::Arousal(_) => {
                    let window = self
                        .rng
                        .gen_range(self.config.min_window_ms..=self.config.max_window_ms);
                    let duration = segment.duration_ms();
                    let part = if duration <= window {
                        ChainPart::whole(segment)
                    } else {
                        let start = self.rng.gen_range(0..=duration - window);
                        ChainPart::window(segment, start, window)
                    };
                    used_ms += window;
                    parts.push(part);
                }
            }
        }

        let sequence = chain(&parts, &self.config.chain);
        (!sequence.is_empty()).then_some(sequence)
    }
}
