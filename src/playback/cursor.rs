use std::time::{Duration, Instant};

use crate::chaining::ChainedSequence;
use crate::models::Keyframe;

/// Position within the sequence currently being played. Owned by the
/// scheduler; nothing else reads or advances it.
#[derive(Debug, Clone)]
pub struct PlaybackCursor {
    sequence: ChainedSequence,
    index: usize,
    anchor: Instant,
}

impl PlaybackCursor {
    pub fn new(sequence: ChainedSequence, anchor: Instant) -> Self {
        Self {
            sequence,
            index: 0,
            anchor,
        }
    }

    /// Wall-clock time the keyframe at `index` is scheduled for.
    pub fn scheduled_at(&self, index: usize) -> Option<Instant> {
        let first = self.sequence.keyframes.first()?.offset_ms;
        self.sequence
            .keyframes
            .get(index)
            .map(|kf| self.anchor + Duration::from_millis(kf.offset_ms - first))
    }

    /// The next keyframe if its scheduled time has been reached.
    pub fn due(&self, now: Instant) -> Option<Keyframe> {
        let at = self.scheduled_at(self.index)?;
        (at <= now).then(|| self.sequence.keyframes[self.index])
    }

    /// Time from the current keyframe to the following one.
    pub fn ramp_to_next(&self) -> Option<u64> {
        let current = self.sequence.keyframes.get(self.index)?;
        let next = self.sequence.keyframes.get(self.index + 1)?;
        Some(next.offset_ms - current.offset_ms)
    }

    pub fn advance(&mut self) {
        if !self.is_exhausted() {
            self.index += 1;
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.sequence.keyframes.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.sequence.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.keyframes.is_empty()
    }

    pub fn sources(&self) -> &[String] {
        &self.sequence.sources
    }
}
