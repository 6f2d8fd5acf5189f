use std::sync::Arc;

use serde::Serialize;

use crate::models::{Keyframe, Segment};

use super::ChainConfig;

/// One segment to splice, optionally cropped to a window measured from its
/// first keyframe.
#[derive(Debug, Clone)]
pub struct ChainPart {
    pub segment: Arc<Segment>,
    pub start_offset_ms: Option<u64>,
    pub length_ms: Option<u64>,
}

impl ChainPart {
    pub fn whole(segment: Arc<Segment>) -> Self {
        Self {
            segment,
            start_offset_ms: None,
            length_ms: None,
        }
    }

    pub fn window(segment: Arc<Segment>, start_offset_ms: u64, length_ms: u64) -> Self {
        Self {
            segment,
            start_offset_ms: Some(start_offset_ms),
            length_ms: Some(length_ms),
        }
    }
}

/// Keyframes with absolute offsets from the start of the sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainedSequence {
    pub keyframes: Vec<Keyframe>,
    pub sources: Vec<String>,
    pub bridges: usize,
}

impl ChainedSequence {
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn duration_ms(&self) -> u64 {
        match (self.keyframes.first(), self.keyframes.last()) {
            (Some(first), Some(last)) => last.offset_ms - first.offset_ms,
            _ => 0,
        }
    }

    pub fn end_position(&self) -> Option<u8> {
        self.keyframes.last().map(|kf| kf.position)
    }
}

/// Splices parts into one continuous sequence. Parts that keep fewer than two
/// keyframes after cropping are skipped.
pub fn chain(parts: &[ChainPart], config: &ChainConfig) -> ChainedSequence {
    let mut out = ChainedSequence::default();
    let mut running_ms: u64 = 0;

    for part in parts {
        let cropped = crop(part);
        if cropped.len() < 2 {
            continue;
        }
        let base = cropped[0].offset_ms;

        if let Some(previous) = out.keyframes.last() {
            let jump = previous.position.abs_diff(cropped[0].position);
            if jump > config.bridge_threshold {
                out.keyframes.push(Keyframe {
                    offset_ms: running_ms,
                    position: cropped[0].position,
                });
                out.bridges += 1;
                running_ms += config.bridge_ms;
            }
        }

        let mut last_relative = 0;
        for keyframe in cropped {
            last_relative = keyframe.offset_ms - base;
            out.keyframes.push(Keyframe {
                offset_ms: running_ms + last_relative,
                position: keyframe.position,
            });
        }
        running_ms += last_relative + config.gap_ms;
        out.sources.push(part.segment.name().to_string());
    }

    out
}

fn crop(part: &ChainPart) -> Vec<Keyframe> {
    let keyframes = part.segment.keyframes();
    if part.start_offset_ms.is_none() && part.length_ms.is_none() {
        return keyframes.to_vec();
    }

    let window_start = part.segment.start_ms() + part.start_offset_ms.unwrap_or(0);
    let window_end = part
        .length_ms
        .map(|length| window_start.saturating_add(length))
        .unwrap_or(u64::MAX);

    keyframes
        .iter()
        .filter(|kf| kf.offset_ms >= window_start && kf.offset_ms <= window_end)
        .copied()
        .collect()
}
