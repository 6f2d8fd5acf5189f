use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::models::{IntensityTier, MotionKind, PositionClass, Segment, SpeedClass};

use super::categorize::TierThresholds;

const FUNSCRIPT_EXTENSION: &str = ".funscript";

/// Every loaded segment plus read-only partitions built once at load time.
#[derive(Debug, Clone, Default)]
pub struct SegmentLibrary {
    segments: Vec<Arc<Segment>>,
    by_tier: HashMap<IntensityTier, Vec<Arc<Segment>>>,
    by_speed: HashMap<SpeedClass, Vec<Arc<Segment>>>,
    holds: HashMap<PositionClass, Vec<Arc<Segment>>>,
    transitions: HashMap<(PositionClass, PositionClass), Vec<Arc<Segment>>>,
    thresholds: Option<TierThresholds>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySummary {
    pub total: usize,
    pub gentle: usize,
    pub medium: usize,
    pub intense: usize,
    pub holds: usize,
    pub transitions: usize,
    pub thresholds: Option<TierThresholds>,
}

impl SegmentLibrary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_segments(mut segments: Vec<Segment>) -> Self {
        if segments.is_empty() {
            return Self::empty();
        }

        let intensities: Vec<f64> = segments.iter().map(Segment::intensity).collect();
        let thresholds = TierThresholds::from_intensities(&intensities);

        let mut library = Self {
            thresholds: Some(thresholds),
            ..Self::default()
        };

        for mut segment in segments.drain(..) {
            segment.assign_tier(thresholds.tier_for(segment.intensity()));
            let segment = Arc::new(segment);

            library
                .by_tier
                .entry(segment.tier())
                .or_default()
                .push(segment.clone());
            library
                .by_speed
                .entry(segment.speed_class())
                .or_default()
                .push(segment.clone());
            match segment.motion() {
                MotionKind::Hold(class) => {
                    library.holds.entry(class).or_default().push(segment.clone())
                }
                MotionKind::Transition { from, to } => library
                    .transitions
                    .entry((from, to))
                    .or_default()
                    .push(segment.clone()),
            }
            library.segments.push(segment);
        }

        library
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn all(&self) -> &[Arc<Segment>] {
        &self.segments
    }

    pub fn by_tier(&self, tier: IntensityTier) -> &[Arc<Segment>] {
        self.by_tier.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_speed(&self, speed: SpeedClass) -> &[Arc<Segment>] {
        self.by_speed.get(&speed).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn holds(&self, class: PositionClass) -> &[Arc<Segment>] {
        self.holds.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn transitions(&self, from: PositionClass, to: PositionClass) -> &[Arc<Segment>] {
        self.transitions
            .get(&(from, to))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn thresholds(&self) -> Option<TierThresholds> {
        self.thresholds
    }

    /// Lookup by name, with or without the `.funscript` extension.
    pub fn find_by_name(&self, name: &str) -> Option<Arc<Segment>> {
        let wanted = name.strip_suffix(FUNSCRIPT_EXTENSION).unwrap_or(name);
        self.segments
            .iter()
            .find(|segment| {
                let candidate = segment.name();
                candidate == name
                    || candidate.strip_suffix(FUNSCRIPT_EXTENSION).unwrap_or(candidate) == wanted
            })
            .cloned()
    }

    pub fn summary(&self) -> LibrarySummary {
        LibrarySummary {
            total: self.len(),
            gentle: self.by_tier(IntensityTier::Gentle).len(),
            medium: self.by_tier(IntensityTier::Medium).len(),
            intense: self.by_tier(IntensityTier::Intense).len(),
            holds: self.holds.values().map(Vec::len).sum(),
            transitions: self.transitions.values().map(Vec::len).sum(),
            thresholds: self.thresholds,
        }
    }
}
