use std::sync::Arc;

use log::{debug, warn};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::library::SegmentLibrary;
use crate::models::{PositionClass, Segment, SpeedClass};

use super::history::RecentHistory;
use super::policy::{arousal_blend, continuity_table, share_len, Movement, WeightedMove};
use super::SelectorConfig;

/// Picks the next segment to play, either keeping stroke depth continuous or
/// drawing from a speed pool matched to the target arousal.
pub struct SegmentSelector {
    library: Arc<SegmentLibrary>,
    rng: StdRng,
    continuity_history: RecentHistory,
    arousal_history: RecentHistory,
    exhaustion_resets: u64,
}

impl SegmentSelector {
    pub fn new(library: Arc<SegmentLibrary>, config: &SelectorConfig) -> Self {
        Self::with_rng(library, config, StdRng::from_entropy())
    }

    pub fn with_rng(library: Arc<SegmentLibrary>, config: &SelectorConfig, rng: StdRng) -> Self {
        Self {
            library,
            rng,
            continuity_history: RecentHistory::new(config.history_len),
            arousal_history: RecentHistory::new(config.history_len),
            exhaustion_resets: 0,
        }
    }

    /// Returns `None` only when the library is empty.
    pub fn select_next(
        &mut self,
        current_position: f64,
        target_arousal: Option<f64>,
    ) -> Option<Arc<Segment>> {
        if self.library.is_empty() {
            return None;
        }
        let picked = match target_arousal {
            Some(target) => self.select_by_arousal(target),
            None => self.select_by_position(current_position),
        }?;
        debug!(
            "Selected {} ({:?}, {})",
            picked.name(),
            picked.motion(),
            picked.speed_class().as_str()
        );
        Some(picked)
    }

    /// Times a selection stream ran out of fresh candidates and its history
    /// had to be cleared.
    pub fn exhaustion_resets(&self) -> u64 {
        self.exhaustion_resets
    }

    pub fn library(&self) -> &Arc<SegmentLibrary> {
        &self.library
    }

    fn select_by_position(&mut self, current_position: f64) -> Option<Arc<Segment>> {
        let library = self.library.clone();
        let class = PositionClass::nearest(current_position);

        for attempt in 0..2 {
            let history = (attempt == 0).then_some(&self.continuity_history);

            let candidates = candidate_moves(&library, class, history);
            let picked = if candidates.is_empty() {
                let fresh = exclude_recent(library.all(), history);
                fresh.choose(&mut self.rng).cloned()
            } else {
                let weights: Vec<f64> = candidates.iter().map(|(m, _)| m.weight).collect();
                let index = WeightedIndex::new(&weights)
                    .map(|dist| dist.sample(&mut self.rng))
                    .unwrap_or(0);
                candidates[index].1.choose(&mut self.rng).cloned()
            };

            if let Some(segment) = picked {
                self.continuity_history.record(segment.name());
                return Some(segment);
            }

            self.continuity_history.clear();
            self.exhaustion_resets += 1;
            warn!(
                "Continuity selection exhausted at {} after excluding recent picks; history cleared",
                class.as_str()
            );
        }
        None
    }

    fn select_by_arousal(&mut self, target: f64) -> Option<Arc<Segment>> {
        let library = self.library.clone();

        let mut pool: Vec<Arc<Segment>> = arousal_blend(target)
            .iter()
            .flat_map(|share| {
                let class = library.by_speed(share.class);
                class[..share_len(class.len(), share.share)].iter().cloned()
            })
            .collect();
        if pool.is_empty() {
            pool = library.by_speed(SpeedClass::Medium).to_vec();
        }
        if pool.is_empty() {
            pool = library.all().to_vec();
        }

        let mut fresh = exclude_recent(&pool, Some(&self.arousal_history));
        if fresh.is_empty() {
            self.arousal_history.clear();
            self.exhaustion_resets += 1;
            warn!(
                "Arousal pool of {} segments exhausted at target {:.0}; history cleared",
                pool.len(),
                target
            );
            fresh = pool;
        }

        let picked = fresh.choose(&mut self.rng).cloned()?;
        self.arousal_history.record(picked.name());
        Some(picked)
    }
}

/// Moves from the policy table whose pools still hold candidates, paired with
/// those candidates.
pub(crate) fn candidate_moves(
    library: &SegmentLibrary,
    current: PositionClass,
    history: Option<&RecentHistory>,
) -> Vec<(WeightedMove, Vec<Arc<Segment>>)> {
    continuity_table(current)
        .iter()
        .filter_map(|weighted| {
            let pool = match weighted.movement {
                Movement::Stay => library.holds(current),
                Movement::To(target) => library.transitions(current, target),
            };
            let fresh = exclude_recent(pool, history);
            (!fresh.is_empty()).then_some((*weighted, fresh))
        })
        .collect()
}

fn exclude_recent(pool: &[Arc<Segment>], history: Option<&RecentHistory>) -> Vec<Arc<Segment>> {
    pool.iter()
        .filter(|segment| history.map_or(true, |h| !h.contains(segment.name())))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Keyframe;

    fn segment(name: &str, start: u8, end: u8, duration_ms: u64) -> Segment {
        let mid = ((start as u16 + end as u16) / 2) as u8;
        Segment::new(
            name,
            vec![
                Keyframe::new(0, start).unwrap(),
                Keyframe::new(duration_ms / 2, mid).unwrap(),
                Keyframe::new(duration_ms, end).unwrap(),
            ],
        )
        .unwrap()
    }

    fn selector(segments: Vec<Segment>, history_len: usize, seed: u64) -> SegmentSelector {
        SegmentSelector::with_rng(
            Arc::new(SegmentLibrary::from_segments(segments)),
            &SelectorConfig { history_len },
            StdRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn empty_library_yields_nothing() {
        let mut selector = selector(Vec::new(), 3, 1);
        assert!(selector.select_next(0.0, None).is_none());
        assert!(selector.select_next(0.0, Some(50.0)).is_none());
    }

    #[test]
    fn unavailable_moves_are_dropped_from_the_table() {
        let library = SegmentLibrary::from_segments(vec![
            segment("deep_hold", 0, 10, 1000),
            segment("deep_to_shallow", 0, 100, 1000),
        ]);
        let moves = candidate_moves(&library, PositionClass::Deep, None);
        let kinds: Vec<Movement> = moves.iter().map(|(m, _)| m.movement).collect();
        assert_eq!(
            kinds,
            vec![Movement::Stay, Movement::To(PositionClass::Shallow)]
        );

        let mut history = RecentHistory::new(3);
        history.record("deep_hold");
        let moves = candidate_moves(&library, PositionClass::Deep, Some(&history));
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].0.movement, Movement::To(PositionClass::Shallow));
    }

    #[test]
    fn continuity_prefers_holds_at_current_depth() {
        let mut segments: Vec<Segment> = (0..6)
            .map(|i| segment(&format!("deep_{i}"), 5, 15, 2000))
            .collect();
        segments.extend((0..6).map(|i| segment(&format!("shallow_{i}"), 85, 90, 2000)));
        segments.push(segment("deep_to_shallow", 0, 100, 1500));
        let mut selector = selector(segments, 3, 42);

        let mut deep_holds = 0;
        for _ in 0..200 {
            let picked = selector.select_next(10.0, None).unwrap();
            assert!(!picked.name().starts_with("shallow_"), "{}", picked.name());
            if picked.name().starts_with("deep_") && picked.name() != "deep_to_shallow" {
                deep_holds += 1;
            }
        }
        // 70% weight on holds, the rest goes to the single transition
        // whenever it is not in recent history
        assert!(deep_holds > 100, "{deep_holds}");
    }

    #[test]
    fn no_repeats_within_history_window() {
        let segments: Vec<Segment> = (0..8)
            .map(|i| segment(&format!("mid_{i}"), 45, 55, 1000 + i * 100))
            .collect();
        let mut selector = selector(segments, 3, 9);

        let picks: Vec<String> = (0..300)
            .map(|_| selector.select_next(50.0, None).unwrap().name().to_string())
            .collect();
        for window in picks.windows(4) {
            for i in 0..window.len() {
                for j in i + 1..window.len() {
                    assert_ne!(window[i], window[j], "{window:?}");
                }
            }
        }
        assert_eq!(selector.exhaustion_resets(), 0);
    }

    #[test]
    fn arousal_mode_draws_from_matching_speed_class() {
        let mut segments = Vec::new();
        for i in 0..6 {
            segments.push(
                segment(&format!("slow_{i}"), 20, 80, 4000).with_speed_class(SpeedClass::Slow),
            );
            segments.push(
                segment(&format!("fast_{i}"), 20, 80, 400).with_speed_class(SpeedClass::Fast),
            );
        }
        let mut selector = selector(segments, 3, 5);

        for _ in 0..50 {
            let low = selector.select_next(50.0, Some(10.0)).unwrap();
            assert_eq!(low.speed_class(), SpeedClass::Slow);
            let high = selector.select_next(50.0, Some(90.0)).unwrap();
            assert_eq!(high.speed_class(), SpeedClass::Fast);
        }
    }

    #[test]
    fn small_arousal_pool_resets_history() {
        let segments = vec![
            segment("only_a", 20, 80, 1000).with_speed_class(SpeedClass::Medium),
            segment("only_b", 20, 80, 1000).with_speed_class(SpeedClass::Medium),
        ];
        let mut selector = selector(segments, 3, 3);
        for _ in 0..6 {
            assert!(selector.select_next(50.0, Some(50.0)).is_some());
        }
        assert!(selector.exhaustion_resets() > 0);
    }

    #[test]
    fn continuity_library_smaller_than_history_resets() {
        let segments = vec![
            segment("deep_hold", 0, 10, 1000),
            segment("deep_to_shallow", 0, 100, 1000),
        ];
        let mut selector = selector(segments, 3, 11);

        let picks: Vec<String> = (0..5)
            .map(|_| selector.select_next(0.0, None).unwrap().name().to_string())
            .collect();

        assert_ne!(picks[0], picks[1], "{picks:?}");
        assert!(selector.exhaustion_resets() > 0);
    }
}
