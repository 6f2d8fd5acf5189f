//! Selection policy as data: which pools to draw from and with what weight.

use crate::models::{PositionClass, SpeedClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Hold at the current depth.
    Stay,
    /// Transition from the current depth to another class.
    To(PositionClass),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedMove {
    pub movement: Movement,
    pub weight: f64,
}

const fn weighted(movement: Movement, weight: f64) -> WeightedMove {
    WeightedMove { movement, weight }
}

const FROM_DEEP: [WeightedMove; 3] = [
    weighted(Movement::Stay, 0.70),
    weighted(Movement::To(PositionClass::Shallow), 0.20),
    weighted(Movement::To(PositionClass::Mid), 0.10),
];

const FROM_SHALLOW: [WeightedMove; 3] = [
    weighted(Movement::Stay, 0.70),
    weighted(Movement::To(PositionClass::Deep), 0.20),
    weighted(Movement::To(PositionClass::Mid), 0.10),
];

const FROM_MID: [WeightedMove; 3] = [
    weighted(Movement::Stay, 0.60),
    weighted(Movement::To(PositionClass::Deep), 0.20),
    weighted(Movement::To(PositionClass::Shallow), 0.20),
];

/// Position-continuity weights for the class the stroke currently sits in.
pub fn continuity_table(current: PositionClass) -> &'static [WeightedMove] {
    match current {
        PositionClass::Deep => &FROM_DEEP,
        PositionClass::Shallow => &FROM_SHALLOW,
        PositionClass::Mid => &FROM_MID,
    }
}

/// Portion of a speed class admitted into an arousal pool. Shares below 1.0
/// take the leading fraction of that class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedShare {
    pub class: SpeedClass,
    pub share: f64,
}

const fn share(class: SpeedClass, share: f64) -> SpeedShare {
    SpeedShare { class, share }
}

const ONE_THIRD: f64 = 1.0 / 3.0;

const LOW_AROUSAL: [SpeedShare; 2] = [
    share(SpeedClass::Slow, 1.0),
    share(SpeedClass::Medium, ONE_THIRD),
];

const MID_AROUSAL: [SpeedShare; 3] = [
    share(SpeedClass::Medium, 1.0),
    share(SpeedClass::Slow, ONE_THIRD),
    share(SpeedClass::Fast, ONE_THIRD),
];

const HIGH_AROUSAL: [SpeedShare; 2] = [
    share(SpeedClass::Fast, 1.0),
    share(SpeedClass::Medium, 0.5),
];

pub const LOW_AROUSAL_MAX: f64 = 30.0;
pub const MID_AROUSAL_MAX: f64 = 70.0;

pub fn arousal_blend(target: f64) -> &'static [SpeedShare] {
    if target < LOW_AROUSAL_MAX {
        &LOW_AROUSAL
    } else if target < MID_AROUSAL_MAX {
        &MID_AROUSAL
    } else {
        &HIGH_AROUSAL
    }
}

/// Number of leading entries of a class admitted by `share`.
pub fn share_len(class_len: usize, share: f64) -> usize {
    if share >= 1.0 {
        class_len
    } else {
        (class_len as f64 * share).floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuity_weights_sum_to_one() {
        for class in PositionClass::ALL {
            let total: f64 = continuity_table(class).iter().map(|m| m.weight).sum();
            assert!((total - 1.0).abs() < 1e-9, "{class:?}");
        }
    }

    #[test]
    fn holding_is_the_most_likely_move() {
        for class in PositionClass::ALL {
            let table = continuity_table(class);
            let best = table
                .iter()
                .max_by(|a, b| a.weight.total_cmp(&b.weight))
                .unwrap();
            assert_eq!(best.movement, Movement::Stay);
        }
        // extremes lean towards the opposite end over mid
        assert_eq!(
            continuity_table(PositionClass::Deep)[1].movement,
            Movement::To(PositionClass::Shallow)
        );
    }

    #[test]
    fn arousal_bands_pick_blends() {
        assert_eq!(arousal_blend(10.0)[0].class, SpeedClass::Slow);
        assert_eq!(arousal_blend(29.9)[0].class, SpeedClass::Slow);
        assert_eq!(arousal_blend(30.0)[0].class, SpeedClass::Medium);
        assert_eq!(arousal_blend(69.0).len(), 3);
        assert_eq!(arousal_blend(70.0)[0].class, SpeedClass::Fast);
    }

    #[test]
    fn share_len_floors_partial_shares() {
        assert_eq!(share_len(9, ONE_THIRD), 3);
        assert_eq!(share_len(2, ONE_THIRD), 0);
        assert_eq!(share_len(5, 0.5), 2);
        assert_eq!(share_len(7, 1.0), 7);
    }
}
