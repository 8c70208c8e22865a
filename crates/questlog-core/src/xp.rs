//! XP accounting and level arithmetic.
//!
//! Levels follow a linear cost schedule: moving from level L to L+1 costs
//! `100 + (L-1)*40` XP (100, 140, 180, 220, ...). The level is always a
//! pure function of the cumulative XP total; the cached `level` column in
//! the profile is recomputed from the total on every mutation and can
//! never drift.

use serde::{Deserialize, Serialize};

/// Bonus XP awarded the first time a day is confirmed perfect.
pub const PERFECT_DAY_BONUS: u32 = 25;

/// Default XP value of a check-in when a goal doesn't override it.
pub const DEFAULT_XP_PER_CHECK: u32 = 10;

/// XP cost to advance from `level` to `level + 1`.
pub fn xp_to_next_level(level: u32) -> u32 {
    100 + level.saturating_sub(1) * 40
}

/// Cumulative XP required to reach `level`.
///
/// Level 1 is free; level 2 costs 100; level 3 costs 240; level 4 costs
/// 420.
pub fn threshold_for_level(level: u32) -> u32 {
    (1..level).map(xp_to_next_level).sum()
}

/// The unique level L with `threshold_for_level(L) <= total_xp <
/// threshold_for_level(L + 1)`.
pub fn level_from_xp(total_xp: u32) -> u32 {
    let mut level = 1;
    let mut threshold = 0;
    while total_xp >= threshold + xp_to_next_level(level) {
        threshold += xp_to_next_level(level);
        level += 1;
    }
    level
}

/// Progress within the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// XP earned since the current level's threshold
    pub current: u32,
    /// Cost of the current level
    pub required: u32,
    /// current/required, rounded, clamped to 0..=100
    pub percentage: u32,
}

/// Compute progress within the level that `total_xp` sits in.
pub fn level_progress(total_xp: u32) -> LevelProgress {
    let level = level_from_xp(total_xp);
    let current = total_xp - threshold_for_level(level);
    let required = xp_to_next_level(level);
    let percentage = ((current as u64 * 100 + required as u64 / 2) / required as u64).min(100);
    LevelProgress {
        current,
        required,
        percentage: percentage as u32,
    }
}

/// Outcome of adding XP to a running total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpGain {
    pub new_total: u32,
    pub old_level: u32,
    pub new_level: u32,
    pub did_level_up: bool,
}

/// Add `earned` XP to `total`, reporting any level crossing.
pub fn apply_gain(total: u32, earned: u32) -> XpGain {
    let old_level = level_from_xp(total);
    let new_total = total + earned;
    let new_level = level_from_xp(new_total);
    XpGain {
        new_total,
        old_level,
        new_level,
        did_level_up: new_level > old_level,
    }
}

/// Subtract `amount` XP from `total`, clamping at zero. The level is
/// recomputed from the new total; levels can go down, badges never do.
pub fn apply_loss(total: u32, amount: u32) -> (u32, u32) {
    let new_total = total.saturating_sub(amount);
    (new_total, level_from_xp(new_total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cost_schedule_is_linear() {
        assert_eq!(xp_to_next_level(1), 100);
        assert_eq!(xp_to_next_level(2), 140);
        assert_eq!(xp_to_next_level(3), 180);
        assert_eq!(xp_to_next_level(10), 460);
    }

    #[test]
    fn thresholds_accumulate_costs() {
        assert_eq!(threshold_for_level(1), 0);
        assert_eq!(threshold_for_level(2), 100);
        assert_eq!(threshold_for_level(3), 240);
        assert_eq!(threshold_for_level(4), 420);
    }

    #[test]
    fn level_boundaries_are_half_open() {
        assert_eq!(level_from_xp(0), 1);
        assert_eq!(level_from_xp(99), 1);
        assert_eq!(level_from_xp(100), 2);
        assert_eq!(level_from_xp(239), 2);
        assert_eq!(level_from_xp(240), 3);
    }

    #[test]
    fn progress_clamps_and_rounds() {
        let p = level_progress(0);
        assert_eq!((p.current, p.required, p.percentage), (0, 100, 0));

        let p = level_progress(150);
        assert_eq!((p.current, p.required), (50, 140));
        assert_eq!(p.percentage, 36);

        let p = level_progress(239);
        assert_eq!(p.percentage, 99);
    }

    #[test]
    fn gain_reports_level_crossing() {
        let gain = apply_gain(95, 10);
        assert!(gain.did_level_up);
        assert_eq!((gain.old_level, gain.new_level, gain.new_total), (1, 2, 105));

        let gain = apply_gain(95, 4);
        assert!(!gain.did_level_up);
    }

    #[test]
    fn loss_floors_at_zero() {
        assert_eq!(apply_loss(10, 25), (0, 1));
        assert_eq!(apply_loss(250, 10), (240, 3));
    }

    proptest! {
        #[test]
        fn threshold_roundtrips_through_level(level in 2u32..200) {
            prop_assert_eq!(level_from_xp(threshold_for_level(level)), level);
            prop_assert_eq!(level_from_xp(threshold_for_level(level) - 1), level - 1);
        }

        #[test]
        fn level_is_monotonic_in_xp(xp in 0u32..500_000) {
            prop_assert!(level_from_xp(xp + 1) >= level_from_xp(xp));
        }

        #[test]
        fn progress_stays_in_bounds(xp in 0u32..500_000) {
            let p = level_progress(xp);
            prop_assert!(p.current < p.required);
            prop_assert!(p.percentage <= 100);
        }
    }
}
