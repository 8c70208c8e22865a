//! Streak evaluation.
//!
//! A goal's streak counts consecutive periods with at least one qualifying
//! check-in. Evaluation is a pure function of the goal's streak fields and
//! the check-in date; persisting the outcome is the caller's job. That
//! keeps exactly one copy of the tie-break rules, shared by every consumer.
//!
//! Per check-in, exactly one of three things happens:
//!
//! - the period is already satisfied -> no effect (more check-ins in the
//!   same period, e.g. multiple tasks, never double-increment)
//! - the last satisfied period is the immediately previous one, or the
//!   goal has never been checked -> the streak grows
//! - anything else -> the streak resets to 1
//!
//! `best_streak` is monotonic non-decreasing on every path.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::period::{period_key, previous_period_key, Cadence};

/// Streak length that earns a freeze token, at every multiple.
pub const FREEZE_MILESTONE: u32 = 7;

/// What a check-in did to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakAction {
    /// Period already satisfied, nothing changed
    None,
    Increment,
    Reset,
}

/// Result of evaluating a check-in against a goal's streak state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakUpdate {
    pub action: StreakAction,
    /// Streak after the check-in
    pub streak: u32,
    /// Best streak after the check-in
    pub best_streak: u32,
    /// Period key of the check-in date; becomes the goal's
    /// `last_period_key` unless the action is `None`
    pub period_key: String,
    /// True when the new streak hit a positive multiple of
    /// [`FREEZE_MILESTONE`]
    pub freeze_token_earned: bool,
}

/// Evaluate a check-in on `date` against the goal's current streak state.
pub fn evaluate_checkin(
    cadence: Cadence,
    last_period_key: Option<&str>,
    current_streak: u32,
    best_streak: u32,
    date: NaiveDate,
) -> Result<StreakUpdate> {
    let current_key = period_key(cadence, date);

    if last_period_key == Some(current_key.as_str()) {
        return Ok(StreakUpdate {
            action: StreakAction::None,
            streak: current_streak,
            best_streak,
            period_key: current_key,
            freeze_token_earned: false,
        });
    }

    let previous_key = previous_period_key(cadence, &current_key)?;
    let (action, streak) = match last_period_key {
        None => (StreakAction::Increment, 1),
        Some(last) if last == previous_key => (StreakAction::Increment, current_streak + 1),
        Some(_) => (StreakAction::Reset, 1),
    };

    Ok(StreakUpdate {
        action,
        streak,
        best_streak: best_streak.max(streak),
        period_key: current_key,
        freeze_token_earned: streak > 0 && streak % FREEZE_MILESTONE == 0,
    })
}

/// Freeze eligibility for a goal at `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreezeEligibility {
    pub eligible: bool,
    /// The single skipped period a freeze would cover
    pub missed_period: Option<String>,
}

impl FreezeEligibility {
    fn ineligible() -> Self {
        Self {
            eligible: false,
            missed_period: None,
        }
    }
}

/// A freeze retroactively covers exactly one missed period: it applies
/// only when the goal's last satisfied period is two steps before the
/// period containing `date`. Zero gaps means nothing to cover; two or
/// more means the streak is already lost.
///
/// Using a freeze consumes a token and moves `last_period_key` onto the
/// missed period, so the next genuine check-in increments instead of
/// resetting. The streak counter itself does not move.
pub fn freeze_eligibility(
    cadence: Cadence,
    last_period_key: Option<&str>,
    freeze_tokens: u32,
    date: NaiveDate,
) -> Result<FreezeEligibility> {
    if freeze_tokens == 0 {
        return Ok(FreezeEligibility::ineligible());
    }

    let current_key = period_key(cadence, date);
    let previous_key = previous_period_key(cadence, &current_key)?;
    let two_before = previous_period_key(cadence, &previous_key)?;

    if last_period_key == Some(two_before.as_str()) {
        Ok(FreezeEligibility {
            eligible: true,
            missed_period: Some(previous_key),
        })
    } else {
        Ok(FreezeEligibility::ineligible())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn first_checkin_starts_streak() {
        let update = evaluate_checkin(Cadence::Daily, None, 0, 0, d("2024-03-01")).unwrap();
        assert_eq!(update.action, StreakAction::Increment);
        assert_eq!(update.streak, 1);
        assert_eq!(update.best_streak, 1);
        assert_eq!(update.period_key, "2024-03-01");
        assert!(!update.freeze_token_earned);
    }

    #[test]
    fn same_period_is_a_no_op() {
        let update =
            evaluate_checkin(Cadence::Daily, Some("2024-03-01"), 4, 9, d("2024-03-01")).unwrap();
        assert_eq!(update.action, StreakAction::None);
        assert_eq!(update.streak, 4);
        assert_eq!(update.best_streak, 9);
        assert!(!update.freeze_token_earned);
    }

    #[test]
    fn consecutive_period_increments() {
        let update =
            evaluate_checkin(Cadence::Daily, Some("2024-02-29"), 4, 4, d("2024-03-01")).unwrap();
        assert_eq!(update.action, StreakAction::Increment);
        assert_eq!(update.streak, 5);
        assert_eq!(update.best_streak, 5);
    }

    #[test]
    fn gap_resets_but_best_survives() {
        let update =
            evaluate_checkin(Cadence::Daily, Some("2024-02-27"), 4, 9, d("2024-03-01")).unwrap();
        assert_eq!(update.action, StreakAction::Reset);
        assert_eq!(update.streak, 1);
        assert_eq!(update.best_streak, 9);
        assert_eq!(update.period_key, "2024-03-01");
    }

    #[test]
    fn weekly_streak_increments_across_iso_year_boundary() {
        // 2024-W52 -> 2025-W01
        let update =
            evaluate_checkin(Cadence::Weekly, Some("2024-W52"), 3, 3, d("2024-12-30")).unwrap();
        assert_eq!(update.action, StreakAction::Increment);
        assert_eq!(update.streak, 4);
        assert_eq!(update.period_key, "2025-W01");
    }

    #[test]
    fn milestone_earns_freeze_token() {
        let update =
            evaluate_checkin(Cadence::Daily, Some("2024-02-29"), 6, 6, d("2024-03-01")).unwrap();
        assert_eq!(update.streak, 7);
        assert!(update.freeze_token_earned);

        let update =
            evaluate_checkin(Cadence::Daily, Some("2024-02-29"), 13, 13, d("2024-03-01")).unwrap();
        assert_eq!(update.streak, 14);
        assert!(update.freeze_token_earned);

        let update =
            evaluate_checkin(Cadence::Daily, Some("2024-02-29"), 7, 7, d("2024-03-01")).unwrap();
        assert_eq!(update.streak, 8);
        assert!(!update.freeze_token_earned);
    }

    #[test]
    fn freeze_requires_exactly_one_missed_period() {
        // Zero missed: last period is yesterday
        let e = freeze_eligibility(Cadence::Daily, Some("2024-02-29"), 2, d("2024-03-01")).unwrap();
        assert!(!e.eligible);

        // One missed: last period is two days back
        let e = freeze_eligibility(Cadence::Daily, Some("2024-02-28"), 2, d("2024-03-01")).unwrap();
        assert!(e.eligible);
        assert_eq!(e.missed_period.as_deref(), Some("2024-02-29"));

        // Two missed
        let e = freeze_eligibility(Cadence::Daily, Some("2024-02-27"), 2, d("2024-03-01")).unwrap();
        assert!(!e.eligible);
    }

    #[test]
    fn freeze_requires_a_token() {
        let e = freeze_eligibility(Cadence::Daily, Some("2024-02-28"), 0, d("2024-03-01")).unwrap();
        assert!(!e.eligible);
    }

    #[test]
    fn freeze_covers_weekly_year_rollover() {
        // Last satisfied 2024-W51, now in 2025-W01: exactly W52 missed
        let e = freeze_eligibility(Cadence::Weekly, Some("2024-W51"), 1, d("2024-12-30")).unwrap();
        assert!(e.eligible);
        assert_eq!(e.missed_period.as_deref(), Some("2024-W52"));
    }
}
