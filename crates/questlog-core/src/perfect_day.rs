//! Perfect-day evaluation.
//!
//! A calendar day is perfect when every eligible daily goal received at
//! least one check-in (any task, or goal-level). Eligibility is decided
//! per goal and date; a day with no eligible goals is never perfect.
//!
//! The decision here is pure. The one-shot logging and bonus award against
//! the perfect-day log live in the check-in engine.

use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::goal::{weekday_active, GoalWithRecurrence};
use crate::period::{weekday_bit, Cadence};

/// Whether `goal` counts toward the perfect-day requirement on `date`.
///
/// Daily cadence, not archived, created on or before `date`, and (when a
/// weekdays mask is set) the date's weekday bit is in the mask.
pub fn is_goal_eligible(goal: &GoalWithRecurrence, date: NaiveDate) -> bool {
    if goal.goal.cadence != Cadence::Daily || goal.goal.archived {
        return false;
    }
    if goal.goal.created_at.date_naive() > date {
        return false;
    }
    match goal.recurrence.as_ref().and_then(|r| r.weekdays_mask) {
        Some(mask) => weekday_active(mask, weekday_bit(date)),
        None => true,
    }
}

/// Whether `date` is perfect given all goals and the set of goal ids with
/// at least one check-in on that date.
pub fn evaluate(
    goals: &[GoalWithRecurrence],
    checked_goal_ids: &HashSet<Uuid>,
    date: NaiveDate,
) -> bool {
    let mut any_eligible = false;
    for goal in goals.iter().filter(|g| is_goal_eligible(g, date)) {
        any_eligible = true;
        if !checked_goal_ids.contains(&goal.goal.id) {
            return false;
        }
    }
    any_eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{weekdays_mask, Goal, Recurrence};
    use chrono::{TimeZone, Utc};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn goal(cadence: Cadence, archived: bool, mask: Option<u8>) -> GoalWithRecurrence {
        let id = Uuid::new_v4();
        GoalWithRecurrence {
            goal: Goal {
                id,
                title: "Goal".to_string(),
                cadence,
                color: "#22C55E".to_string(),
                xp_per_check: 10,
                archived,
                current_streak: 0,
                best_streak: 0,
                last_period_key: None,
                freeze_tokens: 0,
                created_at: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
            },
            recurrence: mask.map(|m| Recurrence {
                goal_id: id,
                weekly_target: None,
                monthly_target: None,
                weekdays_mask: Some(m),
                due_time_minutes: None,
            }),
            task_count: 0,
        }
    }

    #[test]
    fn no_eligible_goals_is_never_perfect() {
        assert!(!evaluate(&[], &HashSet::new(), d("2024-03-01")));

        let weekly = goal(Cadence::Weekly, false, None);
        assert!(!evaluate(
            &[weekly],
            &HashSet::new(),
            d("2024-03-01")
        ));
    }

    #[test]
    fn all_eligible_checked_is_perfect() {
        let a = goal(Cadence::Daily, false, None);
        let b = goal(Cadence::Daily, false, None);
        let mut checked = HashSet::from([a.goal.id]);
        let goals = vec![a, b];

        assert!(!evaluate(&goals, &checked, d("2024-03-01")));

        checked.insert(goals[1].goal.id);
        assert!(evaluate(&goals, &checked, d("2024-03-01")));
    }

    #[test]
    fn archived_and_future_goals_do_not_count() {
        let archived = goal(Cadence::Daily, true, None);
        let active = goal(Cadence::Daily, false, None);
        let checked = HashSet::from([active.goal.id]);
        assert!(evaluate(&[archived, active], &checked, d("2024-03-01")));

        let late = goal(Cadence::Daily, false, None);
        // Created 2024-01-01: not eligible for 2023 dates
        assert!(!is_goal_eligible(&late, d("2023-12-31")));
    }

    #[test]
    fn weekday_mask_limits_eligibility() {
        // Mon/Wed/Fri only
        let masked = goal(Cadence::Daily, false, Some(weekdays_mask(&[0, 2, 4])));
        assert!(is_goal_eligible(&masked, d("2024-03-04"))); // Monday
        assert!(!is_goal_eligible(&masked, d("2024-03-05"))); // Tuesday

        // A Tuesday with only the masked goal: no eligible set, not perfect
        assert!(!evaluate(
            &[masked],
            &HashSet::new(),
            d("2024-03-05")
        ));
    }
}
