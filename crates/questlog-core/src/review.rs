//! Read-model compositions: the today view and period reviews.
//!
//! Built entirely from repository reads plus the pure engines; nothing in
//! here writes. The service layer serializes these structs as-is.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::badge::Badge;
use crate::checkin::Checkin;
use crate::error::Result;
use crate::goal::GoalWithRecurrence;
use crate::perfect_day;
use crate::period::{self, Cadence};
use crate::profile::Profile;
use crate::repo::{Repository, StreakHighlight};
use crate::task::Task;

/// How many goals the review highlights rank.
const HIGHLIGHT_LIMIT: u32 = 5;

/// Hours a badge counts as "recent" in the today view.
const RECENT_BADGE_HOURS: i64 = 24;

/// Completion progress of a goal within the period containing the viewed
/// date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodProgress {
    /// Check-ins recorded in the period so far
    pub current: u32,
    /// Active task count (task mode), else the cadence target, else 1
    pub target: u32,
    pub completed: bool,
}

/// One goal's slice of the today view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayGoal {
    pub goal: GoalWithRecurrence,
    pub tasks: Vec<Task>,
    /// Check-ins on the viewed date itself
    pub checkins: Vec<Checkin>,
    pub period_progress: PeriodProgress,
}

/// Everything the main screen needs for one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayView {
    pub date: NaiveDate,
    pub profile: Profile,
    pub goals: Vec<TodayGoal>,
    pub is_perfect_day: bool,
    pub recent_badges: Vec<Badge>,
}

/// Compose the today view for `date` over all non-archived goals.
pub fn today_view<R: Repository>(repo: &R, date: NaiveDate) -> Result<TodayView> {
    let goals = repo.goals(false)?;
    let checked = repo.goal_ids_checked_on(date)?;
    let is_perfect_day = perfect_day::evaluate(&goals, &checked, date);

    let mut today_goals = Vec::with_capacity(goals.len());
    for goal in goals {
        let tasks = repo.active_tasks(goal.goal.id)?;
        let checkins = repo.checkins_for_goal_on(goal.goal.id, date)?;

        let current = match goal.goal.cadence {
            Cadence::Daily => checkins.len() as u32,
            Cadence::Weekly | Cadence::Monthly => {
                let (start, end) = period::period_bounds(goal.goal.cadence, date);
                repo.checkins_for_goal_in(goal.goal.id, start, end)?.len() as u32
            }
        };
        let target = period_target(&goal, tasks.len() as u32);

        today_goals.push(TodayGoal {
            period_progress: PeriodProgress {
                current,
                target,
                completed: current >= target,
            },
            goal,
            tasks,
            checkins,
        });
    }

    let since = Utc::now() - Duration::hours(RECENT_BADGE_HOURS);
    Ok(TodayView {
        date,
        profile: repo.profile()?,
        goals: today_goals,
        is_perfect_day,
        recent_badges: repo.badges_unlocked_since(since)?,
    })
}

/// Period target for a goal: active tasks win over cadence targets.
fn period_target(goal: &GoalWithRecurrence, active_tasks: u32) -> u32 {
    if active_tasks > 0 {
        return active_tasks;
    }
    let recurrence = goal.recurrence.as_ref();
    let cadence_target = match goal.goal.cadence {
        Cadence::Weekly => recurrence.and_then(|r| r.weekly_target),
        Cadence::Monthly => recurrence.and_then(|r| r.monthly_target),
        Cadence::Daily => None,
    };
    cadence_target.unwrap_or(1)
}

/// One day of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDay {
    pub date: NaiveDate,
    pub xp_earned: u32,
    pub checkins_count: u32,
    pub is_perfect_day: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTotals {
    pub xp: u32,
    pub checkins: u32,
    pub perfect_days: u32,
}

/// Aggregated review over an inclusive date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: Vec<ReviewDay>,
    pub totals: ReviewTotals,
    pub streak_highlights: Vec<StreakHighlight>,
}

/// Review of the seven days starting at `start`.
pub fn weekly_review<R: Repository>(repo: &R, start: NaiveDate) -> Result<Review> {
    review_range(repo, start, start + Duration::days(6))
}

/// Review of the calendar month identified by a `YYYY-MM` key.
pub fn monthly_review<R: Repository>(repo: &R, month: &str) -> Result<Review> {
    let anchor = period::period_anchor(Cadence::Monthly, month)?;
    let (start, end) = period::period_bounds(Cadence::Monthly, anchor);
    review_range(repo, start, end)
}

fn review_range<R: Repository>(repo: &R, start: NaiveDate, end: NaiveDate) -> Result<Review> {
    let aggregates = repo.checkin_aggregates(start, end)?;
    let perfect: std::collections::HashSet<NaiveDate> =
        repo.perfect_days_in(start, end)?.into_iter().collect();

    let mut days = Vec::new();
    let mut totals = ReviewTotals::default();
    for date in start.iter_days().take_while(|d| *d <= end) {
        let agg = aggregates.iter().find(|a| a.date == date);
        let day = ReviewDay {
            date,
            xp_earned: agg.map_or(0, |a| a.xp),
            checkins_count: agg.map_or(0, |a| a.checkins),
            is_perfect_day: perfect.contains(&date),
        };
        totals.xp += day.xp_earned;
        totals.checkins += day.checkins_count;
        totals.perfect_days += u32::from(day.is_perfect_day);
        days.push(day);
    }

    Ok(Review {
        start_date: start,
        end_date: end,
        days,
        totals,
        streak_highlights: repo.top_streak_goals(HIGHLIGHT_LIMIT)?,
    })
}
