//! Repository contract between the engines and the backing store.
//!
//! Everything stateful the check-in engine and the read models touch goes
//! through this trait, so the SQLite store can be swapped for an
//! in-memory one in tests. Methods are mechanical reads and writes; all
//! decision logic stays in the engine modules.
//!
//! `with_transaction` is the atomicity boundary of spec'd operations: a
//! check-in either applies every step (row insert, XP, streak, perfect
//! day, badges) or none of them.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::badge::{Badge, BadgeKey};
use crate::checkin::Checkin;
use crate::error::Result;
use crate::goal::{Goal, GoalWithRecurrence, RecurrenceSpec};
use crate::profile::{Profile, ProfileSettings};
use crate::task::Task;

/// Per-day check-in aggregate used by the review read model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAggregate {
    pub date: NaiveDate,
    pub xp: u32,
    pub checkins: u32,
}

/// A goal ranked by current streak for review highlights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakHighlight {
    pub goal_id: Uuid,
    pub goal_title: String,
    pub current_streak: u32,
}

/// Storage operations required by the engines and read models.
pub trait Repository {
    // --- goals ---

    /// Fetch a goal with its recurrence and active-task count. NotFound
    /// if absent.
    fn goal(&self, id: Uuid) -> Result<GoalWithRecurrence>;

    /// All goals with the given archived flag, oldest first.
    fn goals(&self, archived: bool) -> Result<Vec<GoalWithRecurrence>>;

    fn active_goal_count(&self) -> Result<u32>;

    fn insert_goal(&self, goal: &Goal, recurrence: Option<&RecurrenceSpec>) -> Result<()>;

    /// Full-row update of the goal's mutable metadata (title, color,
    /// xp_per_check). Streak fields have their own writes below.
    fn update_goal(&self, goal: &Goal) -> Result<()>;

    /// Replace (or create) the goal's recurrence row.
    fn upsert_recurrence(&self, goal_id: Uuid, spec: &RecurrenceSpec) -> Result<()>;

    fn set_goal_archived(&self, goal_id: Uuid, archived: bool) -> Result<()>;

    /// Persist a streak transition: counters plus the new last period.
    fn update_goal_streak(
        &self,
        goal_id: Uuid,
        current_streak: u32,
        best_streak: u32,
        last_period_key: &str,
    ) -> Result<()>;

    /// Grant `count` freeze tokens to one goal.
    fn add_freeze_tokens(&self, goal_id: Uuid, count: u32) -> Result<()>;

    /// Grant one freeze token to every non-archived goal (level-up
    /// reward).
    fn grant_freeze_token_to_active_goals(&self) -> Result<()>;

    /// Spend one freeze token and move `last_period_key` onto the covered
    /// period.
    fn consume_freeze(&self, goal_id: Uuid, missed_period: &str) -> Result<()>;

    // --- tasks ---

    /// Fetch a task scoped to its goal. NotFound if absent or owned by a
    /// different goal.
    fn task(&self, goal_id: Uuid, task_id: Uuid) -> Result<Task>;

    /// Active tasks of a goal ordered by `order_index`.
    fn active_tasks(&self, goal_id: Uuid) -> Result<Vec<Task>>;

    fn insert_task(&self, task: &Task) -> Result<()>;

    fn update_task(&self, task: &Task) -> Result<()>;

    /// Next dense order index for a new task under `goal_id`.
    fn next_task_order_index(&self, goal_id: Uuid) -> Result<u32>;

    /// Re-index the goal's active tasks to match `task_ids` (dense, zero
    /// based). Ids not belonging to the goal are NotFound.
    fn reorder_tasks(&self, goal_id: Uuid, task_ids: &[Uuid]) -> Result<()>;

    // --- checkins ---

    /// The checkin for the idempotency key (goal, task-or-none, date).
    fn checkin_for_key(
        &self,
        goal_id: Uuid,
        task_id: Option<Uuid>,
        date: NaiveDate,
    ) -> Result<Option<Checkin>>;

    fn checkins_for_goal_on(&self, goal_id: Uuid, date: NaiveDate) -> Result<Vec<Checkin>>;

    fn checkins_for_goal_in(
        &self,
        goal_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Checkin>>;

    /// Ids of goals with at least one checkin on `date`.
    fn goal_ids_checked_on(&self, date: NaiveDate) -> Result<HashSet<Uuid>>;

    fn total_checkin_count(&self) -> Result<u64>;

    fn insert_checkin(&self, checkin: &Checkin) -> Result<()>;

    /// Hard delete. NotFound if the row is already gone.
    fn delete_checkin(&self, id: Uuid) -> Result<()>;

    /// Per-day XP and checkin-count sums over an inclusive range; days
    /// without checkins are omitted.
    fn checkin_aggregates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DayAggregate>>;

    // --- profile ---

    fn profile(&self) -> Result<Profile>;

    fn update_profile_xp(&self, xp_total: u32, level: u32) -> Result<()>;

    fn increment_perfect_days(&self) -> Result<u32>;

    fn update_profile_settings(&self, settings: &ProfileSettings) -> Result<()>;

    // --- badges ---

    fn badges(&self) -> Result<Vec<Badge>>;

    fn unlocked_badge_keys(&self) -> Result<HashSet<BadgeKey>>;

    fn badges_unlocked_since(&self, since: DateTime<Utc>) -> Result<Vec<Badge>>;

    fn unlock_badge(&self, key: BadgeKey, at: DateTime<Utc>) -> Result<()>;

    // --- perfect-day log ---

    fn is_perfect_day_logged(&self, date: NaiveDate) -> Result<bool>;

    fn log_perfect_day(&self, date: NaiveDate, achieved_at: DateTime<Utc>) -> Result<()>;

    /// Logged perfect days within an inclusive range, ascending.
    fn perfect_days_in(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>>;

    // --- goals ranked for review ---

    fn top_streak_goals(&self, limit: u32) -> Result<Vec<StreakHighlight>>;

    // --- transactions ---

    /// Run `f` as one atomic unit. The default is a pass-through for
    /// stores without transactions; the SQLite store overrides it.
    fn with_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T>
    where
        Self: Sized,
    {
        f(self)
    }
}
