//! Goal and recurrence types.
//!
//! A goal repeats on a cadence and accumulates streak state as check-ins
//! land. The optional recurrence row narrows when and how often the goal
//! counts: weekly/monthly completion targets, a weekday eligibility mask,
//! and a due time used for display ordering.
//!
//! Streak fields are only ever mutated by the check-in engine and the
//! freeze operation. Goals are archived (soft), never deleted, so old
//! check-ins keep a valid parent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::period::Cadence;
use crate::xp::DEFAULT_XP_PER_CHECK;

/// A tracked goal with its streak state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub title: String,
    pub cadence: Cadence,
    /// Display color, `#RRGGBB`
    pub color: String,
    /// XP granted per check-in, snapshotted onto each checkin row
    pub xp_per_check: u32,
    pub archived: bool,
    pub current_streak: u32,
    pub best_streak: u32,
    /// Period key of the last period satisfied; `None` until the first
    /// ever check-in
    pub last_period_key: Option<String>,
    pub freeze_tokens: u32,
    pub created_at: DateTime<Utc>,
}

/// Optional targeting constraints attached 1:1 to a goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    pub goal_id: Uuid,
    /// Check-ins per week to count the week complete (1-7)
    pub weekly_target: Option<u32>,
    /// Check-ins per month to count the month complete (1-31)
    pub monthly_target: Option<u32>,
    /// 7-bit eligibility mask, bit i = weekday i (Monday = 0)
    pub weekdays_mask: Option<u8>,
    /// Minutes after midnight the goal is due, display only
    pub due_time_minutes: Option<u32>,
}

/// Whether `bit` (Monday = 0 .. Sunday = 6) is set in a weekdays mask.
pub fn weekday_active(mask: u8, bit: u8) -> bool {
    mask & (1 << bit) != 0
}

/// Build a weekdays mask from Monday-based day indexes.
pub fn weekdays_mask(days: &[u8]) -> u8 {
    days.iter().fold(0, |mask, day| mask | (1 << day))
}

/// A goal joined with its recurrence and active-task count, the shape the
/// read models and the check-in engine work with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalWithRecurrence {
    #[serde(flatten)]
    pub goal: Goal,
    pub recurrence: Option<Recurrence>,
    pub task_count: u32,
}

/// Recurrence fields as supplied at goal creation/update time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceSpec {
    pub weekly_target: Option<u32>,
    pub monthly_target: Option<u32>,
    pub weekdays_mask: Option<u8>,
    pub due_time_minutes: Option<u32>,
}

impl RecurrenceSpec {
    pub fn is_empty(&self) -> bool {
        self.weekly_target.is_none()
            && self.monthly_target.is_none()
            && self.weekdays_mask.is_none()
            && self.due_time_minutes.is_none()
    }
}

/// Input for creating a goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    pub title: String,
    pub cadence: Cadence,
    pub color: String,
    pub xp_per_check: Option<u32>,
    pub recurrence: Option<RecurrenceSpec>,
}

impl NewGoal {
    /// Validate the request. Weekly and monthly goals must carry their
    /// target; a missing target is rejected here, never defaulted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title, 100)?;
        validate_hex_color("color", &self.color)?;

        if let Some(xp) = self.xp_per_check {
            if !(1..=100).contains(&xp) {
                return Err(ValidationError::invalid_value(
                    "xpPerCheck",
                    "must be between 1 and 100",
                ));
            }
        }

        let recurrence = self.recurrence.as_ref();
        match self.cadence {
            Cadence::Weekly => match recurrence.and_then(|r| r.weekly_target) {
                Some(1..=7) => {}
                Some(_) => {
                    return Err(ValidationError::invalid_value(
                        "weeklyTarget",
                        "must be between 1 and 7",
                    ))
                }
                None => return Err(ValidationError::missing_target("weekly", "weeklyTarget")),
            },
            Cadence::Monthly => match recurrence.and_then(|r| r.monthly_target) {
                Some(1..=31) => {}
                Some(_) => {
                    return Err(ValidationError::invalid_value(
                        "monthlyTarget",
                        "must be between 1 and 31",
                    ))
                }
                None => return Err(ValidationError::missing_target("monthly", "monthlyTarget")),
            },
            Cadence::Daily => {}
        }

        if let Some(r) = recurrence {
            validate_recurrence_ranges(r)?;
        }
        Ok(())
    }
}

/// Partial update for a goal. `recurrence` replaces the whole row when
/// present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub color: Option<String>,
    pub xp_per_check: Option<u32>,
    pub recurrence: Option<RecurrenceSpec>,
}

impl GoalUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validate_title(title, 100)?;
        }
        if let Some(color) = &self.color {
            validate_hex_color("color", color)?;
        }
        if let Some(xp) = self.xp_per_check {
            if !(1..=100).contains(&xp) {
                return Err(ValidationError::invalid_value(
                    "xpPerCheck",
                    "must be between 1 and 100",
                ));
            }
        }
        if let Some(r) = &self.recurrence {
            validate_recurrence_ranges(r)?;
        }
        Ok(())
    }
}

fn validate_recurrence_ranges(r: &RecurrenceSpec) -> Result<(), ValidationError> {
    if let Some(t) = r.weekly_target {
        if !(1..=7).contains(&t) {
            return Err(ValidationError::invalid_value(
                "weeklyTarget",
                "must be between 1 and 7",
            ));
        }
    }
    if let Some(t) = r.monthly_target {
        if !(1..=31).contains(&t) {
            return Err(ValidationError::invalid_value(
                "monthlyTarget",
                "must be between 1 and 31",
            ));
        }
    }
    if let Some(mask) = r.weekdays_mask {
        if mask > 0b111_1111 {
            return Err(ValidationError::invalid_value(
                "weekdaysMask",
                "must fit in 7 bits",
            ));
        }
    }
    if let Some(due) = r.due_time_minutes {
        if due > 1439 {
            return Err(ValidationError::invalid_value(
                "dueTimeMinutes",
                "must be between 0 and 1439",
            ));
        }
    }
    Ok(())
}

pub(crate) fn validate_title(title: &str, max: usize) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::invalid_value("title", "must not be empty"));
    }
    if title.chars().count() > max {
        return Err(ValidationError::invalid_value(
            "title",
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_hex_color(field: &str, color: &str) -> Result<(), ValidationError> {
    let ok = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !ok {
        return Err(ValidationError::invalid_value(
            field,
            "must be a #RRGGBB hex color",
        ));
    }
    Ok(())
}

/// Effective XP value of a new goal.
pub fn xp_per_check_or_default(requested: Option<u32>) -> u32 {
    requested.unwrap_or(DEFAULT_XP_PER_CHECK)
}
