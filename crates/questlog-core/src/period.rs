//! Cadence-scoped calendar periods.
//!
//! Every goal repeats on a cadence (daily, weekly, monthly) and every
//! calendar date falls into exactly one period per cadence, identified by a
//! canonical string key:
//!
//! - daily:   `YYYY-MM-DD`
//! - weekly:  `YYYY-Www` (ISO-8601 week; week 1 holds the year's first
//!   Thursday, weeks run Monday through Sunday)
//! - monthly: `YYYY-MM`
//!
//! Streak evaluation only ever asks two questions about periods: "which
//! period does this date fall in?" and "is this key the period right before
//! that one?". Week/year rollovers (Dec 30 landing in next year's W01,
//! Jan 1 landing in the previous year's W52/W53) follow the ISO rule, not
//! calendar-year slicing.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Repetition granularity of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Daily,
    Weekly,
    Monthly,
}

impl Cadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
            Cadence::Monthly => "monthly",
        }
    }

    /// Parse a stored cadence string. Unknown values are an invariant
    /// violation: the set is closed and enforced at goal creation.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Cadence::Daily),
            "weekly" => Ok(Cadence::Weekly),
            "monthly" => Ok(Cadence::Monthly),
            other => Err(CoreError::invariant(format!("unknown cadence: {other}"))),
        }
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical period key for a date under a cadence.
pub fn period_key(cadence: Cadence, date: NaiveDate) -> String {
    match cadence {
        Cadence::Daily => date.format("%Y-%m-%d").to_string(),
        Cadence::Weekly => {
            let week = date.iso_week();
            format!("{:04}-W{:02}", week.year(), week.week())
        }
        Cadence::Monthly => date.format("%Y-%m").to_string(),
    }
}

/// Key of the period immediately before `key`.
///
/// Rolls year boundaries per cadence: the week before `2025-W01` is the
/// last ISO week of 2024 (W52 or W53 depending on the year), the month
/// before `2024-01` is `2023-12`.
pub fn previous_period_key(cadence: Cadence, key: &str) -> Result<String> {
    let anchor = period_anchor(cadence, key)?;
    let step = match cadence {
        Cadence::Daily => 1,
        Cadence::Weekly => 7,
        // One day before the first of the month lands in the previous month
        Cadence::Monthly => 1,
    };
    let prev = anchor
        .checked_sub_days(Days::new(step))
        .ok_or_else(|| CoreError::invariant(format!("period underflow before {key}")))?;
    Ok(period_key(cadence, prev))
}

/// ISO weekday index of a date: Monday = 0 .. Sunday = 6.
///
/// This is the bit position used against a recurrence's 7-bit weekdays
/// mask.
pub fn weekday_bit(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// Number of `previous_period_key` steps from `from` back to `to`.
///
/// Computed in closed form per cadence rather than by iterating keys, so
/// arbitrarily old `from` keys are exact. Returns `None` when `from` is
/// absent (goal never checked in) or lies after `to`.
pub fn period_distance(cadence: Cadence, from: Option<&str>, to: &str) -> Result<Option<u32>> {
    let Some(from) = from else {
        return Ok(None);
    };
    let from_anchor = period_anchor(cadence, from)?;
    let to_anchor = period_anchor(cadence, to)?;

    let steps = match cadence {
        Cadence::Daily => (to_anchor - from_anchor).num_days(),
        Cadence::Weekly => (to_anchor - from_anchor).num_days() / 7,
        Cadence::Monthly => {
            let months = |d: NaiveDate| d.year() as i64 * 12 + d.month0() as i64;
            months(to_anchor) - months(from_anchor)
        }
    };

    if steps < 0 {
        return Ok(None);
    }
    Ok(Some(steps as u32))
}

/// First and last calendar day of the period containing `date`.
pub fn period_bounds(cadence: Cadence, date: NaiveDate) -> (NaiveDate, NaiveDate) {
    match cadence {
        Cadence::Daily => (date, date),
        Cadence::Weekly => {
            let monday = date - chrono::Duration::days(weekday_bit(date) as i64);
            (monday, monday + chrono::Duration::days(6))
        }
        Cadence::Monthly => {
            let first = date.with_day(1).expect("day 1 exists in every month");
            let next_month = if first.month() == 12 {
                NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
            }
            .expect("first of month is always valid");
            (first, next_month - chrono::Duration::days(1))
        }
    }
}

/// Anchor date of a period key: the day itself (daily), the Monday
/// (weekly), or the first of the month (monthly).
pub(crate) fn period_anchor(cadence: Cadence, key: &str) -> Result<NaiveDate> {
    let malformed = || CoreError::invariant(format!("malformed {cadence} period key: {key}"));

    match cadence {
        Cadence::Daily => NaiveDate::parse_from_str(key, "%Y-%m-%d").map_err(|_| malformed()),
        Cadence::Weekly => {
            let (year, week) = key.split_once("-W").ok_or_else(malformed)?;
            let year: i32 = year.parse().map_err(|_| malformed())?;
            let week: u32 = week.parse().map_err(|_| malformed())?;
            NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(malformed)
        }
        Cadence::Monthly => {
            let (year, month) = key.split_once('-').ok_or_else(malformed)?;
            let year: i32 = year.parse().map_err(|_| malformed())?;
            let month: u32 = month.parse().map_err(|_| malformed())?;
            NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(malformed)
        }
    }
}
