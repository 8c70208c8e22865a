//! SQLite-backed store implementing the repository contract.
//!
//! One connection, one writer. Multi-step flows are wrapped by
//! `with_transaction`, so either every write of a check-in lands or none
//! do; the unique index on `(goal_id, COALESCE(task_id, ''), date)`
//! backs the idempotency check even under a racing duplicate insert.
//!
//! Dates are stored as `YYYY-MM-DD` text, timestamps as RFC 3339 text,
//! ids as UUID text.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::migrations;
use crate::badge::{Badge, BadgeKey};
use crate::checkin::Checkin;
use crate::error::{CoreError, DatabaseError, Result};
use crate::goal::{Goal, GoalWithRecurrence, Recurrence, RecurrenceSpec};
use crate::period::Cadence;
use crate::profile::{Profile, ProfileSettings, Theme};
use crate::repo::{DayAggregate, Repository, StreakHighlight};
use crate::task::Task;

const GOAL_SELECT: &str = "
    SELECT g.id, g.title, g.cadence, g.color, g.xp_per_check, g.archived,
           g.current_streak, g.best_streak, g.last_period_key, g.freeze_tokens,
           g.created_at,
           r.weekly_target, r.monthly_target, r.weekdays_mask, r.due_time_minutes,
           (SELECT COUNT(*) FROM tasks t WHERE t.goal_id = g.id AND t.active = 1)
    FROM goals g
    LEFT JOIN recurrence r ON r.goal_id = g.id";

const TASK_SELECT: &str =
    "SELECT id, goal_id, title, notes, active, order_index, created_at FROM tasks";

const CHECKIN_SELECT: &str =
    "SELECT id, goal_id, task_id, date, xp_earned, created_at FROM checkins";

/// SQLite database holding goals, tasks, checkins, the profile, badges,
/// and the perfect-day log.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Open the database at `<data_dir>/questlog.db`.
    ///
    /// Creates the file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = super::data_dir()?.join("questlog.db");
        Self::open_at(&path)
    }

    /// Open (and migrate) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::setup(conn, path.to_path_buf())
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::setup(conn, PathBuf::from(":memory:"))
    }

    fn setup(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(DatabaseError::from)?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn, path })
    }

    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Path this database was opened at.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// === Row helpers ===

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn get_uuid(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_err(idx, e))
}

fn get_uuid_opt(row: &Row, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Uuid::parse_str(&s).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn get_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_err(idx, e))
}

fn get_datetime(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn get_datetime_opt(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_err(idx, e))
    })
    .transpose()
}

fn date_str(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn row_to_goal(row: &Row) -> rusqlite::Result<GoalWithRecurrence> {
    let cadence_str: String = row.get(2)?;
    let cadence = Cadence::parse(&cadence_str).map_err(|e| conversion_err(2, e))?;
    let goal_id = get_uuid(row, 0)?;

    let weekly_target: Option<u32> = row.get(11)?;
    let monthly_target: Option<u32> = row.get(12)?;
    let weekdays_mask: Option<u8> = row.get(13)?;
    let due_time_minutes: Option<u32> = row.get(14)?;
    let has_recurrence = weekly_target.is_some()
        || monthly_target.is_some()
        || weekdays_mask.is_some()
        || due_time_minutes.is_some();

    Ok(GoalWithRecurrence {
        goal: Goal {
            id: goal_id,
            title: row.get(1)?,
            cadence,
            color: row.get(3)?,
            xp_per_check: row.get(4)?,
            archived: row.get(5)?,
            current_streak: row.get(6)?,
            best_streak: row.get(7)?,
            last_period_key: row.get(8)?,
            freeze_tokens: row.get(9)?,
            created_at: get_datetime(row, 10)?,
        },
        recurrence: has_recurrence.then_some(Recurrence {
            goal_id,
            weekly_target,
            monthly_target,
            weekdays_mask,
            due_time_minutes,
        }),
        task_count: row.get(15)?,
    })
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: get_uuid(row, 0)?,
        goal_id: get_uuid(row, 1)?,
        title: row.get(2)?,
        notes: row.get(3)?,
        active: row.get(4)?,
        order_index: row.get(5)?,
        created_at: get_datetime(row, 6)?,
    })
}

fn row_to_checkin(row: &Row) -> rusqlite::Result<Checkin> {
    Ok(Checkin {
        id: get_uuid(row, 0)?,
        goal_id: get_uuid(row, 1)?,
        task_id: get_uuid_opt(row, 2)?,
        date: get_date(row, 3)?,
        xp_earned: row.get(4)?,
        created_at: get_datetime(row, 5)?,
    })
}

fn row_to_badge(row: &Row) -> rusqlite::Result<Badge> {
    let key_str: String = row.get(0)?;
    let key = BadgeKey::parse(&key_str).map_err(|e| conversion_err(0, e))?;
    Ok(Badge {
        key,
        title: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        unlocked_at: get_datetime_opt(row, 4)?,
    })
}

impl Repository for Database {
    fn goal(&self, id: Uuid) -> Result<GoalWithRecurrence> {
        let sql = format!("{GOAL_SELECT} WHERE g.id = ?1");
        self.conn
            .query_row(&sql, params![id.to_string()], row_to_goal)
            .optional()?
            .ok_or_else(|| CoreError::not_found("goal"))
    }

    fn goals(&self, archived: bool) -> Result<Vec<GoalWithRecurrence>> {
        let sql = format!("{GOAL_SELECT} WHERE g.archived = ?1 ORDER BY g.created_at ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let goals = stmt
            .query_map(params![archived], row_to_goal)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(goals)
    }

    fn active_goal_count(&self) -> Result<u32> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM goals WHERE archived = 0", [], |row| {
                row.get(0)
            })?)
    }

    fn insert_goal(&self, goal: &Goal, recurrence: Option<&RecurrenceSpec>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO goals (id, title, cadence, color, xp_per_check, archived,
                                current_streak, best_streak, last_period_key,
                                freeze_tokens, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                goal.id.to_string(),
                goal.title,
                goal.cadence.as_str(),
                goal.color,
                goal.xp_per_check,
                goal.archived,
                goal.current_streak,
                goal.best_streak,
                goal.last_period_key,
                goal.freeze_tokens,
                goal.created_at.to_rfc3339(),
            ],
        )?;
        if let Some(spec) = recurrence {
            self.upsert_recurrence(goal.id, spec)?;
        }
        Ok(())
    }

    fn update_goal(&self, goal: &Goal) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE goals SET title = ?1, color = ?2, xp_per_check = ?3 WHERE id = ?4",
            params![goal.title, goal.color, goal.xp_per_check, goal.id.to_string()],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("goal"));
        }
        Ok(())
    }

    fn upsert_recurrence(&self, goal_id: Uuid, spec: &RecurrenceSpec) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO recurrence
                 (goal_id, weekly_target, monthly_target, weekdays_mask, due_time_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                goal_id.to_string(),
                spec.weekly_target,
                spec.monthly_target,
                spec.weekdays_mask,
                spec.due_time_minutes,
            ],
        )?;
        Ok(())
    }

    fn set_goal_archived(&self, goal_id: Uuid, archived: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE goals SET archived = ?1 WHERE id = ?2",
            params![archived, goal_id.to_string()],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("goal"));
        }
        Ok(())
    }

    fn update_goal_streak(
        &self,
        goal_id: Uuid,
        current_streak: u32,
        best_streak: u32,
        last_period_key: &str,
    ) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE goals
             SET current_streak = ?1, best_streak = ?2, last_period_key = ?3
             WHERE id = ?4",
            params![current_streak, best_streak, last_period_key, goal_id.to_string()],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("goal"));
        }
        Ok(())
    }

    fn add_freeze_tokens(&self, goal_id: Uuid, count: u32) -> Result<()> {
        self.conn.execute(
            "UPDATE goals SET freeze_tokens = freeze_tokens + ?1 WHERE id = ?2",
            params![count, goal_id.to_string()],
        )?;
        Ok(())
    }

    fn grant_freeze_token_to_active_goals(&self) -> Result<()> {
        self.conn.execute(
            "UPDATE goals SET freeze_tokens = freeze_tokens + 1 WHERE archived = 0",
            [],
        )?;
        Ok(())
    }

    fn consume_freeze(&self, goal_id: Uuid, missed_period: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE goals
             SET freeze_tokens = freeze_tokens - 1, last_period_key = ?1
             WHERE id = ?2 AND freeze_tokens > 0",
            params![missed_period, goal_id.to_string()],
        )?;
        if changed == 0 {
            return Err(CoreError::invariant(format!(
                "freeze consumed without a token on goal {goal_id}"
            )));
        }
        Ok(())
    }

    fn task(&self, goal_id: Uuid, task_id: Uuid) -> Result<Task> {
        let sql = format!("{TASK_SELECT} WHERE id = ?1 AND goal_id = ?2");
        self.conn
            .query_row(
                &sql,
                params![task_id.to_string(), goal_id.to_string()],
                row_to_task,
            )
            .optional()?
            .ok_or_else(|| CoreError::not_found("task"))
    }

    fn active_tasks(&self, goal_id: Uuid) -> Result<Vec<Task>> {
        let sql = format!("{TASK_SELECT} WHERE goal_id = ?1 AND active = 1 ORDER BY order_index ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![goal_id.to_string()], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    fn insert_task(&self, task: &Task) -> Result<()> {
        self.conn.execute(
            "INSERT INTO tasks (id, goal_id, title, notes, active, order_index, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.id.to_string(),
                task.goal_id.to_string(),
                task.title,
                task.notes,
                task.active,
                task.order_index,
                task.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET title = ?1, notes = ?2, active = ?3, order_index = ?4
             WHERE id = ?5 AND goal_id = ?6",
            params![
                task.title,
                task.notes,
                task.active,
                task.order_index,
                task.id.to_string(),
                task.goal_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("task"));
        }
        Ok(())
    }

    fn next_task_order_index(&self, goal_id: Uuid) -> Result<u32> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(MAX(order_index) + 1, 0) FROM tasks WHERE goal_id = ?1",
            params![goal_id.to_string()],
            |row| row.get(0),
        )?)
    }

    fn reorder_tasks(&self, goal_id: Uuid, task_ids: &[Uuid]) -> Result<()> {
        for (index, task_id) in task_ids.iter().enumerate() {
            let changed = self.conn.execute(
                "UPDATE tasks SET order_index = ?1
                 WHERE id = ?2 AND goal_id = ?3 AND active = 1",
                params![index as u32, task_id.to_string(), goal_id.to_string()],
            )?;
            if changed == 0 {
                return Err(CoreError::not_found("task"));
            }
        }
        Ok(())
    }

    fn checkin_for_key(
        &self,
        goal_id: Uuid,
        task_id: Option<Uuid>,
        date: NaiveDate,
    ) -> Result<Option<Checkin>> {
        let result = match task_id {
            Some(task_id) => {
                let sql = format!("{CHECKIN_SELECT} WHERE goal_id = ?1 AND task_id = ?2 AND date = ?3");
                self.conn
                    .query_row(
                        &sql,
                        params![goal_id.to_string(), task_id.to_string(), date_str(date)],
                        row_to_checkin,
                    )
                    .optional()?
            }
            None => {
                let sql = format!("{CHECKIN_SELECT} WHERE goal_id = ?1 AND task_id IS NULL AND date = ?2");
                self.conn
                    .query_row(
                        &sql,
                        params![goal_id.to_string(), date_str(date)],
                        row_to_checkin,
                    )
                    .optional()?
            }
        };
        Ok(result)
    }

    fn checkins_for_goal_on(&self, goal_id: Uuid, date: NaiveDate) -> Result<Vec<Checkin>> {
        let sql = format!("{CHECKIN_SELECT} WHERE goal_id = ?1 AND date = ?2 ORDER BY created_at");
        let mut stmt = self.conn.prepare(&sql)?;
        let checkins = stmt
            .query_map(params![goal_id.to_string(), date_str(date)], row_to_checkin)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(checkins)
    }

    fn checkins_for_goal_in(
        &self,
        goal_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Checkin>> {
        let sql = format!(
            "{CHECKIN_SELECT} WHERE goal_id = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let checkins = stmt
            .query_map(
                params![goal_id.to_string(), date_str(start), date_str(end)],
                row_to_checkin,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(checkins)
    }

    fn goal_ids_checked_on(&self, date: NaiveDate) -> Result<HashSet<Uuid>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT goal_id FROM checkins WHERE date = ?1")?;
        let ids = stmt
            .query_map(params![date_str(date)], |row| get_uuid(row, 0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(ids)
    }

    fn total_checkin_count(&self) -> Result<u64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM checkins", [], |row| row.get(0))?)
    }

    fn insert_checkin(&self, checkin: &Checkin) -> Result<()> {
        self.conn.execute(
            "INSERT INTO checkins (id, goal_id, task_id, date, xp_earned, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                checkin.id.to_string(),
                checkin.goal_id.to_string(),
                checkin.task_id.map(|id| id.to_string()),
                date_str(checkin.date),
                checkin.xp_earned,
                checkin.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete_checkin(&self, id: Uuid) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM checkins WHERE id = ?1",
            params![id.to_string()],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("checkin"));
        }
        Ok(())
    }

    fn checkin_aggregates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DayAggregate>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, COALESCE(SUM(xp_earned), 0), COUNT(*)
             FROM checkins
             WHERE date >= ?1 AND date <= ?2
             GROUP BY date
             ORDER BY date",
        )?;
        let aggregates = stmt
            .query_map(params![date_str(start), date_str(end)], |row| {
                Ok(DayAggregate {
                    date: get_date(row, 0)?,
                    xp: row.get(1)?,
                    checkins: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(aggregates)
    }

    fn profile(&self) -> Result<Profile> {
        let (xp_total, level, perfect_days, theme, accent) = self.conn.query_row(
            "SELECT xp_total, level, perfect_days, theme, accent FROM profile WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )?;
        Ok(Profile {
            xp_total,
            level,
            perfect_days,
            theme: Theme::parse(&theme)
                .map_err(|_| CoreError::invariant(format!("unknown theme in profile: {theme}")))?,
            accent,
        })
    }

    fn update_profile_xp(&self, xp_total: u32, level: u32) -> Result<()> {
        self.conn.execute(
            "UPDATE profile SET xp_total = ?1, level = ?2 WHERE id = 1",
            params![xp_total, level],
        )?;
        Ok(())
    }

    fn increment_perfect_days(&self) -> Result<u32> {
        self.conn.execute(
            "UPDATE profile SET perfect_days = perfect_days + 1 WHERE id = 1",
            [],
        )?;
        Ok(self
            .conn
            .query_row("SELECT perfect_days FROM profile WHERE id = 1", [], |row| {
                row.get(0)
            })?)
    }

    fn update_profile_settings(&self, settings: &ProfileSettings) -> Result<()> {
        if let Some(theme) = settings.theme {
            self.conn.execute(
                "UPDATE profile SET theme = ?1 WHERE id = 1",
                params![theme.as_str()],
            )?;
        }
        if let Some(accent) = &settings.accent {
            self.conn.execute(
                "UPDATE profile SET accent = ?1 WHERE id = 1",
                params![accent],
            )?;
        }
        Ok(())
    }

    fn badges(&self) -> Result<Vec<Badge>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, title, description, icon, unlocked_at FROM badges ORDER BY rowid",
        )?;
        let badges = stmt
            .query_map([], row_to_badge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(badges)
    }

    fn unlocked_badge_keys(&self) -> Result<HashSet<BadgeKey>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM badges WHERE unlocked_at IS NOT NULL")?;
        let keys = stmt
            .query_map([], |row| {
                let raw: String = row.get(0)?;
                BadgeKey::parse(&raw).map_err(|e| conversion_err(0, e))
            })?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(keys)
    }

    fn badges_unlocked_since(&self, since: DateTime<Utc>) -> Result<Vec<Badge>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, title, description, icon, unlocked_at FROM badges
             WHERE unlocked_at IS NOT NULL AND unlocked_at >= ?1
             ORDER BY unlocked_at DESC",
        )?;
        let badges = stmt
            .query_map(params![since.to_rfc3339()], row_to_badge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(badges)
    }

    fn unlock_badge(&self, key: BadgeKey, at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE badges SET unlocked_at = ?1 WHERE key = ?2 AND unlocked_at IS NULL",
            params![at.to_rfc3339(), key.as_str()],
        )?;
        Ok(())
    }

    fn is_perfect_day_logged(&self, date: NaiveDate) -> Result<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM perfect_days_log WHERE date = ?1)",
            params![date_str(date)],
            |row| row.get(0),
        )?)
    }

    fn log_perfect_day(&self, date: NaiveDate, achieved_at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO perfect_days_log (date, achieved_at) VALUES (?1, ?2)",
            params![date_str(date), achieved_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn perfect_days_in(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare(
            "SELECT date FROM perfect_days_log WHERE date >= ?1 AND date <= ?2 ORDER BY date",
        )?;
        let dates = stmt
            .query_map(params![date_str(start), date_str(end)], |row| {
                get_date(row, 0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(dates)
    }

    fn top_streak_goals(&self, limit: u32) -> Result<Vec<StreakHighlight>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, current_streak
             FROM goals
             WHERE archived = 0 AND current_streak > 0
             ORDER BY current_streak DESC
             LIMIT ?1",
        )?;
        let highlights = stmt
            .query_map(params![limit], |row| {
                Ok(StreakHighlight {
                    goal_id: get_uuid(row, 0)?,
                    goal_title: row.get(1)?,
                    current_streak: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(highlights)
    }

    fn with_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(DatabaseError::from)?;
        match f(self) {
            Ok(value) => {
                tx.commit().map_err(DatabaseError::from)?;
                Ok(value)
            }
            // Dropping the transaction rolls back every write of `f`
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xp::DEFAULT_XP_PER_CHECK;

    fn make_goal(cadence: Cadence) -> Goal {
        Goal {
            id: Uuid::new_v4(),
            title: "Practice guitar".to_string(),
            cadence,
            color: "#F59E0B".to_string(),
            xp_per_check: DEFAULT_XP_PER_CHECK,
            archived: false,
            current_streak: 0,
            best_streak: 0,
            last_period_key: None,
            freeze_tokens: 0,
            created_at: Utc::now(),
        }
    }

    fn make_checkin(goal_id: Uuid, task_id: Option<Uuid>, date: &str) -> Checkin {
        Checkin {
            id: Uuid::new_v4(),
            goal_id,
            task_id,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            xp_earned: 10,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn goal_roundtrip_with_recurrence() {
        let db = Database::open_memory().unwrap();
        let goal = make_goal(Cadence::Weekly);
        let spec = RecurrenceSpec {
            weekly_target: Some(3),
            ..Default::default()
        };
        db.insert_goal(&goal, Some(&spec)).unwrap();

        let fetched = db.goal(goal.id).unwrap();
        assert_eq!(fetched.goal.title, goal.title);
        assert_eq!(fetched.goal.cadence, Cadence::Weekly);
        assert_eq!(fetched.recurrence.unwrap().weekly_target, Some(3));
        assert_eq!(fetched.task_count, 0);

        assert!(matches!(
            db.goal(Uuid::new_v4()),
            Err(CoreError::NotFound { entity: "goal" })
        ));
    }

    #[test]
    fn duplicate_checkin_key_is_rejected() {
        let db = Database::open_memory().unwrap();
        let goal = make_goal(Cadence::Daily);
        db.insert_goal(&goal, None).unwrap();

        db.insert_checkin(&make_checkin(goal.id, None, "2024-03-01"))
            .unwrap();
        let dup = db.insert_checkin(&make_checkin(goal.id, None, "2024-03-01"));
        assert!(matches!(
            dup,
            Err(CoreError::Database(DatabaseError::Conflict(_)))
        ));

        // A task-scoped checkin on the same date is a different key
        let task = Task {
            id: Uuid::new_v4(),
            goal_id: goal.id,
            title: "Scales".to_string(),
            notes: None,
            active: true,
            order_index: 0,
            created_at: Utc::now(),
        };
        db.insert_task(&task).unwrap();
        db.insert_checkin(&make_checkin(goal.id, Some(task.id), "2024-03-01"))
            .unwrap();
        assert_eq!(db.total_checkin_count().unwrap(), 2);
    }

    #[test]
    fn badges_are_seeded_and_unlock_is_monotonic() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.badges().unwrap().len(), 10);
        assert!(db.unlocked_badge_keys().unwrap().is_empty());

        let first = Utc::now();
        db.unlock_badge(BadgeKey::FirstCheckin, first).unwrap();
        let later = first + chrono::Duration::hours(1);
        db.unlock_badge(BadgeKey::FirstCheckin, later).unwrap();

        let badges = db.badges().unwrap();
        let badge = badges
            .iter()
            .find(|b| b.key == BadgeKey::FirstCheckin)
            .unwrap();
        // Second unlock left the original timestamp in place
        assert_eq!(
            badge.unlocked_at.unwrap().timestamp(),
            first.timestamp()
        );
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let db = Database::open_memory().unwrap();
        let goal = make_goal(Cadence::Daily);
        db.insert_goal(&goal, None).unwrap();

        let result: Result<()> = db.with_transaction(|repo| {
            repo.insert_checkin(&make_checkin(goal.id, None, "2024-03-01"))?;
            Err(CoreError::invariant("boom"))
        });
        assert!(result.is_err());
        assert_eq!(db.total_checkin_count().unwrap(), 0);
    }

    #[test]
    fn aggregates_group_by_date() {
        let db = Database::open_memory().unwrap();
        let goal = make_goal(Cadence::Daily);
        let other = make_goal(Cadence::Daily);
        db.insert_goal(&goal, None).unwrap();
        db.insert_goal(&other, None).unwrap();

        db.insert_checkin(&make_checkin(goal.id, None, "2024-03-01"))
            .unwrap();
        db.insert_checkin(&make_checkin(other.id, None, "2024-03-01"))
            .unwrap();
        db.insert_checkin(&make_checkin(goal.id, None, "2024-03-03"))
            .unwrap();

        let days = db
            .checkin_aggregates(
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            )
            .unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].checkins, 2);
        assert_eq!(days[0].xp, 20);
        assert_eq!(days[1].checkins, 1);
    }

    #[test]
    fn reorder_rejects_foreign_tasks() {
        let db = Database::open_memory().unwrap();
        let goal = make_goal(Cadence::Daily);
        db.insert_goal(&goal, None).unwrap();

        let mut ids = Vec::new();
        for title in ["a", "b"] {
            let task = Task {
                id: Uuid::new_v4(),
                goal_id: goal.id,
                title: title.to_string(),
                notes: None,
                active: true,
                order_index: db.next_task_order_index(goal.id).unwrap(),
                created_at: Utc::now(),
            };
            db.insert_task(&task).unwrap();
            ids.push(task.id);
        }

        db.reorder_tasks(goal.id, &[ids[1], ids[0]]).unwrap();
        let tasks = db.active_tasks(goal.id).unwrap();
        assert_eq!(tasks[0].title, "b");
        assert_eq!(tasks[1].title, "a");

        assert!(db.reorder_tasks(goal.id, &[Uuid::new_v4()]).is_err());
    }

    #[test]
    fn reopen_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questlog.db");
        let goal = make_goal(Cadence::Daily);
        {
            let db = Database::open_at(&path).unwrap();
            db.insert_goal(&goal, None).unwrap();
        }

        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.goal(goal.id).unwrap().goal.title, goal.title);
        assert_eq!(db.path(), path);
        // Re-running migrations kept the badge seed intact
        assert_eq!(db.badges().unwrap().len(), 10);
    }

    #[test]
    fn profile_defaults_and_settings() {
        let db = Database::open_memory().unwrap();
        let profile = db.profile().unwrap();
        assert_eq!(profile.xp_total, 0);
        assert_eq!(profile.level, 1);
        assert_eq!(profile.theme, Theme::Aurora);

        db.update_profile_settings(&ProfileSettings {
            theme: Some(Theme::Ocean),
            accent: Some("#0EA5E9".to_string()),
        })
        .unwrap();
        let profile = db.profile().unwrap();
        assert_eq!(profile.theme, Theme::Ocean);
        assert_eq!(profile.accent, "#0EA5E9");
    }
}
