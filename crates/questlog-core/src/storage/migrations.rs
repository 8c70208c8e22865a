//! Database schema migrations for questlog.
//!
//! Migrations are versioned and applied automatically when opening the
//! database. The `schema_version` table tracks the current migration
//! version.

use indoc::indoc;
use rusqlite::{params, Connection, Result as SqliteResult};

use crate::badge::CATALOG;

/// Apply all pending migrations to bring the database to the current
/// schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Create the schema_version table if it doesn't exist.
fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or(0)
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: initial schema plus the badge catalog seed.
///
/// The unique index on checkins is the idempotency key at the storage
/// boundary; `task_id` is coalesced so goal-level check-ins (NULL task)
/// also collide.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS goals (
            id              TEXT PRIMARY KEY,
            title           TEXT NOT NULL,
            cadence         TEXT NOT NULL,
            color           TEXT NOT NULL,
            xp_per_check    INTEGER NOT NULL DEFAULT 10,
            archived        INTEGER NOT NULL DEFAULT 0,
            current_streak  INTEGER NOT NULL DEFAULT 0,
            best_streak     INTEGER NOT NULL DEFAULT 0,
            last_period_key TEXT,
            freeze_tokens   INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recurrence (
            goal_id          TEXT PRIMARY KEY REFERENCES goals(id) ON DELETE CASCADE,
            weekly_target    INTEGER,
            monthly_target   INTEGER,
            weekdays_mask    INTEGER,
            due_time_minutes INTEGER
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id          TEXT PRIMARY KEY,
            goal_id     TEXT NOT NULL REFERENCES goals(id) ON DELETE CASCADE,
            title       TEXT NOT NULL,
            notes       TEXT,
            active      INTEGER NOT NULL DEFAULT 1,
            order_index INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS checkins (
            id         TEXT PRIMARY KEY,
            goal_id    TEXT NOT NULL REFERENCES goals(id),
            task_id    TEXT REFERENCES tasks(id),
            date       TEXT NOT NULL,
            xp_earned  INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_checkins_key
            ON checkins(goal_id, COALESCE(task_id, ''), date);
        CREATE INDEX IF NOT EXISTS idx_checkins_date ON checkins(date);
        CREATE INDEX IF NOT EXISTS idx_checkins_goal_date ON checkins(goal_id, date);

        CREATE TABLE IF NOT EXISTS profile (
            id           INTEGER PRIMARY KEY CHECK (id = 1),
            xp_total     INTEGER NOT NULL DEFAULT 0,
            level        INTEGER NOT NULL DEFAULT 1,
            perfect_days INTEGER NOT NULL DEFAULT 0,
            theme        TEXT NOT NULL DEFAULT 'aurora',
            accent       TEXT NOT NULL DEFAULT '#7C3AED'
        );

        INSERT OR IGNORE INTO profile (id) VALUES (1);

        CREATE TABLE IF NOT EXISTS badges (
            key         TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT NOT NULL,
            icon        TEXT NOT NULL,
            unlocked_at TEXT
        );

        CREATE TABLE IF NOT EXISTS perfect_days_log (
            date        TEXT PRIMARY KEY,
            achieved_at TEXT NOT NULL
        );
    "})?;

    for def in CATALOG {
        tx.execute(
            "INSERT OR IGNORE INTO badges (key, title, description, icon)
             VALUES (?1, ?2, ?3, ?4)",
            params![def.key.as_str(), def.title, def.description, def.icon],
        )?;
    }

    set_schema_version(&tx, 1)?;
    tx.commit()
}
