//! CLI command implementations.
//!
//! Each module owns one subcommand family. Commands parse arguments, call
//! into questlog-core, and print the result as pretty JSON on stdout.

pub mod checkin;
pub mod config;
pub mod goal;
pub mod profile;
pub mod review;
pub mod task;
pub mod today;

use chrono::{NaiveDate, Utc};
use questlog_core::{Config, Database};
use uuid::Uuid;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the database at the configured path.
pub fn open_db() -> Result<Database, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    Ok(Database::open_at(&config.database_path()?)?)
}

/// Parse a `--date` argument, defaulting to today.
pub fn parse_date(raw: Option<&str>) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    match raw {
        Some(raw) => Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| format!("invalid date (expected YYYY-MM-DD): {raw}"))?),
        None => Ok(Utc::now().date_naive()),
    }
}

pub fn parse_id(kind: &str, raw: &str) -> Result<Uuid, Box<dyn std::error::Error>> {
    Ok(Uuid::parse_str(raw).map_err(|_| format!("invalid {kind} id: {raw}"))?)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
