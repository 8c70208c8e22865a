//! Weekly and monthly review commands.

use chrono::{Duration, Utc};
use clap::Subcommand;
use questlog_core::review;

use super::{open_db, parse_date, print_json, CliResult};

#[derive(Subcommand)]
pub enum ReviewAction {
    /// Seven-day review
    Weekly {
        /// First day (YYYY-MM-DD); default covers the last seven days
        #[arg(long)]
        start: Option<String>,
    },
    /// Calendar-month review
    Monthly {
        /// Month key (YYYY-MM, default the current month)
        #[arg(long)]
        month: Option<String>,
    },
}

pub fn run(action: ReviewAction) -> CliResult {
    let db = open_db()?;

    match action {
        ReviewAction::Weekly { start } => {
            let start = match start.as_deref() {
                Some(raw) => parse_date(Some(raw))?,
                None => Utc::now().date_naive() - Duration::days(6),
            };
            print_json(&review::weekly_review(&db, start)?)
        }
        ReviewAction::Monthly { month } => {
            let month = month.unwrap_or_else(|| Utc::now().format("%Y-%m").to_string());
            print_json(&review::monthly_review(&db, &month)?)
        }
    }
}
