//! Check-in commands.

use clap::Subcommand;
use questlog_core::CheckinEngine;

use super::{open_db, parse_date, parse_id, print_json, CliResult};

#[derive(Subcommand)]
pub enum CheckinAction {
    /// Record a check-in (safe to repeat; replays earn nothing)
    Add {
        /// Goal ID
        goal_id: String,
        /// Task ID for task-mode goals
        #[arg(long)]
        task: Option<String>,
        /// Date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Undo a check-in: XP is taken back, streaks and badges stay
    Undo {
        /// Goal ID
        goal_id: String,
        /// Task ID for task-mode goals
        #[arg(long)]
        task: Option<String>,
        /// Date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
}

pub fn run(action: CheckinAction) -> CliResult {
    let db = open_db()?;
    let engine = CheckinEngine::new(&db);

    match action {
        CheckinAction::Add {
            goal_id,
            task,
            date,
        } => {
            let result = engine.perform_checkin(
                parse_date(date.as_deref())?,
                parse_id("goal", &goal_id)?,
                task.as_deref().map(|raw| parse_id("task", raw)).transpose()?,
            )?;
            print_json(&result)?;
        }
        CheckinAction::Undo {
            goal_id,
            task,
            date,
        } => {
            let result = engine.undo_checkin(
                parse_date(date.as_deref())?,
                parse_id("goal", &goal_id)?,
                task.as_deref().map(|raw| parse_id("task", raw)).transpose()?,
            )?;
            print_json(&result)?;
        }
    }
    Ok(())
}
