//! Goal management commands.

use clap::Subcommand;
use questlog_core::goal::{weekdays_mask, GoalUpdate, NewGoal, RecurrenceSpec};
use questlog_core::repo::Repository;
use questlog_core::service;
use questlog_core::{Cadence, CheckinEngine};

use super::{open_db, parse_date, parse_id, print_json, CliResult};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a new goal
    Add {
        /// Goal title
        title: String,
        /// Cadence: daily, weekly, or monthly
        #[arg(long, default_value = "daily")]
        cadence: String,
        /// Display color (#RRGGBB)
        #[arg(long, default_value = "#7C3AED")]
        color: String,
        /// XP per check-in (1-100, default 10)
        #[arg(long)]
        xp: Option<u32>,
        /// Check-ins per week (required for weekly goals)
        #[arg(long)]
        weekly_target: Option<u32>,
        /// Check-ins per month (required for monthly goals)
        #[arg(long)]
        monthly_target: Option<u32>,
        /// Eligible weekdays as Monday-based indexes, e.g. "0,2,4"
        #[arg(long)]
        weekdays: Option<String>,
        /// Due time as minutes after midnight
        #[arg(long)]
        due_time: Option<u32>,
    },
    /// List goals
    List {
        /// Show archived goals instead of active ones
        #[arg(long)]
        archived: bool,
    },
    /// Update a goal's metadata or recurrence
    Update {
        /// Goal ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New display color (#RRGGBB)
        #[arg(long)]
        color: Option<String>,
        /// New XP per check-in (1-100)
        #[arg(long)]
        xp: Option<u32>,
        /// New weekly target
        #[arg(long)]
        weekly_target: Option<u32>,
        /// New monthly target
        #[arg(long)]
        monthly_target: Option<u32>,
        /// New eligible weekdays, e.g. "0,2,4"
        #[arg(long)]
        weekdays: Option<String>,
        /// New due time as minutes after midnight
        #[arg(long)]
        due_time: Option<u32>,
    },
    /// Archive a goal (check-ins are kept)
    Archive {
        /// Goal ID
        id: String,
    },
    /// Restore an archived goal
    Unarchive {
        /// Goal ID
        id: String,
    },
    /// Spend a freeze token to cover the period missed before a date
    Freeze {
        /// Goal ID
        id: String,
        /// Date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
        /// Only report eligibility, don't consume a token
        #[arg(long)]
        check: bool,
    },
}

pub fn run(action: GoalAction) -> CliResult {
    let db = open_db()?;
    let engine = CheckinEngine::new(&db);

    match action {
        GoalAction::Add {
            title,
            cadence,
            color,
            xp,
            weekly_target,
            monthly_target,
            weekdays,
            due_time,
        } => {
            let recurrence =
                recurrence_spec(weekly_target, monthly_target, weekdays.as_deref(), due_time)?;
            let created = engine.create_goal(NewGoal {
                title,
                cadence: parse_cadence(&cadence)?,
                color,
                xp_per_check: xp,
                recurrence,
            })?;
            print_json(&created)?;
        }
        GoalAction::List { archived } => {
            print_json(&db.goals(archived)?)?;
        }
        GoalAction::Update {
            id,
            title,
            color,
            xp,
            weekly_target,
            monthly_target,
            weekdays,
            due_time,
        } => {
            let goal_id = parse_id("goal", &id)?;
            let recurrence =
                recurrence_spec(weekly_target, monthly_target, weekdays.as_deref(), due_time)?;
            let updated = service::update_goal(
                &db,
                goal_id,
                GoalUpdate {
                    title,
                    color,
                    xp_per_check: xp,
                    recurrence,
                },
            )?;
            print_json(&updated)?;
        }
        GoalAction::Archive { id } => {
            service::set_goal_archived(&db, parse_id("goal", &id)?, true)?;
            println!("goal archived");
        }
        GoalAction::Unarchive { id } => {
            service::set_goal_archived(&db, parse_id("goal", &id)?, false)?;
            println!("goal restored");
        }
        GoalAction::Freeze { id, date, check } => {
            let goal_id = parse_id("goal", &id)?;
            let date = parse_date(date.as_deref())?;
            if check {
                print_json(&engine.freeze_eligibility(goal_id, date)?)?;
            } else {
                print_json(&engine.use_freeze(goal_id, date)?)?;
            }
        }
    }
    Ok(())
}

fn parse_cadence(raw: &str) -> Result<Cadence, Box<dyn std::error::Error>> {
    match raw {
        "daily" => Ok(Cadence::Daily),
        "weekly" => Ok(Cadence::Weekly),
        "monthly" => Ok(Cadence::Monthly),
        other => Err(format!("invalid cadence: {other} (expected daily, weekly, or monthly)").into()),
    }
}

/// Assemble a recurrence spec from the individual flags; `None` when no
/// flag was given.
fn recurrence_spec(
    weekly_target: Option<u32>,
    monthly_target: Option<u32>,
    weekdays: Option<&str>,
    due_time: Option<u32>,
) -> Result<Option<RecurrenceSpec>, Box<dyn std::error::Error>> {
    let mask = weekdays.map(parse_weekdays).transpose()?;
    let spec = RecurrenceSpec {
        weekly_target,
        monthly_target,
        weekdays_mask: mask,
        due_time_minutes: due_time,
    };
    Ok((!spec.is_empty()).then_some(spec))
}

fn parse_weekdays(raw: &str) -> Result<u8, Box<dyn std::error::Error>> {
    let mut days = Vec::new();
    for part in raw.split(',') {
        let day: u8 = part
            .trim()
            .parse()
            .map_err(|_| format!("invalid weekday index: {part}"))?;
        if day > 6 {
            return Err(format!("weekday index out of range (0-6): {day}").into());
        }
        days.push(day);
    }
    Ok(weekdays_mask(&days))
}
