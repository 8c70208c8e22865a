//! Task management commands.

use clap::Subcommand;
use questlog_core::repo::Repository;
use questlog_core::service;
use questlog_core::task::{NewTask, TaskUpdate};

use super::{open_db, parse_id, print_json, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to a goal
    Add {
        /// Goal ID
        goal_id: String,
        /// Task title
        title: String,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List a goal's active tasks in order
    List {
        /// Goal ID
        goal_id: String,
    },
    /// Update a task
    Update {
        /// Goal ID
        goal_id: String,
        /// Task ID
        task_id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New notes
        #[arg(long)]
        notes: Option<String>,
        /// Remove the notes
        #[arg(long, conflicts_with = "notes")]
        clear_notes: bool,
        /// Reactivate a removed task
        #[arg(long)]
        restore: bool,
    },
    /// Deactivate a task (its check-ins are kept)
    Remove {
        /// Goal ID
        goal_id: String,
        /// Task ID
        task_id: String,
    },
    /// Reorder a goal's active tasks to the given id sequence
    Reorder {
        /// Goal ID
        goal_id: String,
        /// Task ids in the new order
        task_ids: Vec<String>,
    },
}

pub fn run(action: TaskAction) -> CliResult {
    let db = open_db()?;

    match action {
        TaskAction::Add {
            goal_id,
            title,
            notes,
        } => {
            let task = service::create_task(
                &db,
                parse_id("goal", &goal_id)?,
                NewTask { title, notes },
            )?;
            print_json(&task)?;
        }
        TaskAction::List { goal_id } => {
            print_json(&db.active_tasks(parse_id("goal", &goal_id)?)?)?;
        }
        TaskAction::Update {
            goal_id,
            task_id,
            title,
            notes,
            clear_notes,
            restore,
        } => {
            let update = TaskUpdate {
                title,
                notes: if clear_notes { Some(None) } else { notes.map(Some) },
                active: restore.then_some(true),
            };
            let task = service::update_task(
                &db,
                parse_id("goal", &goal_id)?,
                parse_id("task", &task_id)?,
                update,
            )?;
            print_json(&task)?;
        }
        TaskAction::Remove { goal_id, task_id } => {
            let task = service::deactivate_task(
                &db,
                parse_id("goal", &goal_id)?,
                parse_id("task", &task_id)?,
            )?;
            print_json(&task)?;
        }
        TaskAction::Reorder { goal_id, task_ids } => {
            let ids = task_ids
                .iter()
                .map(|raw| parse_id("task", raw))
                .collect::<Result<Vec<_>, _>>()?;
            let tasks = service::reorder_tasks(&db, parse_id("goal", &goal_id)?, &ids)?;
            print_json(&tasks)?;
        }
    }
    Ok(())
}
