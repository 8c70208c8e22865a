//! Thin CRUD operations over the repository.
//!
//! These compose validation with mechanical repository writes; anything
//! that touches streaks, XP, or badges goes through
//! [`crate::checkin::CheckinEngine`] instead.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::goal::{GoalUpdate, GoalWithRecurrence};
use crate::profile::{Profile, ProfileSettings};
use crate::repo::Repository;
use crate::task::{NewTask, Task, TaskUpdate};

/// Update a goal's metadata and, when supplied, replace its recurrence.
pub fn update_goal<R: Repository>(
    repo: &R,
    goal_id: Uuid,
    update: GoalUpdate,
) -> Result<GoalWithRecurrence> {
    update.validate().map_err(CoreError::Validation)?;
    let mut goal = repo.goal(goal_id)?.goal;

    if let Some(title) = update.title {
        goal.title = title;
    }
    if let Some(color) = update.color {
        goal.color = color;
    }
    if let Some(xp) = update.xp_per_check {
        goal.xp_per_check = xp;
    }

    repo.with_transaction(|repo| {
        repo.update_goal(&goal)?;
        if let Some(spec) = &update.recurrence {
            repo.upsert_recurrence(goal_id, spec)?;
        }
        Ok(())
    })?;

    repo.goal(goal_id)
}

/// Archive or unarchive a goal (soft delete; check-ins stay).
pub fn set_goal_archived<R: Repository>(repo: &R, goal_id: Uuid, archived: bool) -> Result<()> {
    repo.goal(goal_id)?;
    repo.set_goal_archived(goal_id, archived)
}

/// Create a task under a goal at the next order index.
pub fn create_task<R: Repository>(repo: &R, goal_id: Uuid, new_task: NewTask) -> Result<Task> {
    new_task.validate().map_err(CoreError::Validation)?;
    repo.goal(goal_id)?;

    let task = Task {
        id: Uuid::new_v4(),
        goal_id,
        title: new_task.title,
        notes: new_task.notes,
        active: true,
        order_index: repo.next_task_order_index(goal_id)?,
        created_at: Utc::now(),
    };
    repo.insert_task(&task)?;
    Ok(task)
}

/// Apply a partial update to a task.
pub fn update_task<R: Repository>(
    repo: &R,
    goal_id: Uuid,
    task_id: Uuid,
    update: TaskUpdate,
) -> Result<Task> {
    update.validate().map_err(CoreError::Validation)?;
    let mut task = repo.task(goal_id, task_id)?;

    if let Some(title) = update.title {
        task.title = title;
    }
    if let Some(notes) = update.notes {
        task.notes = notes;
    }
    if let Some(active) = update.active {
        task.active = active;
    }

    repo.update_task(&task)?;
    Ok(task)
}

/// Soft-delete a task. The tombstone keeps historical check-ins
/// resolvable.
pub fn deactivate_task<R: Repository>(repo: &R, goal_id: Uuid, task_id: Uuid) -> Result<Task> {
    update_task(
        repo,
        goal_id,
        task_id,
        TaskUpdate {
            active: Some(false),
            ..Default::default()
        },
    )
}

/// Re-index the goal's active tasks to the given order.
pub fn reorder_tasks<R: Repository>(
    repo: &R,
    goal_id: Uuid,
    task_ids: &[Uuid],
) -> Result<Vec<Task>> {
    repo.goal(goal_id)?;
    repo.with_transaction(|repo| repo.reorder_tasks(goal_id, task_ids))?;
    repo.active_tasks(goal_id)
}

/// Update display settings on the profile singleton.
pub fn update_profile_settings<R: Repository>(
    repo: &R,
    settings: ProfileSettings,
) -> Result<Profile> {
    settings.validate().map_err(CoreError::Validation)?;
    repo.update_profile_settings(&settings)?;
    repo.profile()
}
