//! Tasks: optional sub-items of a goal.
//!
//! A goal with at least one active task is in "task mode": check-ins are
//! recorded per task. A goal with no active tasks takes check-ins directly
//! (task id = none). Tasks are deactivated, never deleted, so historical
//! check-ins keep resolving their task id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::goal::validate_title;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub title: String,
    pub notes: Option<String>,
    /// Tombstone flag; inactive tasks stay on disk
    pub active: bool,
    /// Dense zero-based position within the goal
    pub order_index: u32,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a task under a goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub notes: Option<String>,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title, 200)?;
        validate_notes(self.notes.as_deref())
    }
}

/// Partial update for a task. The outer `Option` on `notes` distinguishes
/// "leave unchanged" from "set/clear".
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub active: Option<bool>,
}

impl TaskUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validate_title(title, 200)?;
        }
        if let Some(notes) = &self.notes {
            validate_notes(notes.as_deref())?;
        }
        Ok(())
    }
}

fn validate_notes(notes: Option<&str>) -> Result<(), ValidationError> {
    if let Some(notes) = notes {
        if notes.chars().count() > 1000 {
            return Err(ValidationError::invalid_value(
                "notes",
                "must be at most 1000 characters",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_bounds() {
        let task = NewTask {
            title: "  ".to_string(),
            notes: None,
        };
        assert!(task.validate().is_err());

        let task = NewTask {
            title: "t".repeat(201),
            notes: None,
        };
        assert!(task.validate().is_err());

        let task = NewTask {
            title: "Stretch".to_string(),
            notes: Some("n".repeat(1000)),
        };
        assert!(task.validate().is_ok());
    }
}
