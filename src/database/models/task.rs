use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::{decode_optional_text, decode_text};
use crate::domain::{AssigneeState, Priority, TaskStatus};

#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub bucket_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub due_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for Task {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            bucket_id: row.try_get("bucket_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            priority: decode_text(row, "priority")?,
            status: decode_text(row, "status")?,
            due_at: row.try_get("due_at")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}

/// One employee's progress on a task. Loaded joined with the user's name.
#[derive(Debug, Clone, Serialize)]
pub struct TaskAssignee {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_status: Option<TaskStatus>,
    pub note: Option<String>,
    pub attachment_url: Option<String>,
    pub rejection_reason: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Deadline this assignee was last flagged OVERDUE for.
    #[serde(skip)]
    pub overdue_marked_for: Option<DateTime<Utc>>,
}

impl TaskAssignee {
    pub fn state(&self) -> AssigneeState {
        AssigneeState {
            status: self.status,
            resume_status: self.resume_status,
        }
    }
}

impl<'r> FromRow<'r, PgRow> for TaskAssignee {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            task_id: row.try_get("task_id")?,
            user_id: row.try_get("user_id")?,
            user_name: row.try_get("user_name")?,
            status: decode_text(row, "status")?,
            resume_status: decode_optional_text(row, "resume_status")?,
            note: row.try_get("note")?,
            attachment_url: row.try_get("attachment_url")?,
            rejection_reason: row.try_get("rejection_reason")?,
            assigned_at: row.try_get("assigned_at")?,
            updated_at: row.try_get("updated_at")?,
            submitted_at: row.try_get("submitted_at")?,
            completed_at: row.try_get("completed_at")?,
            overdue_marked_for: row.try_get("overdue_marked_for")?,
        })
    }
}
