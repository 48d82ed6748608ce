use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use std::str::FromStr;
use uuid::Uuid;

use super::decode_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    TaskAssigned,
    TaskStatusChanged,
    TaskSubmitted,
    TaskApproved,
    TaskRejected,
    TaskOverdue,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TaskAssigned => "TASK_ASSIGNED",
            NotificationKind::TaskStatusChanged => "TASK_STATUS_CHANGED",
            NotificationKind::TaskSubmitted => "TASK_SUBMITTED",
            NotificationKind::TaskApproved => "TASK_APPROVED",
            NotificationKind::TaskRejected => "TASK_REJECTED",
            NotificationKind::TaskOverdue => "TASK_OVERDUE",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown notification kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for NotificationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TASK_ASSIGNED" => Ok(NotificationKind::TaskAssigned),
            "TASK_STATUS_CHANGED" => Ok(NotificationKind::TaskStatusChanged),
            "TASK_SUBMITTED" => Ok(NotificationKind::TaskSubmitted),
            "TASK_APPROVED" => Ok(NotificationKind::TaskApproved),
            "TASK_REJECTED" => Ok(NotificationKind::TaskRejected),
            "TASK_OVERDUE" => Ok(NotificationKind::TaskOverdue),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub task_id: Option<Uuid>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Notification {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            organization_id: row.try_get("organization_id")?,
            kind: decode_text(row, "kind")?,
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            task_id: row.try_get("task_id")?,
            read_at: row.try_get("read_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
