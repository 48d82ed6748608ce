use sqlx::PgExecutor;
use uuid::Uuid;

use crate::database::models::{Notification, NotificationKind};
use crate::database::{DatabaseError, Page};

pub struct NewNotification<'a> {
    pub organization_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: &'a str,
    pub body: &'a str,
    pub task_id: Option<Uuid>,
}

/// One row per recipient, same content.
pub async fn insert_for(
    executor: impl PgExecutor<'_>,
    recipients: &[Uuid],
    notification: &NewNotification<'_>,
) -> Result<Vec<Notification>, DatabaseError> {
    let ids: Vec<Uuid> = recipients.iter().map(|_| Uuid::new_v4()).collect();
    let rows = sqlx::query_as::<_, Notification>(
        "INSERT INTO notifications (id, user_id, organization_id, kind, title, body, task_id)
         SELECT r.id, r.user_id, $3, $4, $5, $6, $7
         FROM UNNEST($1::uuid[], $2::uuid[]) AS r(id, user_id)
         RETURNING *",
    )
    .bind(&ids)
    .bind(recipients)
    .bind(notification.organization_id)
    .bind(notification.kind.as_str())
    .bind(notification.title)
    .bind(notification.body)
    .bind(notification.task_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

pub async fn list_for_user(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    unread_only: bool,
    page: Page,
) -> Result<Vec<Notification>, DatabaseError> {
    let rows = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications
         WHERE user_id = $1 AND (NOT $2 OR read_at IS NULL)
         ORDER BY created_at DESC
         LIMIT $3 OFFSET $4",
    )
    .bind(user_id)
    .bind(unread_only)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

pub async fn count_for_user(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    unread_only: bool,
) -> Result<i64, DatabaseError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR read_at IS NULL)",
    )
    .bind(user_id)
    .bind(unread_only)
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// Marks one of the user's own notifications. Already-read rows keep their timestamp.
pub async fn mark_read(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<Notification>, DatabaseError> {
    let row = sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET read_at = COALESCE(read_at, now())
         WHERE user_id = $1 AND id = $2
         RETURNING *",
    )
    .bind(user_id)
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

pub async fn mark_all_read(executor: impl PgExecutor<'_>, user_id: Uuid) -> Result<u64, DatabaseError> {
    let result = sqlx::query("UPDATE notifications SET read_at = now() WHERE user_id = $1 AND read_at IS NULL")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
