use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::database::models::ImpersonationSession;
use crate::database::{DatabaseError, Page};

pub async fn insert(
    executor: impl PgExecutor<'_>,
    super_admin_id: Uuid,
    organization_id: Uuid,
    reason: &str,
    expires_at: DateTime<Utc>,
) -> Result<ImpersonationSession, DatabaseError> {
    let session = sqlx::query_as::<_, ImpersonationSession>(
        "INSERT INTO impersonation_sessions (id, super_admin_id, organization_id, reason, expires_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(super_admin_id)
    .bind(organization_id)
    .bind(reason)
    .bind(expires_at)
    .fetch_one(executor)
    .await?;
    Ok(session)
}

pub async fn find(executor: impl PgExecutor<'_>, id: Uuid) -> Result<Option<ImpersonationSession>, DatabaseError> {
    let session = sqlx::query_as::<_, ImpersonationSession>("SELECT * FROM impersonation_sessions WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(session)
}

/// Close an open session. `None` if it was already ended or does not exist.
pub async fn end(executor: impl PgExecutor<'_>, id: Uuid) -> Result<Option<ImpersonationSession>, DatabaseError> {
    let session = sqlx::query_as::<_, ImpersonationSession>(
        "UPDATE impersonation_sessions SET ended_at = now()
         WHERE id = $1 AND ended_at IS NULL
         RETURNING *",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(session)
}

pub async fn list(
    executor: impl PgExecutor<'_>,
    active_only: bool,
    now: DateTime<Utc>,
    page: Page,
) -> Result<Vec<ImpersonationSession>, DatabaseError> {
    let sessions = sqlx::query_as::<_, ImpersonationSession>(
        "SELECT * FROM impersonation_sessions
         WHERE NOT $1 OR (ended_at IS NULL AND expires_at > $2)
         ORDER BY started_at DESC
         LIMIT $3 OFFSET $4",
    )
    .bind(active_only)
    .bind(now)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(executor)
    .await?;
    Ok(sessions)
}
