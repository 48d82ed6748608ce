use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::database::DatabaseError;

pub async fn revoke(
    executor: impl PgExecutor<'_>,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    sqlx::query("INSERT INTO revoked_tokens (token_hash, expires_at) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(token_hash)
        .bind(expires_at)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn is_revoked(executor: impl PgExecutor<'_>, token_hash: &str) -> Result<bool, DatabaseError> {
    let revoked = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE token_hash = $1)",
    )
    .bind(token_hash)
    .fetch_one(executor)
    .await?;
    Ok(revoked)
}

/// Rows whose token would be rejected for expiry anyway.
pub async fn purge_expired(executor: impl PgExecutor<'_>, now: DateTime<Utc>) -> Result<u64, DatabaseError> {
    let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < $1")
        .bind(now)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
