use sqlx::PgExecutor;
use uuid::Uuid;

use crate::database::models::{DevicePlatform, DeviceToken};
use crate::database::DatabaseError;

/// A token belongs to whoever registered it last.
pub async fn upsert(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    token: &str,
    platform: DevicePlatform,
) -> Result<DeviceToken, DatabaseError> {
    let device = sqlx::query_as::<_, DeviceToken>(
        "INSERT INTO device_tokens (token, user_id, platform) VALUES ($1, $2, $3)
         ON CONFLICT (token) DO UPDATE
         SET user_id = EXCLUDED.user_id, platform = EXCLUDED.platform, last_seen_at = now()
         RETURNING *",
    )
    .bind(token)
    .bind(user_id)
    .bind(platform.as_str())
    .fetch_one(executor)
    .await?;
    Ok(device)
}

pub async fn delete_for_user(executor: impl PgExecutor<'_>, user_id: Uuid, token: &str) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM device_tokens WHERE user_id = $1 AND token = $2")
        .bind(user_id)
        .bind(token)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn for_users(executor: impl PgExecutor<'_>, user_ids: &[Uuid]) -> Result<Vec<DeviceToken>, DatabaseError> {
    let devices = sqlx::query_as::<_, DeviceToken>("SELECT * FROM device_tokens WHERE user_id = ANY($1)")
        .bind(user_ids)
        .fetch_all(executor)
        .await?;
    Ok(devices)
}

pub async fn delete_tokens(executor: impl PgExecutor<'_>, tokens: &[String]) -> Result<u64, DatabaseError> {
    let result = sqlx::query("DELETE FROM device_tokens WHERE token = ANY($1)")
        .bind(tokens)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
