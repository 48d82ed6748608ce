use sqlx::PgExecutor;
use uuid::Uuid;

use super::conflict_on_unique;
use crate::database::models::Bucket;
use crate::database::DatabaseError;

const NAME_TAKEN: &str = "A bucket with this name already exists";

pub async fn list(executor: impl PgExecutor<'_>, organization_id: Uuid) -> Result<Vec<Bucket>, DatabaseError> {
    let buckets = sqlx::query_as::<_, Bucket>(
        "SELECT * FROM buckets WHERE organization_id = $1 ORDER BY lower(name)",
    )
    .bind(organization_id)
    .fetch_all(executor)
    .await?;
    Ok(buckets)
}

pub async fn find(
    executor: impl PgExecutor<'_>,
    organization_id: Uuid,
    id: Uuid,
) -> Result<Option<Bucket>, DatabaseError> {
    let bucket = sqlx::query_as::<_, Bucket>("SELECT * FROM buckets WHERE organization_id = $1 AND id = $2")
        .bind(organization_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(bucket)
}

pub async fn insert(
    executor: impl PgExecutor<'_>,
    organization_id: Uuid,
    name: &str,
    description: Option<&str>,
    created_by: Uuid,
) -> Result<Bucket, DatabaseError> {
    sqlx::query_as::<_, Bucket>(
        "INSERT INTO buckets (id, organization_id, name, description, created_by)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(organization_id)
    .bind(name)
    .bind(description)
    .bind(created_by)
    .fetch_one(executor)
    .await
    .map_err(|e| conflict_on_unique(e, NAME_TAKEN))
}

pub async fn update(
    executor: impl PgExecutor<'_>,
    organization_id: Uuid,
    id: Uuid,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<Option<Bucket>, DatabaseError> {
    sqlx::query_as::<_, Bucket>(
        "UPDATE buckets
         SET name = COALESCE($3, name),
             description = COALESCE($4, description),
             updated_at = now()
         WHERE organization_id = $1 AND id = $2
         RETURNING *",
    )
    .bind(organization_id)
    .bind(id)
    .bind(name)
    .bind(description)
    .fetch_optional(executor)
    .await
    .map_err(|e| conflict_on_unique(e, NAME_TAKEN))
}

/// Tasks in the bucket are left unbucketed by the foreign key.
pub async fn delete(executor: impl PgExecutor<'_>, organization_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM buckets WHERE organization_id = $1 AND id = $2")
        .bind(organization_id)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
