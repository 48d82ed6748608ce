use sqlx::PgExecutor;
use uuid::Uuid;

use super::conflict_on_unique;
use crate::database::models::Organization;
use crate::database::DatabaseError;

pub async fn insert(
    executor: impl PgExecutor<'_>,
    name: &str,
    slug: &str,
) -> Result<Organization, DatabaseError> {
    sqlx::query_as::<_, Organization>(
        "INSERT INTO organizations (id, name, slug) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(slug)
    .fetch_one(executor)
    .await
    .map_err(|e| conflict_on_unique(e, &format!("Organization slug '{}' is already taken", slug)))
}

pub async fn find(
    executor: impl PgExecutor<'_>,
    id: Uuid,
) -> Result<Option<Organization>, DatabaseError> {
    let org = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(org)
}

pub async fn list(
    executor: impl PgExecutor<'_>,
    active: Option<bool>,
) -> Result<Vec<Organization>, DatabaseError> {
    let orgs = sqlx::query_as::<_, Organization>(
        "SELECT * FROM organizations
         WHERE ($1::boolean IS NULL OR is_active = $1)
         ORDER BY name",
    )
    .bind(active)
    .fetch_all(executor)
    .await?;
    Ok(orgs)
}

/// `None` fields are left unchanged.
pub async fn update(
    executor: impl PgExecutor<'_>,
    id: Uuid,
    name: Option<&str>,
    is_active: Option<bool>,
) -> Result<Option<Organization>, DatabaseError> {
    let org = sqlx::query_as::<_, Organization>(
        "UPDATE organizations
         SET name = COALESCE($2, name),
             is_active = COALESCE($3, is_active),
             updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(is_active)
    .fetch_optional(executor)
    .await?;
    Ok(org)
}
