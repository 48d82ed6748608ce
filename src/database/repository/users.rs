use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use super::conflict_on_unique;
use crate::database::models::User;
use crate::database::DatabaseError;
use crate::domain::Role;

const EMAIL_TAKEN: &str = "A user with this email already exists";

pub struct NewUser<'a> {
    pub organization_id: Option<Uuid>,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Clone)]
pub struct UserChanges {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

pub async fn insert(executor: impl PgExecutor<'_>, user: &NewUser<'_>) -> Result<User, DatabaseError> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, organization_id, name, email, password_hash, role)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user.organization_id)
    .bind(user.name)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.role.as_str())
    .fetch_one(executor)
    .await
    .map_err(|e| conflict_on_unique(e, EMAIL_TAKEN))
}

pub async fn find(executor: impl PgExecutor<'_>, id: Uuid) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

/// Case-insensitive lookup across the whole platform.
pub async fn find_by_email(
    executor: impl PgExecutor<'_>,
    email: &str,
) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
        .bind(email.trim())
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

pub async fn find_in_org(
    executor: impl PgExecutor<'_>,
    organization_id: Uuid,
    id: Uuid,
) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE organization_id = $1 AND id = $2")
        .bind(organization_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

pub async fn list_in_org(
    executor: impl PgExecutor<'_>,
    organization_id: Uuid,
    filter: UserFilter,
) -> Result<Vec<User>, DatabaseError> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM users WHERE organization_id = ");
    query.push_bind(organization_id);
    if let Some(role) = filter.role {
        query.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(is_active) = filter.is_active {
        query.push(" AND is_active = ").push_bind(is_active);
    }
    query.push(" ORDER BY name, email");

    let users = query.build_query_as::<User>().fetch_all(executor).await?;
    Ok(users)
}

pub async fn update(
    executor: impl PgExecutor<'_>,
    organization_id: Uuid,
    id: Uuid,
    changes: &UserChanges,
) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users
         SET name = COALESCE($3, name),
             role = COALESCE($4, role),
             is_active = COALESCE($5, is_active),
             updated_at = now()
         WHERE organization_id = $1 AND id = $2
         RETURNING *",
    )
    .bind(organization_id)
    .bind(id)
    .bind(changes.name.as_deref())
    .bind(changes.role.map(|r| r.as_str()))
    .bind(changes.is_active)
    .fetch_optional(executor)
    .await?;
    Ok(user)
}

pub async fn set_password(
    executor: impl PgExecutor<'_>,
    id: Uuid,
    password_hash: &str,
) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(executor)
        .await?;
    Ok(())
}

/// The subset of `ids` that are active employees of the organization.
pub async fn active_employee_ids(
    executor: impl PgExecutor<'_>,
    organization_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<Uuid>, DatabaseError> {
    let found = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM users
         WHERE organization_id = $1 AND id = ANY($2) AND role = 'EMPLOYEE' AND is_active",
    )
    .bind(organization_id)
    .bind(ids)
    .fetch_all(executor)
    .await?;
    Ok(found)
}

pub async fn active_admin_ids(
    executor: impl PgExecutor<'_>,
    organization_id: Uuid,
) -> Result<Vec<Uuid>, DatabaseError> {
    let found = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM users WHERE organization_id = $1 AND role = 'ADMIN' AND is_active",
    )
    .bind(organization_id)
    .fetch_all(executor)
    .await?;
    Ok(found)
}
