use serde_json::Value;
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::models::{AuditAction, AuditEntry};
use crate::database::{DatabaseError, Page};
use crate::domain::AuditIdentity;

pub struct NewAuditEntry {
    pub organization_id: Option<Uuid>,
    pub identity: AuditIdentity,
    pub action: AuditAction,
    pub target_id: Option<Uuid>,
    pub details: Value,
}

#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub organization_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
}

pub async fn insert(executor: impl PgExecutor<'_>, entry: &NewAuditEntry) -> Result<AuditEntry, DatabaseError> {
    let row = sqlx::query_as::<_, AuditEntry>(
        "INSERT INTO audit_logs
            (id, organization_id, actor_id, impersonator_id, impersonation_session_id,
             action, target_type, target_id, details)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(entry.organization_id)
    .bind(entry.identity.actor_id)
    .bind(entry.identity.impersonator_id)
    .bind(entry.identity.session_id)
    .bind(entry.action.as_str())
    .bind(entry.action.target_type())
    .bind(entry.target_id)
    .bind(&entry.details)
    .fetch_one(executor)
    .await?;
    Ok(row)
}

fn push_conditions(query: &mut QueryBuilder<'_, Postgres>, filter: &AuditFilter) {
    query.push(" WHERE TRUE");
    if let Some(organization_id) = filter.organization_id {
        query.push(" AND organization_id = ").push_bind(organization_id);
    }
    if let Some(actor_id) = filter.actor_id {
        query.push(" AND actor_id = ").push_bind(actor_id);
    }
    if let Some(action) = &filter.action {
        query.push(" AND action = ").push_bind(action.to_uppercase());
    }
}

/// Newest first.
pub async fn list(
    executor: impl PgExecutor<'_>,
    filter: &AuditFilter,
    page: Page,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM audit_logs");
    push_conditions(&mut query, filter);
    query.push(" ORDER BY created_at DESC");
    query.push(" LIMIT ").push_bind(page.limit());
    query.push(" OFFSET ").push_bind(page.offset());

    let rows = query.build_query_as::<AuditEntry>().fetch_all(executor).await?;
    Ok(rows)
}

pub async fn count(executor: impl PgExecutor<'_>, filter: &AuditFilter) -> Result<i64, DatabaseError> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM audit_logs");
    push_conditions(&mut query, filter);

    let count = query.build_query_scalar::<i64>().fetch_one(executor).await?;
    Ok(count)
}
