use serde_json::Value;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::{Paged, ServiceError};
use crate::database::models::{AuditAction, AuditEntry};
use crate::database::repository::audit::{self, AuditFilter, NewAuditEntry};
use crate::database::{DatabaseError, Page};
use crate::domain::{Actor, Permission};

/// Append one entry attributed to `actor`. Runs on whatever executor the
/// caller is using so the entry commits with the change it describes.
pub async fn record(
    executor: impl PgExecutor<'_>,
    actor: &Actor,
    organization_id: Option<Uuid>,
    action: AuditAction,
    target_id: Option<Uuid>,
    details: Value,
) -> Result<AuditEntry, DatabaseError> {
    let entry = NewAuditEntry {
        organization_id,
        identity: actor.audit_identity(),
        action,
        target_id,
        details,
    };
    let stored = audit::insert(executor, &entry).await?;
    tracing::info!(
        action = action.as_str(),
        actor_id = %entry.identity.actor_id,
        impersonator_id = ?entry.identity.impersonator_id,
        target_id = ?target_id,
        "audit"
    );
    Ok(stored)
}

pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// An admin's view: always pinned to their own organization.
    pub async fn tenant_log(
        &self,
        actor: &Actor,
        actor_id: Option<Uuid>,
        action: Option<String>,
        page: Page,
    ) -> Result<Paged<AuditEntry>, ServiceError> {
        let scope = actor.tenant_for(Permission::ViewAudit)?;
        let filter = AuditFilter {
            organization_id: Some(scope.organization_id),
            actor_id,
            action,
        };
        self.query(&filter, page).await
    }

    pub async fn platform_log(&self, actor: &Actor, filter: AuditFilter, page: Page) -> Result<Paged<AuditEntry>, ServiceError> {
        actor.authorize(Permission::ViewPlatformAudit)?;
        self.query(&filter, page).await
    }

    async fn query(&self, filter: &AuditFilter, page: Page) -> Result<Paged<AuditEntry>, ServiceError> {
        let items = audit::list(&self.pool, filter, page).await?;
        let total = audit::count(&self.pool, filter).await?;
        Ok(Paged::new(items, total, page))
    }
}
