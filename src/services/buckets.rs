use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{audit, optional_text, required_text, ServiceError};
use crate::database::models::{AuditAction, Bucket};
use crate::database::repository::buckets;
use crate::domain::{Actor, Permission};

const MAX_NAME: usize = 100;

#[derive(Debug, Deserialize)]
pub struct CreateBucket {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBucket {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub struct BucketService {
    pool: PgPool,
}

impl BucketService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<Bucket>, ServiceError> {
        let scope = actor.tenant_for(Permission::ViewBuckets)?;
        Ok(buckets::list(&self.pool, scope.organization_id).await?)
    }

    pub async fn create(&self, actor: &Actor, input: CreateBucket) -> Result<Bucket, ServiceError> {
        let scope = actor.tenant_for(Permission::ManageBuckets)?;
        let name = required_text("name", &input.name, MAX_NAME)?;
        let description = optional_text(input.description.as_deref());

        let mut tx = self.pool.begin().await?;
        let bucket = buckets::insert(
            &mut *tx,
            scope.organization_id,
            &name,
            description.as_deref(),
            actor.user_id(),
        )
        .await?;
        audit::record(
            &mut *tx,
            actor,
            Some(scope.organization_id),
            AuditAction::BucketCreated,
            Some(bucket.id),
            json!({ "name": bucket.name }),
        )
        .await?;
        tx.commit().await?;
        Ok(bucket)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdateBucket) -> Result<Bucket, ServiceError> {
        let scope = actor.tenant_for(Permission::ManageBuckets)?;
        let name = input
            .name
            .as_deref()
            .map(|n| required_text("name", n, MAX_NAME))
            .transpose()?;
        let description = optional_text(input.description.as_deref());

        let mut tx = self.pool.begin().await?;
        let bucket = buckets::update(
            &mut *tx,
            scope.organization_id,
            id,
            name.as_deref(),
            description.as_deref(),
        )
        .await?
        .ok_or_else(|| ServiceError::not_found("Bucket"))?;
        audit::record(
            &mut *tx,
            actor,
            Some(scope.organization_id),
            AuditAction::BucketUpdated,
            Some(bucket.id),
            json!({ "name": name, "description": description }),
        )
        .await?;
        tx.commit().await?;
        Ok(bucket)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
        let scope = actor.tenant_for(Permission::ManageBuckets)?;

        let mut tx = self.pool.begin().await?;
        let bucket = buckets::find(&mut *tx, scope.organization_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Bucket"))?;
        buckets::delete(&mut *tx, scope.organization_id, id).await?;
        audit::record(
            &mut *tx,
            actor,
            Some(scope.organization_id),
            AuditAction::BucketDeleted,
            Some(bucket.id),
            json!({ "name": bucket.name }),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }
}
