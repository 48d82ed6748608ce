use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use super::{audit, required_text, ServiceError};
use crate::auth::{generate_jwt, token_fingerprint, Claims};
use crate::config::AppConfig;
use crate::database::models::{AuditAction, ImpersonationSession, Organization};
use crate::database::repository::{impersonation, organizations, revoked_tokens};
use crate::database::Page;
use crate::domain::{Actor, Permission};

#[derive(Debug, Deserialize)]
pub struct StartImpersonation {
    pub organization_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ImpersonationStarted {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub session: ImpersonationSession,
    pub organization: Organization,
}

pub struct ImpersonationService {
    pool: PgPool,
    config: Arc<AppConfig>,
}

impl ImpersonationService {
    pub fn new(pool: PgPool, config: Arc<AppConfig>) -> Self {
        Self { pool, config }
    }

    pub async fn start(&self, actor: &Actor, input: StartImpersonation) -> Result<ImpersonationStarted, ServiceError> {
        actor.authorize(Permission::Impersonate)?;
        let super_admin_id = actor.user_id();
        let reason = required_text("reason", &input.reason, 500)?;

        let organization = organizations::find(&self.pool, input.organization_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Organization"))?;
        if !organization.is_active {
            return Err(ServiceError::Conflict("Organization is deactivated".to_string()));
        }

        let expires_at = Utc::now() + Duration::minutes(self.config.security.impersonation_expiry_minutes as i64);

        let mut tx = self.pool.begin().await?;
        let session = impersonation::insert(&mut *tx, super_admin_id, organization.id, &reason, expires_at).await?;
        let as_impersonator = Actor::Impersonating {
            super_admin_id,
            organization_id: organization.id,
            session_id: session.id,
        };
        audit::record(
            &mut *tx,
            &as_impersonator,
            Some(organization.id),
            AuditAction::ImpersonationStarted,
            Some(session.id),
            json!({ "reason": reason, "expires_at": expires_at }),
        )
        .await?;

        let claims = Claims::for_impersonation(super_admin_id, organization.id, session.id, expires_at);
        let token = generate_jwt(&claims, &self.config.security.jwt_secret)?;
        tx.commit().await?;

        tracing::warn!(
            %super_admin_id,
            organization_id = %organization.id,
            session_id = %session.id,
            "impersonation started"
        );
        Ok(ImpersonationStarted {
            token,
            expires_at,
            session,
            organization,
        })
    }

    /// Ends the caller's own impersonation session and revokes its token.
    pub async fn stop(&self, actor: &Actor, token: &str, claims: &Claims) -> Result<ImpersonationSession, ServiceError> {
        let Actor::Impersonating {
            session_id,
            organization_id,
            ..
        } = *actor
        else {
            return Err(ServiceError::invalid("session", "not an impersonation session"));
        };

        let mut tx = self.pool.begin().await?;
        let session = match impersonation::end(&mut *tx, session_id).await? {
            Some(session) => session,
            None => impersonation::find(&mut *tx, session_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Impersonation session"))?,
        };
        audit::record(
            &mut *tx,
            actor,
            Some(organization_id),
            AuditAction::ImpersonationEnded,
            Some(session_id),
            json!({ "ended_at": session.ended_at }),
        )
        .await?;
        revoked_tokens::revoke(&mut *tx, &token_fingerprint(token), claims.expires_at()).await?;
        tx.commit().await?;

        tracing::warn!(%session_id, "impersonation ended");
        Ok(session)
    }

    pub async fn list(&self, actor: &Actor, active_only: bool, page: Page) -> Result<Vec<ImpersonationSession>, ServiceError> {
        actor.authorize(Permission::Impersonate)?;
        Ok(impersonation::list(&self.pool, active_only, Utc::now(), page).await?)
    }
}
