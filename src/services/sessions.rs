//! Login, logout and per-request session validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

use super::ServiceError;
use crate::auth::password::{verify_password, verify_unknown_account};
use crate::auth::{generate_jwt, token_fingerprint, Claims};
use crate::config::AppConfig;
use crate::database::models::{ImpersonationSession, Organization, User};
use crate::database::repository::{impersonation, organizations, revoked_tokens, users};
use crate::domain::{Actor, Role};

const BAD_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// The current identity as the client should see it.
#[derive(Debug, Serialize)]
pub struct Me {
    pub user: User,
    pub actor: Actor,
    pub effective_role: Role,
    pub organization: Option<Organization>,
    pub impersonation: Option<ImpersonationSession>,
}

pub struct SessionService {
    pool: PgPool,
    config: Arc<AppConfig>,
}

impl SessionService {
    pub fn new(pool: PgPool, config: Arc<AppConfig>) -> Self {
        Self { pool, config }
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResult, ServiceError> {
        let Some(user) = users::find_by_email(&self.pool, &request.email).await? else {
            verify_unknown_account(&request.password);
            return Err(ServiceError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };

        if !verify_password(&request.password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "login rejected: wrong password");
            return Err(ServiceError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }
        if !user.is_active {
            return Err(ServiceError::Unauthorized("Account is deactivated".to_string()));
        }
        if let Some(organization_id) = user.organization_id {
            let active = organizations::find(&self.pool, organization_id)
                .await?
                .map(|org| org.is_active)
                .unwrap_or(false);
            if !active {
                return Err(ServiceError::Unauthorized("Organization is deactivated".to_string()));
            }
        }

        let claims = Claims::for_user(&user, self.config.security.jwt_expiry_hours);
        let token = generate_jwt(&claims, &self.config.security.jwt_secret)?;
        tracing::info!(user_id = %user.id, role = %user.role, "login");
        Ok(LoginResult {
            token,
            expires_at: claims.expires_at(),
            user,
        })
    }

    /// Revoked until the token would have expired anyway.
    pub async fn revoke(&self, token: &str, claims: &Claims) -> Result<(), ServiceError> {
        revoked_tokens::revoke(&self.pool, &token_fingerprint(token), claims.expires_at()).await?;
        Ok(())
    }

    /// Confirm a decoded token still describes a live session and resolve its actor.
    pub async fn validate(&self, token: &str, claims: &Claims) -> Result<Actor, ServiceError> {
        let actor = claims.actor()?;

        if revoked_tokens::is_revoked(&self.pool, &token_fingerprint(token)).await? {
            return Err(ServiceError::Unauthorized("Session has been revoked".to_string()));
        }

        let user = users::find(&self.pool, claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ServiceError::Unauthorized("Account is no longer active".to_string()))?;
        if user.role != claims.role {
            return Err(ServiceError::Unauthorized("Role has changed; sign in again".to_string()));
        }

        if let Actor::Impersonating {
            session_id,
            organization_id,
            super_admin_id,
        } = actor
        {
            let session = impersonation::find(&self.pool, session_id).await?;
            let live = session.is_some_and(|s| {
                s.super_admin_id == super_admin_id && s.organization_id == organization_id && s.is_active_at(Utc::now())
            });
            if !live {
                return Err(ServiceError::Unauthorized("Impersonation session has ended".to_string()));
            }
        } else if user.organization_id != claims.org {
            return Err(ServiceError::Unauthorized("Organization has changed; sign in again".to_string()));
        }

        if let Some(organization_id) = actor.organization_id() {
            let active = organizations::find(&self.pool, organization_id)
                .await?
                .is_some_and(|org| org.is_active);
            if !active {
                return Err(ServiceError::Unauthorized("Organization is deactivated".to_string()));
            }
        }

        Ok(actor)
    }

    pub async fn me(&self, actor: &Actor) -> Result<Me, ServiceError> {
        let user = users::find(&self.pool, actor.user_id())
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        let organization = match actor.organization_id() {
            Some(id) => organizations::find(&self.pool, id).await?,
            None => None,
        };
        let impersonation = match actor.impersonation_session() {
            Some(id) => impersonation::find(&self.pool, id).await?,
            None => None,
        };
        Ok(Me {
            user,
            actor: *actor,
            effective_role: actor.effective_role(),
            organization,
            impersonation,
        })
    }
}
