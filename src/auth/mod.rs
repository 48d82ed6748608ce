//! Session tokens.
//!
//! A token is an HS256 JWT. The claims carry enough to rebuild the [`Actor`]
//! without a database round-trip; the session validation middleware then
//! confirms the user, organization and impersonation session are still live.

pub mod cookie;
pub mod password;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::database::models::User;
use crate::domain::{Actor, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<Uuid>,
    /// Impersonation session id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imp: Option<Uuid>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT secret is not configured")]
    MissingSecret,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Malformed token claims: {0}")]
    Malformed(&'static str),

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl Claims {
    pub fn for_user(user: &User, expiry_hours: u64) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id,
            role: user.role,
            org: user.organization_id,
            imp: None,
            iat: now.timestamp(),
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
        }
    }

    /// Token that lets a super-admin act inside one organization until `expires_at`.
    pub fn for_impersonation(
        super_admin_id: Uuid,
        organization_id: Uuid,
        session_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: super_admin_id,
            role: Role::SuperAdmin,
            org: Some(organization_id),
            imp: Some(session_id),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }

    /// Rebuild the request identity. Rejects role/org combinations no login could produce.
    pub fn actor(&self) -> Result<Actor, JwtError> {
        match (self.role, self.org, self.imp) {
            (Role::SuperAdmin, None, None) => Ok(Actor::SuperAdmin { user_id: self.sub }),
            (Role::SuperAdmin, Some(organization_id), Some(session_id)) => Ok(Actor::Impersonating {
                super_admin_id: self.sub,
                organization_id,
                session_id,
            }),
            (Role::SuperAdmin, _, _) => Err(JwtError::Malformed("impersonation needs both org and imp")),
            (_, _, Some(_)) => Err(JwtError::Malformed("only super-admins impersonate")),
            (Role::Admin, Some(organization_id), None) => Ok(Actor::OrgAdmin {
                user_id: self.sub,
                organization_id,
            }),
            (Role::Employee, Some(organization_id), None) => Ok(Actor::Employee {
                user_id: self.sub,
                organization_id,
            }),
            (_, None, None) => Err(JwtError::Malformed("tenant roles need an organization")),
        }
    }
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::Signing(e.to_string()))
}

pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })
}

/// Stored in place of the raw token when a session is revoked.
pub fn token_fingerprint(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
