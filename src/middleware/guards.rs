// Role guards. They only look at the decoded actor, so they run before
// session validation and never touch the database.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::domain::{AccessError, Actor};
use crate::error::ApiError;

fn admit(request: &Request, rule: impl Fn(&Actor) -> Result<(), AccessError>) -> Result<(), ApiError> {
    let actor = request
        .extensions()
        .get::<Actor>()
        .copied()
        .ok_or_else(|| ApiError::unauthorized("Missing session token"))?;

    rule(&actor).map_err(|e| {
        tracing::warn!(user_id = %actor.user_id(), path = %request.uri().path(), "forbidden: {}", e);
        ApiError::from(e)
    })
}

/// Any actor with an organization context.
pub async fn require_tenant(request: Request, next: Next) -> Result<Response, ApiError> {
    admit(&request, |actor| actor.tenant().map(|_| ()))?;
    Ok(next.run(request).await)
}

/// Organization admins and impersonating super-admins.
pub async fn require_tenant_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    admit(&request, |actor| match actor {
        Actor::OrgAdmin { .. } | Actor::Impersonating { .. } => Ok(()),
        Actor::SuperAdmin { .. } => Err(AccessError::NoTenant),
        Actor::Employee { .. } => Err(AccessError::Denied("tenant_admin")),
    })?;
    Ok(next.run(request).await)
}

/// Plain super-admins. An impersonation token never reaches platform routes.
pub async fn require_super_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    admit(&request, |actor| match actor {
        Actor::SuperAdmin { .. } => Ok(()),
        Actor::Impersonating { .. } => Err(AccessError::ImpersonationBoundary),
        _ => Err(AccessError::Denied("super_admin")),
    })?;
    Ok(next.run(request).await)
}
