use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::SessionToken;
use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;

/// Confirms the decoded token still maps to a live session: not revoked,
/// user active with the same role, organization active, impersonation
/// session open. Replaces the `Actor` extension with the validated one.
pub async fn validate_session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (token, claims) = match (
        request.extensions().get::<SessionToken>(),
        request.extensions().get::<Claims>(),
    ) {
        (Some(token), Some(claims)) => (token.0.clone(), claims.clone()),
        _ => return Err(ApiError::unauthorized("Missing session token")),
    };

    let actor = state.sessions().validate(&token, &claims).await.map_err(|e| {
        tracing::warn!(user_id = %claims.sub, "session rejected: {}", e);
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}
