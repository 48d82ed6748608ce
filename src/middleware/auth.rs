use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::cookie::extract_token;
use crate::auth::{decode_jwt, JwtError};
use crate::error::ApiError;
use crate::state::AppState;

/// Raw bearer token of the current request, kept for revocation.
#[derive(Clone, Debug)]
pub struct SessionToken(pub String);

/// Decodes the session token (bearer header first, then cookie) and stores
/// `Claims`, the derived `Actor` and the raw token in request extensions.
/// No database access happens here.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let security = &state.config.security;

    let token = extract_token(request.headers(), &security.cookie_name)
        .ok_or_else(|| ApiError::unauthorized("Missing session token"))?;

    let claims = decode_jwt(&token, &security.jwt_secret).map_err(|e| {
        tracing::warn!(path = %request.uri().path(), "rejected token: {}", e);
        match e {
            JwtError::Expired => ApiError::unauthorized("Session has expired"),
            JwtError::MissingSecret => ApiError::service_unavailable("Authentication is not configured"),
            _ => ApiError::unauthorized("Invalid session token"),
        }
    })?;

    let actor = claims.actor().map_err(|e| {
        tracing::warn!("token claims do not describe an actor: {}", e);
        ApiError::unauthorized("Invalid session token")
    })?;

    let extensions = request.extensions_mut();
    extensions.insert(actor);
    extensions.insert(claims);
    extensions.insert(SessionToken(token));

    Ok(next.run(request).await)
}
