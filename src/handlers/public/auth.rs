// handlers/public/auth.rs - POST /auth/login and POST /auth/logout

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
};
use serde_json::json;

use crate::auth::cookie::{clear_cookie, extract_token, session_cookie};
use crate::auth::decode_jwt;
use crate::error::ApiError;
use crate::handlers::JsonBody;
use crate::middleware::ApiResponse;
use crate::services::sessions::LoginRequest;
use crate::state::AppState;

/// POST /auth/login - Exchange email and password for a session
///
/// The token is returned in the body and also set as an HttpOnly cookie.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.sessions().login(request).await?;

    let security = &state.config.security;
    let cookie = session_cookie(
        &security.cookie_name,
        &result.token,
        security.jwt_expiry_hours as i64 * 3600,
        security.cookie_secure,
    );

    Ok(([(header::SET_COOKIE, cookie)], ApiResponse::success(result)))
}

/// POST /auth/logout - Clear the session cookie
///
/// Works without a valid session. When the request carries a token that
/// still decodes, it is revoked as well.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let security = &state.config.security;

    let mut revoked = false;
    if let Some(token) = extract_token(&headers, &security.cookie_name) {
        if let Ok(claims) = decode_jwt(&token, &security.jwt_secret) {
            match state.sessions().revoke(&token, &claims).await {
                Ok(()) => revoked = true,
                Err(e) => tracing::warn!(user_id = %claims.sub, "logout could not revoke token: {}", e),
            }
        }
    }

    (
        [(header::SET_COOKIE, clear_cookie(&security.cookie_name, security.cookie_secure))],
        ApiResponse::success(json!({ "logged_out": true, "revoked": revoked })),
    )
}
