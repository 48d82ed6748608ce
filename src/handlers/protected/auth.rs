// handlers/protected/auth.rs - /api/auth session handlers

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Extension,
};
use serde_json::{json, Value};

use crate::auth::cookie::clear_cookie;
use crate::auth::Claims;
use crate::domain::Actor;
use crate::error::ApiError;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, SessionToken};
use crate::services::sessions::Me;
use crate::services::users::ChangePassword;
use crate::state::AppState;

/// GET /api/auth/me - Current identity, organization and impersonation context
pub async fn me(State(state): State<AppState>, Extension(actor): Extension<Actor>) -> ApiResult<Me> {
    Ok(ApiResponse::success(state.sessions().me(&actor).await?))
}

/// PUT /api/auth/password - Change own password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    JsonBody(input): JsonBody<ChangePassword>,
) -> ApiResult<Value> {
    state.users().change_password(&actor, input).await?;
    Ok(ApiResponse::success(json!({ "changed": true })))
}

/// POST /api/auth/logout - Revoke the current token and clear the cookie
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions().revoke(&token, &claims).await?;

    let security = &state.config.security;
    Ok((
        [(header::SET_COOKIE, clear_cookie(&security.cookie_name, security.cookie_secure))],
        ApiResponse::success(json!({ "logged_out": true, "revoked": true })),
    ))
}

/// POST /api/auth/impersonation/stop - End the impersonation session behind this token
pub async fn stop_impersonation(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(claims): Extension<Claims>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.impersonation().stop(&actor, &token, &claims).await?;

    let security = &state.config.security;
    Ok((
        [(header::SET_COOKIE, clear_cookie(&security.cookie_name, security.cookie_secure))],
        ApiResponse::success(session),
    ))
}
