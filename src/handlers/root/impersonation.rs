// handlers/root/impersonation.rs - Start and review impersonation sessions

use axum::{extract::State, Extension};
use serde::Deserialize;

use crate::database::models::ImpersonationSession;
use crate::domain::Actor;
use crate::handlers::{JsonBody, QueryParams};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::impersonation::{ImpersonationStarted, StartImpersonation};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub active_only: bool,
}

/// POST /api/root/impersonate - Open a support session inside an organization
///
/// The returned token is tenant-scoped; the caller's own session is untouched.
pub async fn start(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    JsonBody(input): JsonBody<StartImpersonation>,
) -> ApiResult<ImpersonationStarted> {
    Ok(ApiResponse::created(state.impersonation().start(&actor, input).await?))
}

/// GET /api/root/impersonations
pub async fn list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    QueryParams(query): QueryParams<SessionQuery>,
) -> ApiResult<Vec<ImpersonationSession>> {
    let page = state.page(query.page, query.limit);
    let sessions = state.impersonation().list(&actor, query.active_only, page).await?;
    Ok(ApiResponse::success(sessions))
}
