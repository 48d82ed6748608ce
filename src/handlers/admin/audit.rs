// handlers/admin/audit.rs - GET /api/admin/audit

use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::AuditEntry;
use crate::domain::Actor;
use crate::handlers::QueryParams;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::Paged;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
}

/// GET /api/admin/audit - The organization's audit log, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    QueryParams(query): QueryParams<AuditQuery>,
) -> ApiResult<Paged<AuditEntry>> {
    let page = state.page(query.page, query.limit);
    let log = state
        .audit()
        .tenant_log(&actor, query.actor_id, query.action, page)
        .await?;
    Ok(ApiResponse::success(log))
}
