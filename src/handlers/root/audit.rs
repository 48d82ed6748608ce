// handlers/root/audit.rs - GET /api/root/audit (platform-wide)

use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::AuditEntry;
use crate::database::repository::audit::AuditFilter;
use crate::domain::Actor;
use crate::handlers::QueryParams;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::Paged;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PlatformAuditQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub organization_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
}

/// GET /api/root/audit
pub async fn list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    QueryParams(query): QueryParams<PlatformAuditQuery>,
) -> ApiResult<Paged<AuditEntry>> {
    let page = state.page(query.page, query.limit);
    let filter = AuditFilter {
        organization_id: query.organization_id,
        actor_id: query.actor_id,
        action: query.action,
    };
    Ok(ApiResponse::success(state.audit().platform_log(&actor, filter, page).await?))
}
