// handlers/root/organizations.rs - Organization lifecycle

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::Organization;
use crate::domain::Actor;
use crate::handlers::{JsonBody, QueryParams};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::organizations::{CreateOrganization, OrganizationCreated, UpdateOrganization};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrganizationQuery {
    pub active: Option<bool>,
}

/// POST /api/root/organizations - Create an organization with its first admin
pub async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    JsonBody(input): JsonBody<CreateOrganization>,
) -> ApiResult<OrganizationCreated> {
    Ok(ApiResponse::created(state.organizations().create(&actor, input).await?))
}

/// GET /api/root/organizations
pub async fn list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    QueryParams(query): QueryParams<OrganizationQuery>,
) -> ApiResult<Vec<Organization>> {
    Ok(ApiResponse::success(state.organizations().list(&actor, query.active).await?))
}

/// GET /api/root/organizations/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<Organization> {
    Ok(ApiResponse::success(state.organizations().get(&actor, id).await?))
}

/// PATCH /api/root/organizations/:id - Rename or (de)activate
pub async fn update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<UpdateOrganization>,
) -> ApiResult<Organization> {
    Ok(ApiResponse::success(state.organizations().update(&actor, id, input).await?))
}
