// handlers/admin/users.rs - User management inside the organization

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::User;
use crate::database::repository::users::UserFilter;
use crate::domain::{Actor, Role};
use crate::handlers::{JsonBody, QueryParams};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::users::{CreateUser, UpdateUser};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// GET /api/admin/users
pub async fn list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    QueryParams(query): QueryParams<UserListQuery>,
) -> ApiResult<Vec<User>> {
    let filter = UserFilter {
        role: query.role,
        is_active: query.is_active,
    };
    Ok(ApiResponse::success(state.users().list(&actor, filter).await?))
}

/// GET /api/admin/users/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<User> {
    Ok(ApiResponse::success(state.users().get(&actor, id).await?))
}

/// POST /api/admin/users - Create an employee or admin
pub async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    JsonBody(input): JsonBody<CreateUser>,
) -> ApiResult<User> {
    Ok(ApiResponse::created(state.users().create(&actor, input).await?))
}

/// PATCH /api/admin/users/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<UpdateUser>,
) -> ApiResult<User> {
    Ok(ApiResponse::success(state.users().update(&actor, id, input).await?))
}

/// DELETE /api/admin/users/:id - Soft delete: the account is deactivated
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<User> {
    Ok(ApiResponse::success(state.users().deactivate(&actor, id).await?))
}
