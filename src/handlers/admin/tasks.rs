// handlers/admin/tasks.rs - Task management and review

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::{Actor, StatusAction};
use crate::handlers::{JsonBody, OptionalJson};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tasks::{CreateTask, Review, TaskDetail, UpdateTask};
use crate::state::AppState;

/// POST /api/admin/tasks - Create a task and notify its assignees
pub async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    JsonBody(input): JsonBody<CreateTask>,
) -> ApiResult<TaskDetail> {
    Ok(ApiResponse::created(state.tasks().create(&actor, input).await?))
}

/// PATCH /api/admin/tasks/:id
///
/// `description`, `due_at` and `bucket_id` may be sent as `null` to clear them.
pub async fn update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<UpdateTask>,
) -> ApiResult<TaskDetail> {
    Ok(ApiResponse::success(state.tasks().update(&actor, id, input).await?))
}

/// DELETE /api/admin/tasks/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    state.tasks().delete(&actor, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// POST /api/admin/tasks/:id/approve - Approve one submission, or all of them
pub async fn approve(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    OptionalJson(review): OptionalJson<Review>,
) -> ApiResult<TaskDetail> {
    let task = state.tasks().review(&actor, id, StatusAction::Approve, review).await?;
    Ok(ApiResponse::success(task))
}

/// POST /api/admin/tasks/:id/reject - Send work back; `reason` is required
pub async fn reject(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    OptionalJson(review): OptionalJson<Review>,
) -> ApiResult<TaskDetail> {
    let task = state.tasks().review(&actor, id, StatusAction::Reject, review).await?;
    Ok(ApiResponse::success(task))
}
