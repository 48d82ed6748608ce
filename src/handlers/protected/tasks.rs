// handlers/protected/tasks.rs - /api/tasks handlers for any tenant member
//
// Employees only ever see tasks assigned to them; the service applies the
// scope, so these handlers are shared with admins.

use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::repository::tasks::TaskFilter;
use crate::domain::{Actor, StatusAction, TaskStatus};
use crate::handlers::{OptionalJson, QueryParams};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tasks::{SubmitWork, TaskDetail};
use crate::services::Paged;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<TaskStatus>,
    pub bucket_id: Option<Uuid>,
    /// Ignored for employees.
    pub assignee_id: Option<Uuid>,
    pub due_before: Option<DateTime<Utc>>,
    pub due_after: Option<DateTime<Utc>>,
}

/// GET /api/tasks - List visible tasks, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    QueryParams(query): QueryParams<TaskListQuery>,
) -> ApiResult<Paged<TaskDetail>> {
    let page = state.page(query.page, query.limit);
    let filter = TaskFilter {
        status: query.status,
        bucket_id: query.bucket_id,
        assignee_id: query.assignee_id,
        due_before: query.due_before,
        due_after: query.due_after,
        open_with_due_date: false,
    };
    Ok(ApiResponse::success(state.tasks().list(&actor, filter, page).await?))
}

/// GET /api/tasks/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<TaskDetail> {
    Ok(ApiResponse::success(state.tasks().get(&actor, id).await?))
}

/// POST /api/tasks/:id/accept
pub async fn accept(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<TaskDetail> {
    let task = state
        .tasks()
        .act(&actor, id, StatusAction::Accept, SubmitWork::default())
        .await?;
    Ok(ApiResponse::success(task))
}

/// POST /api/tasks/:id/start
pub async fn start(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<TaskDetail> {
    let task = state
        .tasks()
        .act(&actor, id, StatusAction::Start, SubmitWork::default())
        .await?;
    Ok(ApiResponse::success(task))
}

/// POST /api/tasks/:id/submit - Hand in work, with an optional note and attachment
pub async fn submit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    OptionalJson(work): OptionalJson<SubmitWork>,
) -> ApiResult<TaskDetail> {
    let task = state.tasks().act(&actor, id, StatusAction::Submit, work).await?;
    Ok(ApiResponse::success(task))
}
