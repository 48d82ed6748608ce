// handlers/admin/buckets.rs - Bucket management

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::Bucket;
use crate::domain::Actor;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::buckets::{CreateBucket, UpdateBucket};
use crate::state::AppState;

/// POST /api/admin/buckets
pub async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    JsonBody(input): JsonBody<CreateBucket>,
) -> ApiResult<Bucket> {
    Ok(ApiResponse::created(state.buckets().create(&actor, input).await?))
}

/// PATCH /api/admin/buckets/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<UpdateBucket>,
) -> ApiResult<Bucket> {
    Ok(ApiResponse::success(state.buckets().update(&actor, id, input).await?))
}

/// DELETE /api/admin/buckets/:id - Tasks in the bucket become unbucketed
pub async fn delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    state.buckets().delete(&actor, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
