// handlers/protected/buckets.rs - GET /api/buckets

use axum::{extract::State, Extension};

use crate::database::models::Bucket;
use crate::domain::Actor;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/buckets - Buckets of the caller's organization
pub async fn list(State(state): State<AppState>, Extension(actor): Extension<Actor>) -> ApiResult<Vec<Bucket>> {
    Ok(ApiResponse::success(state.buckets().list(&actor).await?))
}
