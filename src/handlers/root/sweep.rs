// handlers/root/sweep.rs - POST /api/root/sweep/overdue

use axum::{extract::State, Extension};

use crate::domain::Actor;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::sweep::{run_for, SweepReport};
use crate::state::AppState;

/// POST /api/root/sweep/overdue - Run the overdue sweep now
pub async fn run(State(state): State<AppState>, Extension(actor): Extension<Actor>) -> ApiResult<SweepReport> {
    let report = run_for(&actor, state.db.pool(), &state.notifier).await?;
    Ok(ApiResponse::success(report))
}
