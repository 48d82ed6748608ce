// handlers/protected/devices.rs - Push device registration

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::{DevicePlatform, DeviceToken};
use crate::domain::Actor;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterDevice {
    pub token: String,
    pub platform: DevicePlatform,
}

#[derive(Debug, Deserialize)]
pub struct UnregisterDevice {
    pub token: String,
}

/// POST /api/devices - Register (or refresh) a push token for the caller
pub async fn register(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    JsonBody(input): JsonBody<RegisterDevice>,
) -> ApiResult<DeviceToken> {
    let device = state
        .notifications()
        .register_device(&actor, &input.token, input.platform)
        .await?;
    Ok(ApiResponse::created(device))
}

/// DELETE /api/devices
pub async fn unregister(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    JsonBody(input): JsonBody<UnregisterDevice>,
) -> ApiResult<Value> {
    state.notifications().unregister_device(&actor, &input.token).await?;
    Ok(ApiResponse::success(json!({ "removed": true })))
}
