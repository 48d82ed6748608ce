// handlers/protected/notifications.rs - /api/notifications handlers
//
// The stream endpoint is Server-Sent Events: one `notification` event per
// stored notification addressed to the caller, keep-alive comments between.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::Notification;
use crate::domain::{Actor, Permission};
use crate::error::ApiError;
use crate::handlers::QueryParams;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::notifications::UnreadCount;
use crate::services::Paged;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub unread_only: bool,
}

/// GET /api/notifications
pub async fn list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    QueryParams(query): QueryParams<NotificationQuery>,
) -> ApiResult<Paged<Notification>> {
    let page = state.page(query.page, query.limit);
    let notifications = state.notifications().list(&actor, query.unread_only, page).await?;
    Ok(ApiResponse::success(notifications))
}

/// GET /api/notifications/count - Unread count
pub async fn count(State(state): State<AppState>, Extension(actor): Extension<Actor>) -> ApiResult<UnreadCount> {
    Ok(ApiResponse::success(state.notifications().unread_count(&actor).await?))
}

/// PUT /api/notifications/:id/read
pub async fn read(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<Notification> {
    Ok(ApiResponse::success(state.notifications().mark_read(&actor, id).await?))
}

/// PUT /api/notifications/read-all
pub async fn read_all(State(state): State<AppState>, Extension(actor): Extension<Actor>) -> ApiResult<Value> {
    let updated = state.notifications().mark_all_read(&actor).await?;
    Ok(ApiResponse::success(json!({ "updated": updated })))
}

/// GET /api/notifications/stream - Live notifications over SSE
pub async fn stream(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    actor.authorize(Permission::ViewNotifications)?;
    let user_id = actor.user_id();
    tracing::debug!(%user_id, "notification stream opened");

    use tokio_stream::StreamExt as _;
    let stream = state
        .notifier
        .hub()
        .subscribe(user_id)
        .filter_map(|notification| match serde_json::to_string(&notification) {
            Ok(json) => Some(Ok(Event::default()
                .event("notification")
                .id(notification.id.to_string())
                .data(json))),
            Err(e) => {
                tracing::warn!("failed to encode notification: {}", e);
                None
            }
        });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keepalive")))
}
