// handlers/public/root.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - Service name, version and route map
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "TaskHub API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant task management API",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/auth/login, /auth/logout (public)",
                "session": "/api/auth/* (any signed-in user)",
                "tenant": "/api/tasks, /api/buckets, /api/notifications, /api/devices, /api/uploads, /api/calendar.ics",
                "admin": "/api/admin/* (organization admin or impersonator)",
                "root": "/api/root/* (super-admin)",
            }
        }
    }))
}

/// GET /health - Database ping, 503 when unreachable
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();

    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok",
                    "realtime_subscribers": state.notifier.hub().subscriber_count(),
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": true,
                    "message": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                    }
                })),
            )
        }
    }
}
