// routes.rs - Router assembly
//
// Each protected group carries its own middleware stack. axum runs the
// last-added route_layer first, so the layers below read bottom-up:
// decode token, role guard, then session validation against the database.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::handlers::{admin, protected, public, root};
use crate::middleware::{
    jwt_auth_middleware, require_super_admin, require_tenant, require_tenant_admin, validate_session_middleware,
};
use crate::state::AppState;

/// Multipart framing on top of the image itself.
const UPLOAD_OVERHEAD: usize = 64 * 1024;

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/auth/login", post(public::login))
        .route("/auth/logout", post(public::logout))
        // Protected API
        .merge(session_routes(&state))
        .merge(tenant_routes(&state))
        .merge(admin_routes(&state))
        .merge(root_routes(&state))
        .fallback(|| async { ApiError::not_found("Route not found") })
        .with_state(state.clone());

    if state.config.security.enable_cors {
        router = router.layer(cors_layer(&state.config.security));
    }
    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

/// Open to every signed-in identity, plain super-admins included.
fn session_routes(state: &AppState) -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/password", put(auth::change_password))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/impersonation/stop", post(auth::stop_impersonation))
        .route_layer(from_fn_with_state(state.clone(), validate_session_middleware))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn tenant_routes(state: &AppState) -> Router<AppState> {
    use protected::{buckets, calendar, devices, notifications, tasks, uploads};

    let upload_limit = state.config.uploads.max_upload_bytes + UPLOAD_OVERHEAD;

    Router::new()
        // Tasks
        .route("/api/tasks", get(tasks::list))
        .route("/api/tasks/:id", get(tasks::get))
        .route("/api/tasks/:id/accept", post(tasks::accept))
        .route("/api/tasks/:id/start", post(tasks::start))
        .route("/api/tasks/:id/submit", post(tasks::submit))
        .route("/api/calendar.ics", get(calendar::feed))
        .route("/api/buckets", get(buckets::list))
        // Notifications
        .route("/api/notifications", get(notifications::list))
        .route("/api/notifications/count", get(notifications::count))
        .route("/api/notifications/read-all", put(notifications::read_all))
        .route("/api/notifications/stream", get(notifications::stream))
        .route("/api/notifications/:id/read", put(notifications::read))
        .route("/api/devices", post(devices::register).delete(devices::unregister))
        .route(
            "/api/uploads",
            post(uploads::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_layer(from_fn_with_state(state.clone(), validate_session_middleware))
        .route_layer(from_fn(require_tenant))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    use admin::{audit, buckets, tasks, users};

    Router::new()
        .route("/api/admin/tasks", post(tasks::create))
        .route("/api/admin/tasks/:id", patch(tasks::update).delete(tasks::delete))
        .route("/api/admin/tasks/:id/approve", post(tasks::approve))
        .route("/api/admin/tasks/:id/reject", post(tasks::reject))
        .route("/api/admin/buckets", post(buckets::create))
        .route("/api/admin/buckets/:id", patch(buckets::update).delete(buckets::delete))
        .route("/api/admin/users", get(users::list).post(users::create))
        .route(
            "/api/admin/users/:id",
            get(users::get).patch(users::update).delete(users::deactivate),
        )
        .route("/api/admin/audit", get(audit::list))
        .route_layer(from_fn_with_state(state.clone(), validate_session_middleware))
        .route_layer(from_fn(require_tenant_admin))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn root_routes(state: &AppState) -> Router<AppState> {
    use root::{audit, impersonation, organizations, sweep};

    Router::new()
        .route("/api/root/organizations", get(organizations::list).post(organizations::create))
        .route(
            "/api/root/organizations/:id",
            get(organizations::get).patch(organizations::update),
        )
        .route("/api/root/impersonate", post(impersonation::start))
        .route("/api/root/impersonations", get(impersonation::list))
        .route("/api/root/audit", get(audit::list))
        .route("/api/root/sweep/overdue", post(sweep::run))
        .route_layer(from_fn_with_state(state.clone(), validate_session_middleware))
        .route_layer(from_fn(require_super_admin))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

/// Explicit origins get credentialed CORS (cookies); no origins means permissive.
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter(|origin| origin.as_str() != "*")
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
