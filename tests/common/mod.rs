// Shared helpers for the in-process router tests.
//
// `test_app` uses a lazy pool pointed at a closed port, so tests built on it
// only cover paths that answer before any query runs: token decoding, role
// guards, body parsing on public routes. Database-backed tests use `db`.

#![allow(dead_code)]

pub mod db;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use taskhub_api::auth::{generate_jwt, Claims};
use taskhub_api::config::AppConfig;
use taskhub_api::database::Database;
use taskhub_api::domain::Role;
use taskhub_api::services::push::NoopPushSender;
use taskhub_api::{app, AppState};

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.database.url = "postgres://taskhub@127.0.0.1:1/taskhub".to_string();
    config.database.connection_timeout = 1;
    config.security.jwt_secret = SECRET.to_string();
    config.sweep.enabled = false;
    config
}

pub fn test_app() -> Router {
    let config = test_config();
    let db = Database::connect_lazy(&config.database).expect("lazy pool");
    app(AppState::with_parts(db, config, Arc::new(NoopPushSender), None))
}

fn sign(claims: Claims) -> String {
    generate_jwt(&claims, SECRET).expect("sign test token")
}

fn claims(role: Role, org: Option<Uuid>, imp: Option<Uuid>) -> Claims {
    let now = Utc::now();
    Claims {
        sub: Uuid::new_v4(),
        role,
        org,
        imp,
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
    }
}

pub fn employee_token() -> String {
    sign(claims(Role::Employee, Some(Uuid::new_v4()), None))
}

pub fn admin_token() -> String {
    sign(claims(Role::Admin, Some(Uuid::new_v4()), None))
}

pub fn super_admin_token() -> String {
    sign(claims(Role::SuperAdmin, None, None))
}

pub fn impersonation_token() -> String {
    sign(Claims::for_impersonation(
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        Utc::now() + Duration::minutes(30),
    ))
}

pub fn expired_token() -> String {
    let mut expired = claims(Role::Admin, Some(Uuid::new_v4()), None);
    expired.iat -= 7200;
    expired.exp = (Utc::now() - Duration::hours(1)).timestamp();
    sign(expired)
}

pub fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("request")
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

pub async fn send(req: Request<Body>) -> TestResponse {
    let response = test_app().oneshot(req).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    TestResponse { status, headers, body }
}
