mod common;

use axum::http::{header, StatusCode};

#[tokio::test]
async fn root_describes_the_service() {
    let res = common::send(common::request("GET", "/", None)).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["data"]["name"], "TaskHub API");
    assert!(res.body["data"]["endpoints"]["root"].is_string());
}

#[tokio::test]
async fn health_reports_unreachable_database() {
    let res = common::send(common::request("GET", "/health", None)).await;

    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["data"]["status"], "degraded");
}

#[tokio::test]
async fn unknown_routes_use_the_error_envelope() {
    let res = common::send(common::request("GET", "/nope", None)).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], true);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn login_rejects_malformed_json() {
    let res = common::send(common::json_request("POST", "/auth/login", "{\"email\":")).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "INVALID_JSON");
}

#[tokio::test]
async fn login_requires_both_fields() {
    let res = common::send(common::json_request("POST", "/auth/login", r#"{"email":"a@b.co"}"#)).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "INVALID_JSON");
}

#[tokio::test]
async fn logout_without_session_still_clears_cookie() {
    let res = common::send(common::request("POST", "/auth/logout", None)).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["revoked"], false);
    let cookie = res
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("taskhub_session=;"));
    assert!(cookie.contains("Max-Age=0"));
}
