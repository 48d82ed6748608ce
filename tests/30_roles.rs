mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn employees_cannot_reach_admin_routes() {
    let token = common::employee_token();
    for (method, uri) in [
        ("GET", "/api/admin/users"),
        ("POST", "/api/admin/tasks"),
        ("DELETE", "/api/admin/buckets/6f1c2f5e-3f0b-4a5e-9d55-0f2b7c1d9a10"),
        ("GET", "/api/admin/audit"),
    ] {
        let res = common::send(common::request(method, uri, Some(&token))).await;
        assert_eq!(res.status, StatusCode::FORBIDDEN, "{} {}", method, uri);
        assert_eq!(res.body["code"], "FORBIDDEN");
    }
}

#[tokio::test]
async fn tenant_roles_cannot_reach_root_routes() {
    for token in [common::employee_token(), common::admin_token()] {
        let res = common::send(common::request("GET", "/api/root/organizations", Some(&token))).await;
        assert_eq!(res.status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn super_admin_needs_an_organization_for_tenant_routes() {
    let token = common::super_admin_token();
    for uri in ["/api/tasks", "/api/admin/users", "/api/notifications"] {
        let res = common::send(common::request("GET", uri, Some(&token))).await;
        assert_eq!(res.status, StatusCode::FORBIDDEN, "{}", uri);
        let message = res.body["message"].as_str().unwrap_or_default();
        assert!(message.contains("impersonation"), "{}: {}", uri, message);
    }
}

#[tokio::test]
async fn impersonators_cannot_reach_platform_routes() {
    let token = common::impersonation_token();
    for (method, uri) in [
        ("GET", "/api/root/organizations"),
        ("POST", "/api/root/impersonate"),
        ("POST", "/api/root/sweep/overdue"),
    ] {
        let res = common::send(common::request(method, uri, Some(&token))).await;
        assert_eq!(res.status, StatusCode::FORBIDDEN, "{} {}", method, uri);
        let message = res.body["message"].as_str().unwrap_or_default();
        assert!(message.contains("impersonation session"), "{}", message);
    }
}
