mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

use taskhub_api::auth::decode_jwt;
use taskhub_api::database::models::DevicePlatform;
use taskhub_api::domain::{AccessError, Actor};
use taskhub_api::services::impersonation::StartImpersonation;
use taskhub_api::services::organizations::UpdateOrganization;
use taskhub_api::services::sessions::LoginRequest;
use taskhub_api::services::users::ChangePassword;
use taskhub_api::services::ServiceError;
use taskhub_api::{app, AppState};

use common::db::{audit_rows, tenant, test_db, Tenant, PASSWORD};
use common::SECRET;

async fn login(state: &AppState, email: &str) -> String {
    state
        .sessions()
        .login(LoginRequest {
            email: email.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .expect("login")
        .token
}

async fn impersonate(state: &AppState, acme: &Tenant) -> String {
    state
        .impersonation()
        .start(
            &acme.super_admin,
            StartImpersonation {
                organization_id: acme.organization_id,
                reason: "Customer ticket 4411".to_string(),
            },
        )
        .await
        .expect("start impersonation")
        .token
}

async fn validate(state: &AppState, token: &str) -> Result<Actor, ServiceError> {
    let claims = decode_jwt(token, SECRET).expect("decode");
    state.sessions().validate(token, &claims).await
}

fn unauthorized_message(result: Result<Actor, ServiceError>) -> String {
    match result {
        Err(ServiceError::Unauthorized(message)) => message,
        other => panic!("expected unauthorized, got {:?}", other),
    }
}

#[tokio::test]
async fn revoked_token_is_rejected() {
    let Some(db) = test_db().await else { return };
    let state = &db.state;
    let acme = tenant(state).await;

    let token = login(state, &acme.admin_email).await;
    assert_eq!(validate(state, &token).await.unwrap(), acme.admin);

    let claims = decode_jwt(&token, SECRET).unwrap();
    state.sessions().revoke(&token, &claims).await.unwrap();
    assert!(unauthorized_message(validate(state, &token).await).contains("revoked"));

    db.cleanup().await;
}

#[tokio::test]
async fn deactivated_organization_locks_out_its_users() {
    let Some(db) = test_db().await else { return };
    let state = &db.state;
    let acme = tenant(state).await;
    let token = login(state, &acme.admin_email).await;
    assert!(validate(state, &token).await.is_ok());

    state
        .organizations()
        .update(
            &acme.super_admin,
            acme.organization_id,
            UpdateOrganization {
                is_active: Some(false),
                ..UpdateOrganization::default()
            },
        )
        .await
        .unwrap();

    assert!(unauthorized_message(validate(state, &token).await).contains("deactivated"));
    let relogin = state
        .sessions()
        .login(LoginRequest {
            email: acme.admin_email.clone(),
            password: PASSWORD.to_string(),
        })
        .await;
    assert!(matches!(relogin, Err(ServiceError::Unauthorized(_))));

    db.cleanup().await;
}

#[tokio::test]
async fn ended_impersonation_session_is_rejected() {
    let Some(db) = test_db().await else { return };
    let state = &db.state;
    let acme = tenant(state).await;
    let token = impersonate(state, &acme).await;

    let actor = validate(state, &token).await.unwrap();
    assert!(matches!(actor, Actor::Impersonating { organization_id, .. } if organization_id == acme.organization_id));

    sqlx::query("UPDATE impersonation_sessions SET ended_at = now()")
        .execute(db.pool())
        .await
        .unwrap();
    assert!(unauthorized_message(validate(state, &token).await).contains("ended"));

    db.cleanup().await;
}

#[tokio::test]
async fn impersonators_cannot_change_their_own_account() {
    let Some(db) = test_db().await else { return };
    let state = &db.state;
    let acme = tenant(state).await;
    let token = impersonate(state, &acme).await;
    let actor = validate(state, &token).await.unwrap();
    let before = audit_rows(db.pool()).await;

    let changed = state
        .users()
        .change_password(
            &actor,
            ChangePassword {
                current_password: PASSWORD.to_string(),
                new_password: "a brand new passphrase".to_string(),
            },
        )
        .await;
    assert!(matches!(
        changed,
        Err(ServiceError::Access(AccessError::ImpersonationBoundary))
    ));

    let device = state
        .notifications()
        .register_device(&actor, "ExponentPushToken[abc]", DevicePlatform::Ios)
        .await;
    assert!(matches!(
        device,
        Err(ServiceError::Access(AccessError::ImpersonationBoundary))
    ));

    let read_all = state.notifications().mark_all_read(&actor).await;
    assert!(matches!(
        read_all,
        Err(ServiceError::Access(AccessError::ImpersonationBoundary))
    ));

    assert_eq!(audit_rows(db.pool()).await, before);
    login(state, "ops@taskhub.test").await;

    // Same refusal over HTTP, after the session check has passed.
    let req = Request::builder()
        .method("PUT")
        .uri("/api/auth/password")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!(
            r#"{{"current_password":"{}","new_password":"a brand new passphrase"}}"#,
            PASSWORD
        )))
        .unwrap();
    let res = app(state.clone()).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    db.cleanup().await;
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() {
    let Some(db) = test_db().await else { return };
    let state = &db.state;
    let acme = tenant(state).await;

    let unknown = state
        .sessions()
        .login(LoginRequest {
            email: "nobody@acme.test".to_string(),
            password: PASSWORD.to_string(),
        })
        .await;
    let wrong = state
        .sessions()
        .login(LoginRequest {
            email: acme.admin_email.clone(),
            password: "not the password".to_string(),
        })
        .await;
    match (unknown, wrong) {
        (Err(ServiceError::Unauthorized(a)), Err(ServiceError::Unauthorized(b))) => assert_eq!(a, b),
        other => panic!("expected two unauthorized results, got {:?}", other),
    }

    db.cleanup().await;
}
