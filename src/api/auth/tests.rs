use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn register_then_login_and_fetch_me() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": "newcomer",
                "email": "Newcomer@Nexus4D.test",
                "password": "long-enough-pass"
            })),
        ))
        .await
        .expect("register");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["user"]["email"], "newcomer@nexus4d.test");
    assert_eq!(body["user"]["role"], "student");
    assert_eq!(body["user"]["level"], 1);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "newcomer@nexus4d.test", "password": "long-enough-pass" })),
        ))
        .await
        .expect("login");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    let token = body["access_token"].as_str().expect("token").to_string();

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
        .await
        .expect("me");
    let body = test_support::read_json(response).await;
    assert_eq!(body["username"], "newcomer");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn duplicate_email_conflicts() {
    let ctx = test_support::setup_test_context().await;

    test_support::insert_user(ctx.state.db(), "taken", "student-pass").await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": "someone",
                "email": "taken@nexus4d.test",
                "password": "long-enough-pass"
            })),
        ))
        .await
        .expect("register duplicate");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["detail"], "User already exists");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn repeated_bad_logins_are_rate_limited() {
    let ctx = test_support::setup_test_context().await;

    test_support::insert_user(ctx.state.db(), "target", "student-pass").await;
    let attempt = || {
        test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "target@nexus4d.test", "password": "wrong-password" })),
        )
    };

    let limit = ctx.state.settings().security().login_rate_limit;
    for _ in 0..limit {
        let response = ctx.app.clone().oneshot(attempt()).await.expect("login attempt");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = ctx.app.oneshot(attempt()).await.expect("limited attempt");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
