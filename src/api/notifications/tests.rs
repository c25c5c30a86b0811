use axum::http::{Method, StatusCode};
use tower::ServiceExt;

use crate::services::notifications::{self, NewNotification};
use crate::test_support;

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn notifications_are_listed_and_marked_read() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "reader01", "student-pass").await;
    notifications::notify(ctx.state.db(), &student.id, NewNotification::level_up(2, 1)).await;
    notifications::notify(ctx.state.db(), &student.id, NewNotification::level_up(3, 1)).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/notifications",
            Some(&token),
            None,
        ))
        .await
        .expect("list notifications");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["unread_count"], 2);
    let first_id = body["notifications"][0]["id"].as_str().expect("id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/notifications/{first_id}/read"),
            Some(&token),
            None,
        ))
        .await
        .expect("mark read");
    let body = test_support::read_json(response).await;
    assert_eq!(body["is_read"], true);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            "/api/v1/notifications/read-all",
            Some(&token),
            None,
        ))
        .await
        .expect("mark all read");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/notifications",
            Some(&token),
            None,
        ))
        .await
        .expect("list notifications again");
    let body = test_support::read_json(response).await;
    assert_eq!(body["unread_count"], 0);
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn cannot_mark_someone_elses_notification() {
    let ctx = test_support::setup_test_context().await;

    let owner = test_support::insert_user(ctx.state.db(), "reader02", "student-pass").await;
    let other = test_support::insert_user(ctx.state.db(), "reader03", "student-pass").await;
    notifications::notify(ctx.state.db(), &owner.id, NewNotification::level_up(2, 1)).await;
    let owner_token = test_support::bearer_token(&owner.id, ctx.state.settings());
    let other_token = test_support::bearer_token(&other.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/notifications",
            Some(&owner_token),
            None,
        ))
        .await
        .expect("list notifications");
    let body = test_support::read_json(response).await;
    let id = body["notifications"][0]["id"].as_str().expect("id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/notifications/{id}/read"),
            Some(&other_token),
            None,
        ))
        .await
        .expect("mark read as other");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PUT,
            "/api/v1/notifications/missing-id/read",
            Some(&other_token),
            None,
        ))
        .await
        .expect("mark missing");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
