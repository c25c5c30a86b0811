use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::DiscountType;
use crate::test_support;

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn admin_creates_promo_code_uppercased() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "promoadmin01", "admin-pass").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let payload = json!({
        "code": " spring25 ",
        "discountType": "percentage",
        "discountValue": 25.0,
        "validFrom": "2026-01-01",
        "validUntil": "2026-12-31",
        "usageLimit": 10,
        "applicablePackages": ["advanced", "premium"]
    });

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/promo-codes",
            Some(&token),
            Some(payload.clone()),
        ))
        .await
        .expect("create promo");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["code"], "SPRING25");
    assert_eq!(body["used_count"], 0);
    assert_eq!(body["is_active"], true);
    assert!(body["valid_until"].as_str().expect("valid_until").starts_with("2026-12-31T23:59:59"));

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/promo-codes",
            Some(&token),
            Some(payload),
        ))
        .await
        .expect("create duplicate promo");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn promo_window_must_be_ordered() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "promoadmin02", "admin-pass").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/promo-codes",
            Some(&token),
            Some(json!({
                "code": "BACKWARDS",
                "discount_type": "fixed",
                "discount_value": 5.0,
                "valid_from": "2026-06-01",
                "valid_until": "2026-05-01"
            })),
        ))
        .await
        .expect("create promo");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn short_code_is_rejected_after_trimming() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "promoadmin04", "admin-pass").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/promo-codes",
            Some(&token),
            Some(json!({
                "code": "  ab  ",
                "discount_type": "fixed",
                "discount_value": 5.0,
                "valid_from": "2026-01-01",
                "valid_until": "2026-02-01"
            })),
        ))
        .await
        .expect("create promo");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["detail"], "code must be at least 3 characters");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn validate_reports_unknown_and_inactive_codes() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "promoadmin03", "admin-pass").await;
    let student = test_support::insert_user(ctx.state.db(), "shopper01", "student-pass").await;
    let promo =
        test_support::insert_promo(ctx.state.db(), "SAVE10", DiscountType::Fixed, 10.0, None)
            .await;
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let validate = |code: &str| {
        test_support::json_request(
            Method::POST,
            "/api/v1/promo-codes/validate",
            Some(&token),
            Some(json!({ "code": code, "packageTier": "basic" })),
        )
    };

    let response = ctx.app.clone().oneshot(validate("nope")).await.expect("unknown code");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
    assert_eq!(body["detail"], "Invalid promo code");

    let response = ctx.app.clone().oneshot(validate("save10")).await.expect("valid code");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["valid"], true);
    assert_eq!(body["code"], "SAVE10");
    assert_eq!(body["discount_value"], 10.0);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/promo-codes/{}/toggle", promo.id),
            Some(&admin_token),
            None,
        ))
        .await
        .expect("toggle promo");
    let body = test_support::read_json(response).await;
    assert_eq!(body["is_active"], false);

    let response = ctx.app.oneshot(validate("SAVE10")).await.expect("inactive code");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["detail"], "This promo code is inactive");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn students_cannot_list_promo_codes() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "shopper02", "student-pass").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/promo-codes", Some(&token), None))
        .await
        .expect("list promos");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
