use axum::http::{Method, StatusCode};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::Avatar;
use crate::db::types::{AvatarType, UnlockCondition};
use crate::repositories;
use crate::test_support;

async fn insert_avatar(pool: &PgPool, name: &str, avatar_type: AvatarType) -> Avatar {
    repositories::avatars::create(
        pool,
        repositories::avatars::CreateAvatar {
            id: &Uuid::new_v4().to_string(),
            name,
            image_url: &format!("https://cdn.nexus4d.test/avatars/{name}.png"),
            avatar_type,
            unlock_condition: UnlockCondition::Token,
            required_level: 0,
            is_active: true,
            now: primitive_now_utc(),
        },
    )
    .await
    .expect("insert avatar")
}

async fn grant_tokens(pool: &PgPool, user_id: &str, tokens: i32) {
    sqlx::query("UPDATE users SET avatar_unlock_tokens = $1 WHERE id = $2")
        .bind(tokens)
        .bind(user_id)
        .execute(pool)
        .await
        .expect("grant tokens");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn admin_creates_avatar() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "avataradmin01", "admin-pass").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/avatars",
            Some(&token),
            Some(json!({
                "name": "Cyber Fox",
                "imageUrl": "https://cdn.nexus4d.test/avatars/fox.png",
                "type": "premium",
                "unlockCondition": "token"
            })),
        ))
        .await
        .expect("create avatar");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["type"], "premium");
    assert_eq!(body["is_active"], true);
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn unlock_spends_a_token_once() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "collector01", "student-pass").await;
    let premium = insert_avatar(ctx.state.db(), "neon", AvatarType::Premium).await;
    grant_tokens(ctx.state.db(), &student.id, 1).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let unlock = || {
        test_support::json_request(
            Method::POST,
            "/api/v1/users/me/avatars/unlock",
            Some(&token),
            Some(json!({ "avatarId": premium.id })),
        )
    };

    let response = ctx.app.clone().oneshot(unlock()).await.expect("unlock");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["message"], "Avatar unlocked!");
    assert_eq!(body["avatar_unlock_tokens"], 0);

    let response = ctx.app.clone().oneshot(unlock()).await.expect("unlock again");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["detail"], "Avatar already unlocked");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/users/me/avatars",
            Some(&token),
            None,
        ))
        .await
        .expect("list avatars");
    let body = test_support::read_json(response).await;
    let listed = body.as_array().expect("avatars");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["is_unlocked"], true);
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn unlock_without_tokens_is_rejected() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "collector02", "student-pass").await;
    let premium = insert_avatar(ctx.state.db(), "ember", AvatarType::Premium).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users/me/avatars/unlock",
            Some(&token),
            Some(json!({ "avatar_id": premium.id })),
        ))
        .await
        .expect("unlock");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["detail"], "No unlock tokens available");

    let owned = repositories::avatars::is_unlocked(ctx.state.db(), &student.id, &premium.id)
        .await
        .expect("ownership");
    assert!(!owned);
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn equip_requires_ownership_except_defaults() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "collector03", "student-pass").await;
    let default = insert_avatar(ctx.state.db(), "starter", AvatarType::Default).await;
    let premium = insert_avatar(ctx.state.db(), "glitch", AvatarType::Premium).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let equip = |avatar_id: &str| {
        test_support::json_request(
            Method::PUT,
            "/api/v1/users/me/avatar",
            Some(&token),
            Some(json!({ "avatarId": avatar_id })),
        )
    };

    let response = ctx.app.clone().oneshot(equip(&premium.id)).await.expect("equip locked");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx.app.clone().oneshot(equip(&default.id)).await.expect("equip default");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["current_avatar_url"], default.image_url.as_str());

    let response = ctx.app.oneshot(equip("missing-avatar")).await.expect("equip missing");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
