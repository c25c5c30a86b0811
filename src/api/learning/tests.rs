use axum::http::{Method, StatusCode};
use tower::ServiceExt;

use crate::db::types::{EnrollmentStatus, PackageTier};
use crate::repositories;
use crate::test_support::{self, TestContext};

async fn post(ctx: &TestContext, uri: &str, token: &str) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, uri, Some(token), None))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn secure_content_requires_active_enrollment() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "learner01", "student-pass").await;
    let course = test_support::insert_course(ctx.state.db(), "Locked Course", 10.0).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let uri = format!("/api/v1/courses/{}/content", course.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &uri, Some(&token), None))
        .await
        .expect("content without enrollment");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "response: {body}");
    assert_eq!(body["detail"], "Not enrolled in this course");

    test_support::insert_enrollment(
        ctx.state.db(),
        &student.id,
        &course.id,
        PackageTier::Basic,
        EnrollmentStatus::Pending,
    )
    .await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, &uri, Some(&token), None))
        .await
        .expect("content while pending");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "response: {body}");
    assert_eq!(body["detail"], "Enrollment is not active");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn secure_content_filters_materials_by_tier() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "learner02", "student-pass").await;
    let course = test_support::insert_course(ctx.state.db(), "Tiered Course", 0.0).await;
    let chapter = test_support::insert_chapter(ctx.state.db(), &course.id, 1, 10).await;
    let basic =
        test_support::insert_material(ctx.state.db(), &chapter.id, 0, PackageTier::Basic).await;
    test_support::insert_material(ctx.state.db(), &chapter.id, 1, PackageTier::Premium).await;
    test_support::insert_enrollment(
        ctx.state.db(),
        &student.id,
        &course.id,
        PackageTier::Basic,
        EnrollmentStatus::Active,
    )
    .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/courses/{}/content", course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("content");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    let materials = body["chapters"][0]["materials"].as_array().expect("materials");
    assert_eq!(materials.len(), 1);
    assert_eq!(materials[0]["id"], basic.id.as_str());
    assert_eq!(materials[0]["url"], basic.url.as_str());
    assert_eq!(body["user_progress"]["package"], "basic");
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn toggling_material_drives_progress_and_status() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "learner03", "student-pass").await;
    let course = test_support::insert_course(ctx.state.db(), "Toggle Course", 0.0).await;
    let chapter = test_support::insert_chapter(ctx.state.db(), &course.id, 1, 10).await;
    let material =
        test_support::insert_material(ctx.state.db(), &chapter.id, 0, PackageTier::Basic).await;
    // Invisible to a basic enrollment, so it never counts toward progress.
    test_support::insert_material(ctx.state.db(), &chapter.id, 1, PackageTier::Premium).await;
    test_support::insert_enrollment(
        ctx.state.db(),
        &student.id,
        &course.id,
        PackageTier::Basic,
        EnrollmentStatus::Active,
    )
    .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let uri = format!("/api/v1/courses/{}/materials/{}/toggle", course.id, material.id);

    let (status, body) = post(&ctx, &uri, &token).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["completed"], true);
    assert_eq!(body["progress"], 100);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["completed_chapters"][0], chapter.id.as_str());

    let (status, body) = post(&ctx, &uri, &token).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["completed"], false);
    assert_eq!(body["progress"], 0);
    assert_eq!(body["status"], "active");
    assert_eq!(body["completed_chapters"].as_array().expect("chapters").len(), 0);
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn chapter_reward_levels_up_once() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "learner04", "student-pass").await;
    let course = test_support::insert_course(ctx.state.db(), "Reward Course", 0.0).await;
    let chapter = test_support::insert_chapter(ctx.state.db(), &course.id, 1, 600).await;
    let material =
        test_support::insert_material(ctx.state.db(), &chapter.id, 0, PackageTier::Basic).await;
    test_support::insert_enrollment(
        ctx.state.db(),
        &student.id,
        &course.id,
        PackageTier::Basic,
        EnrollmentStatus::Active,
    )
    .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let claim_uri = format!("/api/v1/courses/{}/chapters/{}/claim", course.id, chapter.id);

    let (status, body) = post(&ctx, &claim_uri, &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["detail"], "Chapter not completed yet");

    let toggle_uri = format!("/api/v1/courses/{}/materials/{}/toggle", course.id, material.id);
    let (status, _) = post(&ctx, &toggle_uri, &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(&ctx, &claim_uri, &token).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["claimed_xp"], 600);
    assert_eq!(body["new_total_xp"], 600);
    assert_eq!(body["new_level"], 2);
    assert_eq!(body["leveled_up"], true);
    assert_eq!(body["new_tokens"], 1);

    let (status, body) = post(&ctx, &claim_uri, &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["detail"], "Reward already claimed");

    let user = repositories::users::find_by_id(ctx.state.db(), &student.id)
        .await
        .expect("find user")
        .expect("user exists");
    assert_eq!(user.xp_points, 600);
    assert_eq!(user.avatar_unlock_tokens, 1);
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn course_reward_needs_full_progress() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "learner05", "student-pass").await;
    let course = test_support::insert_course(ctx.state.db(), "Bonus Course", 0.0).await;
    let chapter = test_support::insert_chapter(ctx.state.db(), &course.id, 1, 10).await;
    let material =
        test_support::insert_material(ctx.state.db(), &chapter.id, 0, PackageTier::Basic).await;
    test_support::insert_enrollment(
        ctx.state.db(),
        &student.id,
        &course.id,
        PackageTier::Basic,
        EnrollmentStatus::Active,
    )
    .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let claim_uri = format!("/api/v1/courses/{}/claim-rewards", course.id);

    let (status, body) = post(&ctx, &claim_uri, &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["detail"], "Course not 100% completed");

    let toggle_uri = format!("/api/v1/courses/{}/materials/{}/toggle", course.id, material.id);
    let (status, _) = post(&ctx, &toggle_uri, &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(&ctx, &claim_uri, &token).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["claimed_xp"], 100);
    assert!(body["reward_avatar"].is_null());

    let (status, body) = post(&ctx, &claim_uri, &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["detail"], "Rewards already claimed");

    let unread = repositories::notifications::count_unread(ctx.state.db(), &student.id)
        .await
        .expect("count unread");
    assert_eq!(unread, 1);
}

#[tokio::test]
#[ignore = "requires postgres and redis"]
async fn concurrent_chapter_claims_grant_xp_once() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "learner07", "student-pass").await;
    let course = test_support::insert_course(ctx.state.db(), "Race Course", 0.0).await;
    let chapter = test_support::insert_chapter(ctx.state.db(), &course.id, 1, 50).await;
    let material =
        test_support::insert_material(ctx.state.db(), &chapter.id, 0, PackageTier::Basic).await;
    test_support::insert_enrollment(
        ctx.state.db(),
        &student.id,
        &course.id,
        PackageTier::Basic,
        EnrollmentStatus::Active,
    )
    .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let toggle_uri = format!("/api/v1/courses/{}/materials/{}/toggle", course.id, material.id);
    let (status, _) = post(&ctx, &toggle_uri, &token).await;
    assert_eq!(status, StatusCode::OK);

    let claim_uri = format!("/api/v1/courses/{}/chapters/{}/claim", course.id, chapter.id);
    let ((first, first_body), (second, second_body)) =
        tokio::join!(post(&ctx, &claim_uri, &token), post(&ctx, &claim_uri, &token));

    let mut statuses = [first, second];
    statuses.sort();
    assert_eq!(
        statuses,
        [StatusCode::OK, StatusCode::BAD_REQUEST],
        "responses: {first_body} / {second_body}"
    );
    let rejected = if first == StatusCode::BAD_REQUEST { &first_body } else { &second_body };
    assert_eq!(rejected["detail"], "Reward already claimed");

    let user = repositories::users::find_by_id(ctx.state.db(), &student.id)
        .await
        .expect("find user")
        .expect("user exists");
    assert_eq!(user.xp_points, 50);

    let enrollment =
        repositories::enrollments::find_by_user_course(ctx.state.db(), &student.id, &course.id)
            .await
            .expect("find enrollment")
            .expect("enrollment exists");
    assert_eq!(enrollment.claimed_chapter_ids, vec![chapter.id.clone()]);
}
