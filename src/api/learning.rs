use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::courses::fetch_course;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::avatar::AvatarResponse;
use crate::schemas::enrollment::EnrollmentResponse;
use crate::schemas::learning::{
    ClaimResponse, CourseClaimResponse, SecureChapterResponse, SecureContentResponse,
    SecureCourseSummary, ToggleMaterialResponse,
};
use crate::services::{access, progress, rewards};

/// Enrolled-student routes, mounted under `/courses`.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:course_id/content", get(secure_content))
        .route("/:course_id/materials/:material_id/toggle", post(toggle_material))
        .route("/:course_id/chapters/:chapter_id/claim", post(claim_chapter))
        .route("/:course_id/claim-rewards", post(claim_course))
}

async fn secure_content(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SecureContentResponse>, ApiError> {
    let course = fetch_course(&state, &course_id).await?;

    let enrollment =
        repositories::enrollments::find_by_user_course(state.db(), &user.id, &course_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load enrollment"))?
            .ok_or(ApiError::Forbidden("Not enrolled in this course"))?;
    if !enrollment.status.grants_access() {
        return Err(ApiError::Forbidden("Enrollment is not active"));
    }

    let content = progress::load_content(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load course content"))?;
    let chapters = access::filter_content(&content, enrollment.package)
        .into_iter()
        .map(SecureChapterResponse::from_content)
        .collect();

    let touched =
        repositories::enrollments::touch_last_accessed(state.db(), &enrollment.id, primitive_now_utc());
    if let Err(err) = touched.await {
        tracing::warn!(
            error = %err,
            enrollment_id = %enrollment.id,
            "Failed to record last access"
        );
    }

    Ok(Json(SecureContentResponse {
        course: SecureCourseSummary {
            id: course.id,
            title: course.title,
            thumbnail_url: course.thumbnail_url,
        },
        chapters,
        user_progress: EnrollmentResponse::from_db(enrollment),
    }))
}

async fn toggle_material(
    Path((course_id, material_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ToggleMaterialResponse>, ApiError> {
    let outcome = progress::toggle_material(state.db(), &user.id, &course_id, &material_id).await?;

    Ok(Json(ToggleMaterialResponse {
        success: true,
        completed: outcome.completed,
        progress: outcome.enrollment.progress,
        completed_chapters: outcome.enrollment.completed_chapter_ids,
        status: outcome.enrollment.status,
    }))
}

async fn claim_chapter(
    Path((course_id, chapter_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim = rewards::claim_chapter(&state, &user.id, &course_id, &chapter_id).await?;
    Ok(Json(ClaimResponse::new(claim.claimed_xp, &claim.level)))
}

async fn claim_course(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CourseClaimResponse>, ApiError> {
    let claim = rewards::claim_course(&state, &user.id, &course_id).await?;

    Ok(Json(CourseClaimResponse {
        claim: ClaimResponse::new(claim.claimed_xp, &claim.level),
        reward_avatar: claim.reward_avatar.map(AvatarResponse::from_db),
    }))
}

#[cfg(test)]
mod tests;
