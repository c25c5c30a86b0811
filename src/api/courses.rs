use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::validation::validate_payload;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Course;
use crate::db::types::{CourseStatus, UserRole};
use crate::repositories;
use crate::schemas::course::{
    ChapterOutline, CourseCreate, CourseDetailResponse, CourseListQuery, CourseResponse,
    CourseUpdate, MaterialOutline,
};
use crate::services::progress;

mod content;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/:course_id", get(get_course).put(update_course).delete(delete_course))
        .route("/:course_id/chapters", post(content::create_chapter))
        .route(
            "/:course_id/chapters/:chapter_id",
            put(content::update_chapter).delete(content::delete_chapter),
        )
        .route("/:course_id/chapters/:chapter_id/materials", post(content::create_material))
        .route(
            "/:course_id/materials/:material_id",
            put(content::update_material).delete(content::delete_material),
        )
}

async fn create_course(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    validate_payload(&payload)?;

    let now = primitive_now_utc();
    let packages = payload.packages;
    let course = repositories::courses::create(
        state.db(),
        repositories::courses::CreateCourse {
            id: &Uuid::new_v4().to_string(),
            title: payload.title.trim(),
            description: &payload.description,
            thumbnail_url: &payload.thumbnail_url,
            tutor_id: payload.tutor_id.as_deref(),
            basic: packages.basic.into(),
            advanced: packages.advanced.into(),
            premium: packages.premium.into(),
            status: payload.status,
            category: payload.category.trim(),
            level: payload.level,
            total_duration: &payload.total_duration,
            completion_xp_bonus: payload.completion_xp_bonus,
            reward_avatar_id: payload.reward_avatar_id.as_deref(),
            now,
        },
    )
    .await
    .map_err(|e| reference_error(e, "Failed to create course"))?;

    tracing::info!(admin_id = %admin.id, course_id = %course.id, "Course created");
    Ok((StatusCode::CREATED, Json(CourseResponse::from_db(course))))
}

async fn list_courses(
    user: Option<CurrentUser>,
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let include_disabled = is_admin(user.as_ref());
    let courses = repositories::courses::list(
        state.db(),
        repositories::courses::ListCoursesParams {
            include_disabled,
            category: query.category.filter(|value| !value.trim().is_empty()),
            skip: query.skip.max(0),
            limit: query.limit.clamp(1, 1000),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    Ok(Json(courses.into_iter().map(CourseResponse::from_db).collect()))
}

async fn get_course(
    Path(course_id): Path<String>,
    user: Option<CurrentUser>,
    State(state): State<AppState>,
) -> Result<Json<CourseDetailResponse>, ApiError> {
    let course = fetch_course(&state, &course_id).await?;
    if course.status == CourseStatus::Disabled && !is_admin(user.as_ref()) {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    let content = progress::load_content(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load course content"))?;

    let chapters = content
        .into_iter()
        .map(|entry| ChapterOutline {
            materials: entry
                .materials
                .into_iter()
                .map(|material| MaterialOutline {
                    id: material.id,
                    title: material.title,
                    material_type: material.material_type,
                    min_package_tier: material.min_package_tier,
                })
                .collect(),
            id: entry.chapter.id,
            title: entry.chapter.title,
            description: entry.chapter.description,
            position: entry.chapter.position,
            xp_reward: entry.chapter.xp_reward,
        })
        .collect();

    Ok(Json(CourseDetailResponse { course: CourseResponse::from_db(course), chapters }))
}

async fn update_course(
    Path(course_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<CourseUpdate>,
) -> Result<Json<CourseResponse>, ApiError> {
    validate_payload(&payload)?;

    let updated = repositories::courses::update(
        state.db(),
        &course_id,
        repositories::courses::UpdateCourse {
            title: payload.title.map(|title| title.trim().to_string()),
            description: payload.description,
            thumbnail_url: payload.thumbnail_url,
            tutor_id: payload.tutor_id,
            basic: payload.basic.map(Into::into),
            advanced: payload.advanced.map(Into::into),
            premium: payload.premium.map(Into::into),
            status: payload.status,
            category: payload.category,
            level: payload.level,
            total_duration: payload.total_duration,
            completion_xp_bonus: payload.completion_xp_bonus,
            reward_avatar_id: payload.reward_avatar_id,
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| reference_error(e, "Failed to update course"))?
    .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    tracing::info!(admin_id = %admin.id, course_id = %course_id, "Course updated");
    Ok(Json(CourseResponse::from_db(updated)))
}

async fn delete_course(
    Path(course_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    fetch_course(&state, &course_id).await?;

    let enrollments = repositories::courses::count_enrollments(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count enrollments"))?;
    if enrollments > 0 {
        return Err(ApiError::Conflict(
            "Cannot delete a course that has enrollments".to_string(),
        ));
    }

    let deleted = repositories::courses::delete(state.db(), &course_id).await.map_err(|e| {
        if is_foreign_key_violation(&e) {
            ApiError::Conflict("Cannot delete a course that has enrollments".to_string())
        } else {
            ApiError::internal(e, "Failed to delete course")
        }
    })?;

    if !deleted {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        course_id = %course_id,
        action = "course_delete",
        "Admin deleted course"
    );

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_course(state: &AppState, course_id: &str) -> Result<Course, ApiError> {
    repositories::courses::find_by_id(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))
}

fn is_admin(user: Option<&CurrentUser>) -> bool {
    matches!(user, Some(CurrentUser(user)) if user.role == UserRole::Admin)
}

/// Unknown tutor or reward avatar ids surface as 400 instead of a server error.
fn reference_error(error: sqlx::Error, context: &str) -> ApiError {
    if is_foreign_key_violation(&error) {
        ApiError::BadRequest("Referenced tutor or reward avatar does not exist".to_string())
    } else {
        ApiError::internal(error, context)
    }
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.code().as_deref() == Some("23503"),
        _ => false,
    }
}
