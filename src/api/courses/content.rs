use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::courses::fetch_course;
use crate::api::errors::ApiError;
use crate::api::validation::validate_payload;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Chapter;
use crate::repositories;
use crate::schemas::course::{
    ChapterCreate, ChapterResponse, ChapterUpdate, MaterialCreate, MaterialResponse,
    MaterialUpdate,
};
use crate::services::{progress, storage};

pub(super) async fn create_chapter(
    Path(course_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ChapterCreate>,
) -> Result<(StatusCode, Json<ChapterResponse>), ApiError> {
    validate_payload(&payload)?;
    fetch_course(&state, &course_id).await?;

    let position = match payload.position {
        Some(position) => position,
        None => repositories::chapters::next_position(state.db(), &course_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to compute chapter position"))?,
    };

    let chapter = repositories::chapters::create(
        state.db(),
        repositories::chapters::CreateChapter {
            id: &Uuid::new_v4().to_string(),
            course_id: &course_id,
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            position,
            xp_reward: payload.xp_reward,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create chapter"))?;

    content_changed(&state, &course_id).await?;
    tracing::info!(
        admin_id = %admin.id,
        course_id = %course_id,
        chapter_id = %chapter.id,
        "Chapter created"
    );
    Ok((StatusCode::CREATED, Json(ChapterResponse::from_db(chapter))))
}

pub(super) async fn update_chapter(
    Path((course_id, chapter_id)): Path<(String, String)>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ChapterUpdate>,
) -> Result<Json<ChapterResponse>, ApiError> {
    validate_payload(&payload)?;
    fetch_chapter(&state, &course_id, &chapter_id).await?;

    let updated = repositories::chapters::update(
        state.db(),
        &chapter_id,
        repositories::chapters::UpdateChapter {
            title: payload.title.map(|title| title.trim().to_string()),
            description: payload.description,
            position: payload.position,
            xp_reward: payload.xp_reward,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update chapter"))?
    .ok_or_else(|| ApiError::NotFound("Chapter not found".to_string()))?;

    Ok(Json(ChapterResponse::from_db(updated)))
}

pub(super) async fn delete_chapter(
    Path((course_id, chapter_id)): Path<(String, String)>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    fetch_chapter(&state, &course_id, &chapter_id).await?;

    let urls = repositories::materials::list_urls_for_chapter(state.db(), &chapter_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list chapter materials"))?;

    let deleted = repositories::chapters::delete(state.db(), &chapter_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete chapter"))?;
    if !deleted {
        return Err(ApiError::NotFound("Chapter not found".to_string()));
    }

    for url in &urls {
        storage::discard(state.storage(), url).await;
    }

    content_changed(&state, &course_id).await?;
    tracing::info!(
        admin_id = %admin.id,
        course_id = %course_id,
        chapter_id = %chapter_id,
        materials = urls.len(),
        "Chapter deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn create_material(
    Path((course_id, chapter_id)): Path<(String, String)>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<MaterialCreate>,
) -> Result<(StatusCode, Json<MaterialResponse>), ApiError> {
    validate_payload(&payload)?;
    fetch_chapter(&state, &course_id, &chapter_id).await?;

    let order_index = match payload.order_index {
        Some(order_index) => order_index,
        None => repositories::materials::next_order_index(state.db(), &chapter_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to compute material order"))?,
    };

    let material = repositories::materials::create(
        state.db(),
        repositories::materials::CreateMaterial {
            id: &Uuid::new_v4().to_string(),
            chapter_id: &chapter_id,
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            material_type: payload.material_type,
            url: payload.url.trim(),
            min_package_tier: payload.min_package_tier,
            order_index,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create material"))?;

    content_changed(&state, &course_id).await?;
    Ok((StatusCode::CREATED, Json(MaterialResponse::from_db(material))))
}

pub(super) async fn update_material(
    Path((course_id, material_id)): Path<(String, String)>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<MaterialUpdate>,
) -> Result<Json<MaterialResponse>, ApiError> {
    validate_payload(&payload)?;
    let existing = fetch_material_url(&state, &course_id, &material_id).await?;
    let tier_changed = payload.min_package_tier.is_some();

    let updated = repositories::materials::update(
        state.db(),
        &material_id,
        repositories::materials::UpdateMaterial {
            title: payload.title.map(|title| title.trim().to_string()),
            description: payload.description,
            material_type: payload.material_type,
            url: payload.url.map(|url| url.trim().to_string()),
            min_package_tier: payload.min_package_tier,
            order_index: payload.order_index,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update material"))?
    .ok_or_else(|| ApiError::NotFound("Material not found".to_string()))?;

    if updated.url != existing {
        storage::discard(state.storage(), &existing).await;
    }
    if tier_changed {
        content_changed(&state, &course_id).await?;
    }

    Ok(Json(MaterialResponse::from_db(updated)))
}

pub(super) async fn delete_material(
    Path((course_id, material_id)): Path<(String, String)>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let url = fetch_material_url(&state, &course_id, &material_id).await?;

    let deleted = repositories::materials::delete(state.db(), &material_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete material"))?;
    if !deleted {
        return Err(ApiError::NotFound("Material not found".to_string()));
    }

    storage::discard(state.storage(), &url).await;
    content_changed(&state, &course_id).await?;

    tracing::info!(
        admin_id = %admin.id,
        course_id = %course_id,
        material_id = %material_id,
        "Material deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_chapter(
    state: &AppState,
    course_id: &str,
    chapter_id: &str,
) -> Result<Chapter, ApiError> {
    repositories::chapters::find_in_course(state.db(), course_id, chapter_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch chapter"))?
        .ok_or_else(|| ApiError::NotFound("Chapter not found".to_string()))
}

async fn fetch_material_url(
    state: &AppState,
    course_id: &str,
    material_id: &str,
) -> Result<String, ApiError> {
    repositories::materials::find_in_course(state.db(), course_id, material_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch material"))?
        .map(|material| material.url)
        .ok_or_else(|| ApiError::NotFound("Material not found".to_string()))
}

/// Keeps the chapter count and every enrollment's progress in line with the
/// course's current content.
async fn content_changed(state: &AppState, course_id: &str) -> Result<(), ApiError> {
    repositories::courses::refresh_total_chapters(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to refresh chapter count"))?;

    progress::recompute_course(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to recompute course progress"))?;
    Ok(())
}
