use axum::{
    extract::State,
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
use crate::db::models::Avatar;
use crate::db::types::AvatarType;
use crate::repositories;
use crate::schemas::avatar::{
    AvatarCreate, AvatarResponse, AvatarSelection, AvatarUnlockResponse, UserAvatarResponse,
};
use crate::schemas::user::UserResponse;

/// Catalogue administration, mounted under `/avatars`.
pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_all).post(create_avatar))
}

/// The caller's collection, mounted under `/users/me`.
pub(crate) fn me_router() -> Router<AppState> {
    Router::new()
        .route("/avatars", get(list_mine))
        .route("/avatars/unlock", post(unlock_avatar))
        .route("/avatar", put(equip_avatar))
}

async fn create_avatar(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<AvatarCreate>,
) -> Result<(StatusCode, Json<AvatarResponse>), ApiError> {
    validate_payload(&payload)?;

    let avatar = repositories::avatars::create(
        state.db(),
        repositories::avatars::CreateAvatar {
            id: &Uuid::new_v4().to_string(),
            name: payload.name.trim(),
            image_url: payload.image_url.trim(),
            avatar_type: payload.avatar_type,
            unlock_condition: payload.unlock_condition,
            required_level: payload.required_level,
            is_active: payload.is_active,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create avatar"))?;

    tracing::info!(admin_id = %admin.id, avatar_id = %avatar.id, "Avatar created");
    Ok((StatusCode::CREATED, Json(AvatarResponse::from_db(avatar))))
}

async fn list_all(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<AvatarResponse>>, ApiError> {
    let avatars = repositories::avatars::list(state.db(), false)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list avatars"))?;

    Ok(Json(avatars.into_iter().map(AvatarResponse::from_db).collect()))
}

async fn list_mine(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserAvatarResponse>>, ApiError> {
    let avatars = repositories::avatars::list(state.db(), true)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list avatars"))?;
    let unlocked = repositories::avatars::unlocked_ids(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list unlocked avatars"))?;

    let response = avatars
        .into_iter()
        .map(|avatar| {
            let is_unlocked =
                avatar.avatar_type == AvatarType::Default || unlocked.contains(&avatar.id);
            UserAvatarResponse { avatar: AvatarResponse::from_db(avatar), is_unlocked }
        })
        .collect();

    Ok(Json(response))
}

async fn unlock_avatar(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AvatarSelection>,
) -> Result<Json<AvatarUnlockResponse>, ApiError> {
    let avatar = fetch_active_avatar(&state, &payload.avatar_id).await?;
    if avatar.avatar_type == AvatarType::Default || owns_avatar(&state, &user.id, &avatar).await? {
        return Err(ApiError::BadRequest("Avatar already unlocked".to_string()));
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let remaining = repositories::users::spend_unlock_token(&mut tx, &user.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to spend unlock token"))?
        .ok_or_else(|| ApiError::BadRequest("No unlock tokens available".to_string()))?;

    let unlocked = repositories::avatars::unlock(&mut tx, &user.id, &avatar.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to unlock avatar"))?;
    if !unlocked {
        // A concurrent request got there first; dropping the transaction refunds the token.
        return Err(ApiError::BadRequest("Avatar already unlocked".to_string()));
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit avatar unlock"))?;

    tracing::info!(
        user_id = %user.id,
        avatar_id = %avatar.id,
        remaining,
        "Avatar unlocked with token"
    );
    Ok(Json(AvatarUnlockResponse {
        message: "Avatar unlocked!".to_string(),
        avatar: AvatarResponse::from_db(avatar),
        avatar_unlock_tokens: remaining,
    }))
}

async fn equip_avatar(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AvatarSelection>,
) -> Result<Json<UserResponse>, ApiError> {
    let avatar = repositories::avatars::find_by_id(state.db(), &payload.avatar_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load avatar"))?
        .ok_or_else(|| ApiError::NotFound("Avatar not found".to_string()))?;

    if avatar.avatar_type != AvatarType::Default && !owns_avatar(&state, &user.id, &avatar).await? {
        return Err(ApiError::Forbidden("You have not unlocked this avatar"));
    }

    let updated = repositories::users::set_current_avatar(
        state.db(),
        &user.id,
        &avatar.image_url,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to equip avatar"))?;

    Ok(Json(UserResponse::from_db(updated)))
}

async fn fetch_active_avatar(state: &AppState, avatar_id: &str) -> Result<Avatar, ApiError> {
    repositories::avatars::find_by_id(state.db(), avatar_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load avatar"))?
        .filter(|avatar| avatar.is_active)
        .ok_or_else(|| ApiError::NotFound("Avatar not found".to_string()))
}

async fn owns_avatar(state: &AppState, user_id: &str, avatar: &Avatar) -> Result<bool, ApiError> {
    repositories::avatars::is_unlocked(state.db(), user_id, &avatar.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check avatar ownership"))
}

#[cfg(test)]
mod tests;
