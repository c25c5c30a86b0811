use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::user::{ProfileUpdate, UserResponse};

/// Mounted under `/users/me` next to the avatar collection.
pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

async fn get_profile(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

fn required_name<'a>(value: Option<&'a str>, field: &str) -> Result<Option<&'a str>, ApiError> {
    match value.map(str::trim) {
        Some("") => Err(ApiError::BadRequest(format!("{field} cannot be blank"))),
        other => Ok(other),
    }
}

async fn update_profile(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    validate_payload(&payload)?;

    let first_name = required_name(payload.first_name.as_deref(), "first_name")?;
    let last_name = required_name(payload.last_name.as_deref(), "last_name")?;
    let privacy = payload.privacy_settings.unwrap_or_default();

    let updated = repositories::users::update_profile(
        state.db(),
        &user.id,
        repositories::users::UpdateProfile {
            first_name,
            last_name,
            major: payload.major.as_deref().map(str::trim),
            semester: payload.semester.as_deref().map(str::trim),
            bio: payload.bio.as_deref().map(str::trim),
            show_nexons: privacy.show_nexons,
            show_courses: privacy.show_courses,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update profile"))?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %updated.id, "Profile updated");
    Ok(Json(UserResponse::from_db(updated)))
}
