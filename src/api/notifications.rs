use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::notification::{NotificationListResponse, NotificationResponse};
use crate::schemas::MessageResponse;

const RECENT_LIMIT: i64 = 20;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", put(mark_all_read))
        .route("/:notification_id/read", put(mark_read))
}

async fn list_notifications(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let notifications = repositories::notifications::list_recent(state.db(), &user.id, RECENT_LIMIT)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list notifications"))?;
    let unread_count = repositories::notifications::count_unread(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count notifications"))?;

    Ok(Json(NotificationListResponse {
        notifications: notifications.into_iter().map(NotificationResponse::from_db).collect(),
        unread_count,
    }))
}

async fn mark_read(
    Path(notification_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification = repositories::notifications::find_by_id(state.db(), &notification_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load notification"))?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;

    if notification.user_id != user.id {
        return Err(ApiError::Forbidden("Not authorized"));
    }

    let updated = repositories::notifications::mark_read(state.db(), &notification.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update notification"))?;

    Ok(Json(NotificationResponse::from_db(updated)))
}

async fn mark_all_read(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let updated = repositories::notifications::mark_all_read(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update notifications"))?;

    tracing::debug!(user_id = %user.id, updated, "Notifications marked as read");
    Ok(Json(MessageResponse::new("All notifications marked as read")))
}

#[cfg(test)]
mod tests;
