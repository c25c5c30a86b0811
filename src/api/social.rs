use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentUser, MaybeUser};
use crate::core::state::AppState;
use crate::db::models::UserSummary;
use crate::db::types::{AvatarType, EnrollmentStatus};
use crate::repositories;
use crate::schemas::avatar::AvatarResponse;
use crate::schemas::social::{
    FriendRequestResponse, IncomingFriendRequestResponse, ProfileCourseResponse,
    PublicProfileResponse, SocialStats,
};
use crate::schemas::user::{PublicUserResponse, UserSummaryResponse};
use crate::schemas::MessageResponse;
use crate::services::social::{self, FriendStatus};

/// Mounted under `/social`.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/users/:user_id", get(public_profile))
        .route("/users/:user_id/followers", get(list_user_followers))
        .route("/follow/:user_id", post(follow_user).delete(unfollow_user))
        .route("/following", get(list_following))
        .route("/followers/me", get(list_my_followers))
        .route("/friends", get(list_friends))
        .route("/friends/requests", get(list_incoming_requests))
        .route("/friends/request/:id", post(send_friend_request).delete(remove_friend_request))
        .route("/friends/accept/:request_id", post(accept_friend_request))
}

fn summaries(users: Vec<UserSummary>) -> Json<Vec<UserSummaryResponse>> {
    Json(users.into_iter().map(UserSummaryResponse::from_db).collect())
}

async fn public_profile(
    MaybeUser(viewer): MaybeUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PublicProfileResponse>, ApiError> {
    let db = state.db();
    let user = repositories::users::find_by_id(db, &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let load_err = |e: sqlx::Error| ApiError::internal(e, "Failed to load profile");
    let stats = SocialStats {
        followers: repositories::follows::count_followers(db, &user.id).await.map_err(load_err)?,
        following: repositories::follows::count_following(db, &user.id).await.map_err(load_err)?,
        friends: repositories::friend_requests::count_friends(db, &user.id)
            .await
            .map_err(load_err)?,
    };

    let (is_following, (friend_status, request_id)) = match viewer.as_ref() {
        Some(viewer) if viewer.id != user.id => {
            let following = repositories::follows::is_following(db, &viewer.id, &user.id)
                .await
                .map_err(load_err)?;
            let relationship =
                repositories::friend_requests::find_between(db, &viewer.id, &user.id)
                    .await
                    .map_err(load_err)?;
            (following, social::friend_status(&viewer.id, relationship.as_ref()))
        }
        _ => (false, (FriendStatus::None, None)),
    };

    let unlocked_avatars = if user.show_nexons {
        let unlocked = repositories::avatars::unlocked_ids(db, &user.id).await.map_err(load_err)?;
        repositories::avatars::list(db, true)
            .await
            .map_err(load_err)?
            .into_iter()
            .filter(|avatar| {
                avatar.avatar_type == AvatarType::Default || unlocked.contains(&avatar.id)
            })
            .map(AvatarResponse::from_db)
            .collect()
    } else {
        Vec::new()
    };

    let mut enrolled_courses = Vec::new();
    let mut completed_courses = Vec::new();
    if user.show_courses {
        for row in repositories::enrollments::list_for_user(db, &user.id)
            .await
            .map_err(load_err)?
        {
            match row.enrollment.status {
                EnrollmentStatus::Active => {
                    enrolled_courses.push(ProfileCourseResponse::from_db(row))
                }
                EnrollmentStatus::Completed => {
                    completed_courses.push(ProfileCourseResponse::from_db(row))
                }
                EnrollmentStatus::Pending | EnrollmentStatus::Rejected => {}
            }
        }
    }

    Ok(Json(PublicProfileResponse {
        user: PublicUserResponse::from_db(user),
        stats,
        is_following,
        friend_status,
        request_id,
        unlocked_avatars,
        enrolled_courses,
        completed_courses,
    }))
}

async fn list_user_followers(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<UserSummaryResponse>>, ApiError> {
    let followers = repositories::follows::list_followers(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list followers"))?;
    Ok(summaries(followers))
}

async fn follow_user(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    social::follow(&state, &user, &user_id).await?;
    Ok(Json(MessageResponse::new("Followed successfully")))
}

async fn unfollow_user(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    social::unfollow(&state, &user, &user_id).await?;
    Ok(Json(MessageResponse::new("Unfollowed successfully")))
}

async fn list_following(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummaryResponse>>, ApiError> {
    let following = repositories::follows::list_following(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list following"))?;
    Ok(summaries(following))
}

async fn list_my_followers(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummaryResponse>>, ApiError> {
    let followers = repositories::follows::list_followers(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list followers"))?;
    Ok(summaries(followers))
}

async fn list_friends(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummaryResponse>>, ApiError> {
    let friends = repositories::friend_requests::list_friends(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list friends"))?;
    Ok(summaries(friends))
}

async fn list_incoming_requests(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<IncomingFriendRequestResponse>>, ApiError> {
    let requests = repositories::friend_requests::list_incoming(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list friend requests"))?;
    Ok(Json(requests.into_iter().map(IncomingFriendRequestResponse::from_db).collect()))
}

/// `id` is the recipient's user id.
async fn send_friend_request(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<FriendRequestResponse>), ApiError> {
    let request = social::send_friend_request(&state, &user, &id).await?;
    Ok((StatusCode::CREATED, Json(FriendRequestResponse::from_db(request))))
}

/// `id` is the friend request id; used to cancel, decline or unfriend.
async fn remove_friend_request(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    social::remove_friend_request(&state, &user, &id).await?;
    Ok(Json(MessageResponse::new("Friend request removed")))
}

async fn accept_friend_request(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<FriendRequestResponse>, ApiError> {
    let request = social::accept_friend_request(&state, &user, &request_id).await?;
    Ok(Json(FriendRequestResponse::from_db(request)))
}
