use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{FriendRequest, User};
use crate::db::types::FriendRequestStatus;
use crate::repositories;
use crate::services::notifications::{self, NewNotification};

#[derive(Debug, Error)]
pub(crate) enum SocialError {
    #[error("User not found")]
    UserNotFound,
    #[error("You cannot follow yourself")]
    CannotFollowSelf,
    #[error("Already following this user")]
    AlreadyFollowing,
    #[error("Follow relationship not found")]
    NotFollowing,
    #[error("Cannot friend yourself")]
    CannotFriendSelf,
    #[error("Already friends")]
    AlreadyFriends,
    #[error("Request already pending")]
    RequestPending,
    #[error("Request not found")]
    RequestNotFound,
    #[error("Request is not pending")]
    RequestNotPending,
    #[error("Not authorized")]
    NotAuthorized,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// How the viewer relates to a profile owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FriendStatus {
    None,
    Accepted,
    PendingOutgoing,
    PendingIncoming,
}

/// Status plus the id of the pending request the viewer can act on.
pub(crate) fn friend_status(
    viewer_id: &str,
    relationship: Option<&FriendRequest>,
) -> (FriendStatus, Option<String>) {
    match relationship {
        None => (FriendStatus::None, None),
        Some(request) if request.status == FriendRequestStatus::Accepted => {
            (FriendStatus::Accepted, None)
        }
        Some(request) if request.requester_id == viewer_id => {
            (FriendStatus::PendingOutgoing, Some(request.id.clone()))
        }
        Some(request) => (FriendStatus::PendingIncoming, Some(request.id.clone())),
    }
}

pub(crate) fn check_new_request(existing: Option<&FriendRequest>) -> Result<(), SocialError> {
    match existing.map(|request| request.status) {
        None => Ok(()),
        Some(FriendRequestStatus::Accepted) => Err(SocialError::AlreadyFriends),
        Some(FriendRequestStatus::Pending) => Err(SocialError::RequestPending),
    }
}

/// Either side may withdraw, decline or end a relationship.
pub(crate) fn is_party(user_id: &str, request: &FriendRequest) -> bool {
    request.requester_id == user_id || request.recipient_id == user_id
}

async fn load_target(state: &AppState, user_id: &str) -> Result<User, SocialError> {
    repositories::users::find_by_id(state.db(), user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or(SocialError::UserNotFound)
}

pub(crate) async fn follow(
    state: &AppState,
    follower: &User,
    target_id: &str,
) -> Result<(), SocialError> {
    if follower.id == target_id {
        return Err(SocialError::CannotFollowSelf);
    }
    let target = load_target(state, target_id).await?;

    let created =
        repositories::follows::follow(state.db(), &follower.id, &target.id, primitive_now_utc())
            .await?;
    if !created {
        return Err(SocialError::AlreadyFollowing);
    }

    tracing::info!(follower_id = %follower.id, following_id = %target.id, "User followed");
    notifications::notify(state.db(), &target.id, NewNotification::new_follower(&follower.username))
        .await;
    Ok(())
}

pub(crate) async fn unfollow(
    state: &AppState,
    follower: &User,
    target_id: &str,
) -> Result<(), SocialError> {
    if !repositories::follows::unfollow(state.db(), &follower.id, target_id).await? {
        return Err(SocialError::NotFollowing);
    }
    tracing::info!(follower_id = %follower.id, following_id = target_id, "User unfollowed");
    Ok(())
}

pub(crate) async fn send_friend_request(
    state: &AppState,
    requester: &User,
    recipient_id: &str,
) -> Result<FriendRequest, SocialError> {
    if requester.id == recipient_id {
        return Err(SocialError::CannotFriendSelf);
    }
    let recipient = load_target(state, recipient_id).await?;

    let existing =
        repositories::friend_requests::find_between(state.db(), &requester.id, &recipient.id)
            .await?;
    check_new_request(existing.as_ref())?;

    let id = Uuid::new_v4().to_string();
    let created = repositories::friend_requests::create(
        state.db(),
        repositories::friend_requests::CreateFriendRequest {
            id: &id,
            requester_id: &requester.id,
            recipient_id: &recipient.id,
            now: primitive_now_utc(),
        },
    )
    .await?;

    let Some(request) = created else {
        // A concurrent request for the same pair won; report what it left behind.
        let existing =
            repositories::friend_requests::find_between(state.db(), &requester.id, &recipient.id)
                .await?;
        check_new_request(existing.as_ref())?;
        return Err(SocialError::RequestPending);
    };

    tracing::info!(
        request_id = %request.id,
        requester_id = %requester.id,
        recipient_id = %recipient.id,
        "Friend request sent"
    );
    notifications::notify(
        state.db(),
        &recipient.id,
        NewNotification::friend_request(&requester.username),
    )
    .await;
    Ok(request)
}

pub(crate) async fn accept_friend_request(
    state: &AppState,
    user: &User,
    request_id: &str,
) -> Result<FriendRequest, SocialError> {
    let request = repositories::friend_requests::find_by_id(state.db(), request_id)
        .await?
        .ok_or(SocialError::RequestNotFound)?;
    if request.recipient_id != user.id {
        return Err(SocialError::NotAuthorized);
    }

    let accepted =
        repositories::friend_requests::accept(state.db(), &request.id, &user.id, primitive_now_utc())
            .await?
            .ok_or(SocialError::RequestNotPending)?;

    tracing::info!(request_id = %accepted.id, user_id = %user.id, "Friend request accepted");
    notifications::notify(
        state.db(),
        &accepted.requester_id,
        NewNotification::friend_request_accepted(&user.username, &user.id),
    )
    .await;
    Ok(accepted)
}

pub(crate) async fn remove_friend_request(
    state: &AppState,
    user: &User,
    request_id: &str,
) -> Result<(), SocialError> {
    let request = repositories::friend_requests::find_by_id(state.db(), request_id)
        .await?
        .ok_or(SocialError::RequestNotFound)?;
    if !is_party(&user.id, &request) {
        return Err(SocialError::NotAuthorized);
    }

    if !repositories::friend_requests::delete(state.db(), &request.id).await? {
        return Err(SocialError::RequestNotFound);
    }
    tracing::info!(request_id = %request.id, user_id = %user.id, "Friend request removed");
    Ok(())
}
