use sqlx::{FromRow, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::{FriendRequest, UserSummary};
use crate::db::types::FriendRequestStatus;

const COLUMNS: &str = "id, requester_id, recipient_id, status, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub(crate) struct IncomingRequestRow {
    pub(crate) request_id: String,
    pub(crate) requested_at: PrimitiveDateTime,
    #[sqlx(flatten)]
    pub(crate) requester: UserSummary,
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<FriendRequest>, sqlx::Error> {
    sqlx::query_as::<_, FriendRequest>(&format!(
        "SELECT {COLUMNS} FROM friend_requests WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// The relationship row for the pair, regardless of who asked.
pub(crate) async fn find_between(
    pool: &PgPool,
    user_a: &str,
    user_b: &str,
) -> Result<Option<FriendRequest>, sqlx::Error> {
    sqlx::query_as::<_, FriendRequest>(&format!(
        "SELECT {COLUMNS} FROM friend_requests
         WHERE (requester_id = $1 AND recipient_id = $2)
            OR (requester_id = $2 AND recipient_id = $1)"
    ))
    .bind(user_a)
    .bind(user_b)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateFriendRequest<'a> {
    pub(crate) id: &'a str,
    pub(crate) requester_id: &'a str,
    pub(crate) recipient_id: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

/// Returns `None` when a row for the pair already exists.
pub(crate) async fn create(
    pool: &PgPool,
    params: CreateFriendRequest<'_>,
) -> Result<Option<FriendRequest>, sqlx::Error> {
    sqlx::query_as::<_, FriendRequest>(&format!(
        "INSERT INTO friend_requests (id, requester_id, recipient_id, status, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$5)
         ON CONFLICT DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.requester_id)
    .bind(params.recipient_id)
    .bind(FriendRequestStatus::Pending)
    .bind(params.now)
    .fetch_optional(pool)
    .await
}

/// Accepts only a pending request addressed to `recipient_id`.
pub(crate) async fn accept(
    pool: &PgPool,
    id: &str,
    recipient_id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<FriendRequest>, sqlx::Error> {
    sqlx::query_as::<_, FriendRequest>(&format!(
        "UPDATE friend_requests SET status = $1, updated_at = $2
         WHERE id = $3 AND recipient_id = $4 AND status = $5
         RETURNING {COLUMNS}"
    ))
    .bind(FriendRequestStatus::Accepted)
    .bind(now)
    .bind(id)
    .bind(recipient_id)
    .bind(FriendRequestStatus::Pending)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM friend_requests WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// The other side of every accepted relationship of `user_id`.
pub(crate) async fn list_friends(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(
        "SELECT u.id, u.username, u.first_name, u.last_name, u.current_avatar_url, u.role, u.level
         FROM friend_requests fr
         JOIN users u ON u.id = CASE
             WHEN fr.requester_id = $1 THEN fr.recipient_id
             ELSE fr.requester_id
         END
         WHERE (fr.requester_id = $1 OR fr.recipient_id = $1) AND fr.status = $2
         ORDER BY fr.updated_at DESC",
    )
    .bind(user_id)
    .bind(FriendRequestStatus::Accepted)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_incoming(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<IncomingRequestRow>, sqlx::Error> {
    sqlx::query_as::<_, IncomingRequestRow>(
        "SELECT fr.id AS request_id, fr.created_at AS requested_at,
                u.id, u.username, u.first_name, u.last_name, u.current_avatar_url, u.role, u.level
         FROM friend_requests fr
         JOIN users u ON u.id = fr.requester_id
         WHERE fr.recipient_id = $1 AND fr.status = $2
         ORDER BY fr.created_at DESC",
    )
    .bind(user_id)
    .bind(FriendRequestStatus::Pending)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_friends(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM friend_requests
         WHERE (requester_id = $1 OR recipient_id = $1) AND status = $2",
    )
    .bind(user_id)
    .bind(FriendRequestStatus::Accepted)
    .fetch_one(pool)
    .await
}
