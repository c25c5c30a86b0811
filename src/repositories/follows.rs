use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::UserSummary;

const SUMMARY_COLUMNS: &str =
    "u.id, u.username, u.first_name, u.last_name, u.current_avatar_url, u.role, u.level";

/// Returns `false` when the follow already existed.
pub(crate) async fn follow(
    pool: &PgPool,
    follower_id: &str,
    following_id: &str,
    created_at: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO follows (follower_id, following_id, created_at)
         VALUES ($1,$2,$3)
         ON CONFLICT (follower_id, following_id) DO NOTHING",
    )
    .bind(follower_id)
    .bind(following_id)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn unfollow(
    pool: &PgPool,
    follower_id: &str,
    following_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
        .bind(follower_id)
        .bind(following_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn is_following(
    pool: &PgPool,
    follower_id: &str,
    following_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)",
    )
    .bind(follower_id)
    .bind(following_id)
    .fetch_one(pool)
    .await
}

/// Users `user_id` follows, most recent first.
pub(crate) async fn list_following(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(&format!(
        "SELECT {SUMMARY_COLUMNS}
         FROM follows f
         JOIN users u ON u.id = f.following_id
         WHERE f.follower_id = $1
         ORDER BY f.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Users following `user_id`, most recent first.
pub(crate) async fn list_followers(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(&format!(
        "SELECT {SUMMARY_COLUMNS}
         FROM follows f
         JOIN users u ON u.id = f.follower_id
         WHERE f.following_id = $1
         ORDER BY f.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_followers(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE following_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn count_following(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}
