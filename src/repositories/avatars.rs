use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::Avatar;
use crate::db::types::{AvatarType, UnlockCondition};

const COLUMNS: &str = "\
    id, name, image_url, avatar_type, unlock_condition, required_level, is_active, \
    created_at, updated_at";

pub(crate) struct CreateAvatar<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) image_url: &'a str,
    pub(crate) avatar_type: AvatarType,
    pub(crate) unlock_condition: UnlockCondition,
    pub(crate) required_level: i32,
    pub(crate) is_active: bool,
    pub(crate) now: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateAvatar<'_>) -> Result<Avatar, sqlx::Error> {
    sqlx::query_as::<_, Avatar>(&format!(
        "INSERT INTO avatars (
            id, name, image_url, avatar_type, unlock_condition, required_level, is_active,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.image_url)
    .bind(params.avatar_type)
    .bind(params.unlock_condition)
    .bind(params.required_level)
    .bind(params.is_active)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Avatar>, sqlx::Error> {
    sqlx::query_as::<_, Avatar>(&format!("SELECT {COLUMNS} FROM avatars WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(pool: &PgPool, active_only: bool) -> Result<Vec<Avatar>, sqlx::Error> {
    sqlx::query_as::<_, Avatar>(&format!(
        "SELECT {COLUMNS} FROM avatars
         WHERE ($1 = FALSE OR is_active = TRUE)
         ORDER BY required_level ASC, created_at ASC"
    ))
    .bind(active_only)
    .fetch_all(pool)
    .await
}

pub(crate) async fn unlocked_ids(pool: &PgPool, user_id: &str) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT avatar_id FROM user_avatars WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub(crate) async fn is_unlocked(
    pool: &PgPool,
    user_id: &str,
    avatar_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM user_avatars WHERE user_id = $1 AND avatar_id = $2)",
    )
    .bind(user_id)
    .bind(avatar_id)
    .fetch_one(pool)
    .await
}

/// Idempotent: returns `false` when the user already owned the avatar.
pub(crate) async fn unlock(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    avatar_id: &str,
    unlocked_at: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO user_avatars (user_id, avatar_id, unlocked_at)
         VALUES ($1,$2,$3)
         ON CONFLICT (user_id, avatar_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(avatar_id)
    .bind(unlocked_at)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}
