use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::User;
use crate::db::types::UserRole;
use crate::services::leveling::Progression;

const COLUMNS: &str = "\
    id, username, email, hashed_password, role, xp_points, level, avatar_unlock_tokens, \
    current_avatar_url, is_active, first_name, last_name, major, semester, bio, \
    show_nexons, show_courses, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE lower(email) = lower($1)"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists_by_email(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1))")
        .bind(email)
        .fetch_one(pool)
        .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) id: &'a str,
    pub(crate) username: &'a str,
    pub(crate) email: &'a str,
    pub(crate) hashed_password: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, username, email, hashed_password, role, is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.username)
    .bind(params.email)
    .bind(params.hashed_password)
    .bind(params.role)
    .bind(params.is_active)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateAccount {
    pub(crate) hashed_password: Option<String>,
    pub(crate) role: Option<UserRole>,
    pub(crate) is_active: Option<bool>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update_account(
    pool: &PgPool,
    id: &str,
    params: UpdateAccount,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET
            hashed_password = COALESCE($1, hashed_password),
            role = COALESCE($2, role),
            is_active = COALESCE($3, is_active),
            updated_at = $4
         WHERE id = $5",
    )
    .bind(params.hashed_password)
    .bind(params.role)
    .bind(params.is_active)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

pub(crate) async fn save_progression(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
    progression: &Progression,
    updated_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users
         SET xp_points = $1, level = $2, avatar_unlock_tokens = $3, updated_at = $4
         WHERE id = $5",
    )
    .bind(progression.xp_points)
    .bind(progression.level)
    .bind(progression.avatar_unlock_tokens)
    .bind(updated_at)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Returns the remaining token count, or `None` when the user had no token to spend.
pub(crate) async fn spend_unlock_token(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
    updated_at: time::PrimitiveDateTime,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "UPDATE users
         SET avatar_unlock_tokens = avatar_unlock_tokens - 1, updated_at = $1
         WHERE id = $2 AND avatar_unlock_tokens > 0
         RETURNING avatar_unlock_tokens",
    )
    .bind(updated_at)
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

pub(crate) async fn set_current_avatar(
    pool: &PgPool,
    id: &str,
    avatar_url: &str,
    updated_at: time::PrimitiveDateTime,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET current_avatar_url = $1, updated_at = $2 WHERE id = $3
         RETURNING {COLUMNS}"
    ))
    .bind(avatar_url)
    .bind(updated_at)
    .bind(id)
    .fetch_one(pool)
    .await
}

/// `None` fields keep their stored value.
pub(crate) struct UpdateProfile<'a> {
    pub(crate) first_name: Option<&'a str>,
    pub(crate) last_name: Option<&'a str>,
    pub(crate) major: Option<&'a str>,
    pub(crate) semester: Option<&'a str>,
    pub(crate) bio: Option<&'a str>,
    pub(crate) show_nexons: Option<bool>,
    pub(crate) show_courses: Option<bool>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update_profile(
    pool: &PgPool,
    id: &str,
    params: UpdateProfile<'_>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET
            first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            major = COALESCE($3, major),
            semester = COALESCE($4, semester),
            bio = COALESCE($5, bio),
            show_nexons = COALESCE($6, show_nexons),
            show_courses = COALESCE($7, show_courses),
            updated_at = $8
         WHERE id = $9
         RETURNING {COLUMNS}"
    ))
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.major)
    .bind(params.semester)
    .bind(params.bio)
    .bind(params.show_nexons)
    .bind(params.show_courses)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}
