use sqlx::{PgExecutor, PgPool};

use crate::db::models::Chapter;

const COLUMNS: &str =
    "id, course_id, title, description, position, xp_reward, created_at, updated_at";

pub(crate) struct CreateChapter<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) position: i32,
    pub(crate) xp_reward: i64,
    pub(crate) now: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateChapter<'_>) -> Result<Chapter, sqlx::Error> {
    sqlx::query_as::<_, Chapter>(&format!(
        "INSERT INTO chapters (id, course_id, title, description, position, xp_reward, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.position)
    .bind(params.xp_reward)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_in_course(
    pool: &PgPool,
    course_id: &str,
    chapter_id: &str,
) -> Result<Option<Chapter>, sqlx::Error> {
    sqlx::query_as::<_, Chapter>(&format!(
        "SELECT {COLUMNS} FROM chapters WHERE id = $1 AND course_id = $2"
    ))
    .bind(chapter_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_for_course<'e, E>(
    executor: E,
    course_id: &str,
) -> Result<Vec<Chapter>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Chapter>(&format!(
        "SELECT {COLUMNS} FROM chapters WHERE course_id = $1 ORDER BY position ASC, created_at ASC"
    ))
    .bind(course_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn next_position(pool: &PgPool, course_id: &str) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(position), 0) + 1 FROM chapters WHERE course_id = $1",
    )
    .bind(course_id)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateChapter {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) position: Option<i32>,
    pub(crate) xp_reward: Option<i64>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    chapter_id: &str,
    params: UpdateChapter,
) -> Result<Option<Chapter>, sqlx::Error> {
    sqlx::query_as::<_, Chapter>(&format!(
        "UPDATE chapters SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            position = COALESCE($3, position),
            xp_reward = COALESCE($4, xp_reward),
            updated_at = $5
         WHERE id = $6
         RETURNING {COLUMNS}"
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.position)
    .bind(params.xp_reward)
    .bind(params.updated_at)
    .bind(chapter_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, chapter_id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM chapters WHERE id = $1").bind(chapter_id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
