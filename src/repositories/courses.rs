use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::Course;
use crate::db::types::{CourseLevel, CourseStatus};

const COURSE_COLUMNS: &str = "\
    id, title, description, thumbnail_url, tutor_id, \
    basic_price, basic_features, advanced_price, advanced_features, premium_price, premium_features, \
    status, category, level, total_duration, total_chapters, enrolled_students, \
    completion_xp_bonus, reward_avatar_id, created_at, updated_at";

pub(crate) struct PackageColumns {
    pub(crate) price: f64,
    pub(crate) features: Vec<String>,
}

pub(crate) struct CreateCourse<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) thumbnail_url: &'a str,
    pub(crate) tutor_id: Option<&'a str>,
    pub(crate) basic: PackageColumns,
    pub(crate) advanced: PackageColumns,
    pub(crate) premium: PackageColumns,
    pub(crate) status: CourseStatus,
    pub(crate) category: &'a str,
    pub(crate) level: CourseLevel,
    pub(crate) total_duration: &'a str,
    pub(crate) completion_xp_bonus: i64,
    pub(crate) reward_avatar_id: Option<&'a str>,
    pub(crate) now: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateCourse<'_>) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "INSERT INTO courses (
            id, title, description, thumbnail_url, tutor_id,
            basic_price, basic_features, advanced_price, advanced_features,
            premium_price, premium_features, status, category, level, total_duration,
            completion_xp_bonus, reward_avatar_id, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19)
         RETURNING {COURSE_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.thumbnail_url)
    .bind(params.tutor_id)
    .bind(params.basic.price)
    .bind(Json(params.basic.features))
    .bind(params.advanced.price)
    .bind(Json(params.advanced.features))
    .bind(params.premium.price)
    .bind(Json(params.premium.features))
    .bind(params.status)
    .bind(params.category)
    .bind(params.level)
    .bind(params.total_duration)
    .bind(params.completion_xp_bonus)
    .bind(params.reward_avatar_id)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    course_id: &str,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"))
        .bind(course_id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct ListCoursesParams {
    pub(crate) include_disabled: bool,
    pub(crate) category: Option<String>,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

pub(crate) async fn list(
    pool: &PgPool,
    params: ListCoursesParams,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses
         WHERE ($1 = TRUE OR status <> 'disabled')
           AND ($2::text IS NULL OR category = $2)
         ORDER BY created_at DESC
         OFFSET $3 LIMIT $4"
    ))
    .bind(params.include_disabled)
    .bind(params.category)
    .bind(params.skip)
    .bind(params.limit)
    .fetch_all(pool)
    .await
}

#[derive(Default)]
pub(crate) struct UpdateCourse {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) thumbnail_url: Option<String>,
    pub(crate) tutor_id: Option<String>,
    pub(crate) basic: Option<PackageColumns>,
    pub(crate) advanced: Option<PackageColumns>,
    pub(crate) premium: Option<PackageColumns>,
    pub(crate) status: Option<CourseStatus>,
    pub(crate) category: Option<String>,
    pub(crate) level: Option<CourseLevel>,
    pub(crate) total_duration: Option<String>,
    pub(crate) completion_xp_bonus: Option<i64>,
    pub(crate) reward_avatar_id: Option<String>,
}

pub(crate) async fn update(
    pool: &PgPool,
    course_id: &str,
    params: UpdateCourse,
    updated_at: time::PrimitiveDateTime,
) -> Result<Option<Course>, sqlx::Error> {
    let (basic_price, basic_features) = split_package(params.basic);
    let (advanced_price, advanced_features) = split_package(params.advanced);
    let (premium_price, premium_features) = split_package(params.premium);

    sqlx::query_as::<_, Course>(&format!(
        "UPDATE courses SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            thumbnail_url = COALESCE($3, thumbnail_url),
            tutor_id = COALESCE($4, tutor_id),
            basic_price = COALESCE($5, basic_price),
            basic_features = COALESCE($6, basic_features),
            advanced_price = COALESCE($7, advanced_price),
            advanced_features = COALESCE($8, advanced_features),
            premium_price = COALESCE($9, premium_price),
            premium_features = COALESCE($10, premium_features),
            status = COALESCE($11, status),
            category = COALESCE($12, category),
            level = COALESCE($13, level),
            total_duration = COALESCE($14, total_duration),
            completion_xp_bonus = COALESCE($15, completion_xp_bonus),
            reward_avatar_id = COALESCE($16, reward_avatar_id),
            updated_at = $17
         WHERE id = $18
         RETURNING {COURSE_COLUMNS}"
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.thumbnail_url)
    .bind(params.tutor_id)
    .bind(basic_price)
    .bind(basic_features)
    .bind(advanced_price)
    .bind(advanced_features)
    .bind(premium_price)
    .bind(premium_features)
    .bind(params.status)
    .bind(params.category)
    .bind(params.level)
    .bind(params.total_duration)
    .bind(params.completion_xp_bonus)
    .bind(params.reward_avatar_id)
    .bind(updated_at)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

fn split_package(package: Option<PackageColumns>) -> (Option<f64>, Option<Json<Vec<String>>>) {
    match package {
        Some(package) => (Some(package.price), Some(Json(package.features))),
        None => (None, None),
    }
}

pub(crate) async fn delete(pool: &PgPool, course_id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM courses WHERE id = $1").bind(course_id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn count_enrollments(pool: &PgPool, course_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
        .bind(course_id)
        .fetch_one(pool)
        .await
}

/// Recounts rather than increments so the cached value cannot drift.
pub(crate) async fn refresh_enrolled_students(
    tx: &mut Transaction<'_, Postgres>,
    course_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "UPDATE courses
         SET enrolled_students = (
             SELECT COUNT(*)::int FROM enrollments
             WHERE course_id = $1 AND status IN ('active', 'completed')
         )
         WHERE id = $1
         RETURNING enrolled_students",
    )
    .bind(course_id)
    .fetch_one(&mut **tx)
    .await
}

pub(crate) async fn refresh_total_chapters(
    pool: &PgPool,
    course_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE courses
         SET total_chapters = (SELECT COUNT(*)::int FROM chapters WHERE course_id = $1)
         WHERE id = $1",
    )
    .bind(course_id)
    .execute(pool)
    .await?;
    Ok(())
}
