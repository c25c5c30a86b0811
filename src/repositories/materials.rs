use sqlx::{PgExecutor, PgPool};

use crate::db::models::ChapterMaterial;
use crate::db::types::{MaterialType, PackageTier};

const COLUMNS: &str = "\
    m.id, m.chapter_id, m.title, m.description, m.material_type, m.url, m.min_package_tier, \
    m.order_index, m.created_at, m.updated_at";

pub(crate) struct CreateMaterial<'a> {
    pub(crate) id: &'a str,
    pub(crate) chapter_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) material_type: MaterialType,
    pub(crate) url: &'a str,
    pub(crate) min_package_tier: PackageTier,
    pub(crate) order_index: i32,
    pub(crate) now: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateMaterial<'_>,
) -> Result<ChapterMaterial, sqlx::Error> {
    sqlx::query_as::<_, ChapterMaterial>(&format!(
        "INSERT INTO chapter_materials AS m (
            id, chapter_id, title, description, material_type, url, min_package_tier,
            order_index, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.chapter_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.material_type)
    .bind(params.url)
    .bind(params.min_package_tier)
    .bind(params.order_index)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn next_order_index(pool: &PgPool, chapter_id: &str) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(order_index), -1) + 1 FROM chapter_materials WHERE chapter_id = $1",
    )
    .bind(chapter_id)
    .fetch_one(pool)
    .await
}

/// Looks a material up through its chapter so ids from another course never match.
pub(crate) async fn find_in_course<'e, E>(
    executor: E,
    course_id: &str,
    material_id: &str,
) -> Result<Option<ChapterMaterial>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ChapterMaterial>(&format!(
        "SELECT {COLUMNS}
         FROM chapter_materials m
         JOIN chapters c ON c.id = m.chapter_id
         WHERE m.id = $1 AND c.course_id = $2"
    ))
    .bind(material_id)
    .bind(course_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_for_course<'e, E>(
    executor: E,
    course_id: &str,
) -> Result<Vec<ChapterMaterial>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ChapterMaterial>(&format!(
        "SELECT {COLUMNS}
         FROM chapter_materials m
         JOIN chapters c ON c.id = m.chapter_id
         WHERE c.course_id = $1
         ORDER BY c.position ASC, m.order_index ASC"
    ))
    .bind(course_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_urls_for_chapter(
    pool: &PgPool,
    chapter_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT url FROM chapter_materials WHERE chapter_id = $1")
        .bind(chapter_id)
        .fetch_all(pool)
        .await
}

pub(crate) struct UpdateMaterial {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) material_type: Option<MaterialType>,
    pub(crate) url: Option<String>,
    pub(crate) min_package_tier: Option<PackageTier>,
    pub(crate) order_index: Option<i32>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    material_id: &str,
    params: UpdateMaterial,
) -> Result<Option<ChapterMaterial>, sqlx::Error> {
    sqlx::query_as::<_, ChapterMaterial>(&format!(
        "UPDATE chapter_materials AS m SET
            title = COALESCE($1, m.title),
            description = COALESCE($2, m.description),
            material_type = COALESCE($3, m.material_type),
            url = COALESCE($4, m.url),
            min_package_tier = COALESCE($5, m.min_package_tier),
            order_index = COALESCE($6, m.order_index),
            updated_at = $7
         WHERE m.id = $8
         RETURNING {COLUMNS}"
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.material_type)
    .bind(params.url)
    .bind(params.min_package_tier)
    .bind(params.order_index)
    .bind(params.updated_at)
    .bind(material_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, material_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM chapter_materials WHERE id = $1")
        .bind(material_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
