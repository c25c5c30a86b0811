use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::PrimitiveDateTime;

use crate::db::models::Enrollment;
use crate::db::types::{CourseLevel, EnrollmentStatus, PackageTier};

const COLUMNS: &str = "\
    id, user_id, course_id, package, status, amount_paid, progress, \
    completed_material_ids, completed_chapter_ids, claimed_chapter_ids, is_course_reward_claimed, \
    receipt_url, promo_code, promo_code_id, rejection_reason, last_accessed_at, \
    created_at, updated_at";

const JOINED_COLUMNS: &str = "\
    e.id, e.user_id, e.course_id, e.package, e.status, e.amount_paid, e.progress, \
    e.completed_material_ids, e.completed_chapter_ids, e.claimed_chapter_ids, \
    e.is_course_reward_claimed, e.receipt_url, e.promo_code, e.promo_code_id, \
    e.rejection_reason, e.last_accessed_at, e.created_at, e.updated_at";

#[derive(Debug, Clone, FromRow)]
pub(crate) struct EnrollmentWithCourse {
    #[sqlx(flatten)]
    pub(crate) enrollment: Enrollment,
    pub(crate) course_title: String,
    pub(crate) course_thumbnail_url: String,
    pub(crate) course_level: CourseLevel,
    pub(crate) course_total_duration: String,
    pub(crate) course_completion_xp_bonus: i64,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct AdminEnrollmentRow {
    #[sqlx(flatten)]
    pub(crate) enrollment: Enrollment,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) course_title: String,
    pub(crate) total_count: i64,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!("SELECT {COLUMNS} FROM enrollments WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_user_course(
    pool: &PgPool,
    user_id: &str,
    course_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments WHERE user_id = $1 AND course_id = $2"
    ))
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn lock_by_user_course(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    course_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments WHERE user_id = $1 AND course_id = $2 FOR UPDATE"
    ))
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(&mut **tx)
    .await
}

pub(crate) async fn lock_by_id(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

pub(crate) async fn lock_all_for_course(
    tx: &mut Transaction<'_, Postgres>,
    course_id: &str,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments WHERE course_id = $1 ORDER BY id FOR UPDATE"
    ))
    .bind(course_id)
    .fetch_all(&mut **tx)
    .await
}

pub(crate) struct CreateEnrollment<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) package: PackageTier,
    pub(crate) status: EnrollmentStatus,
    pub(crate) amount_paid: f64,
    pub(crate) receipt_url: &'a str,
    pub(crate) promo_code: Option<&'a str>,
    pub(crate) promo_code_id: Option<&'a str>,
    pub(crate) now: PrimitiveDateTime,
}

/// Returns `None` when a concurrent request created the (user, course) row first.
pub(crate) async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    params: CreateEnrollment<'_>,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "INSERT INTO enrollments (
            id, user_id, course_id, package, status, amount_paid, receipt_url,
            promo_code, promo_code_id, last_accessed_at, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
         ON CONFLICT ON CONSTRAINT enrollments_user_course_key DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.course_id)
    .bind(params.package)
    .bind(params.status)
    .bind(params.amount_paid)
    .bind(params.receipt_url)
    .bind(params.promo_code)
    .bind(params.promo_code_id)
    .bind(params.now)
    .bind(params.now)
    .bind(params.now)
    .fetch_optional(&mut **tx)
    .await
}

pub(crate) struct RenewEnrollment<'a> {
    pub(crate) package: PackageTier,
    pub(crate) status: EnrollmentStatus,
    pub(crate) amount_paid: f64,
    pub(crate) receipt_url: &'a str,
    pub(crate) promo_code: Option<&'a str>,
    pub(crate) promo_code_id: Option<&'a str>,
    pub(crate) progress: i32,
    pub(crate) completed_chapter_ids: &'a [String],
    pub(crate) now: PrimitiveDateTime,
}

/// Overwrites the purchase fields and clears the rejection reason. A previous promo
/// reference is kept unless this renewal applied a new one.
pub(crate) async fn renew(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
    params: RenewEnrollment<'_>,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments SET
            package = $1,
            status = $2,
            amount_paid = $3,
            receipt_url = $4,
            promo_code = COALESCE($5, promo_code),
            promo_code_id = COALESCE($6, promo_code_id),
            progress = $7,
            completed_chapter_ids = $8,
            rejection_reason = NULL,
            updated_at = $9
         WHERE id = $10
         RETURNING {COLUMNS}"
    ))
    .bind(params.package)
    .bind(params.status)
    .bind(params.amount_paid)
    .bind(params.receipt_url)
    .bind(params.promo_code)
    .bind(params.promo_code_id)
    .bind(params.progress)
    .bind(params.completed_chapter_ids)
    .bind(params.now)
    .bind(id)
    .fetch_one(&mut **tx)
    .await
}

/// Moves a pending enrollment to `status`; `None` when it is no longer pending.
/// Approving an enrollment that already sits at 100% lands it on `completed`.
pub(crate) async fn set_review_outcome(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
    status: EnrollmentStatus,
    rejection_reason: Option<&str>,
    now: PrimitiveDateTime,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments
         SET status = CASE
                 WHEN $1 = 'active'::enrollmentstatus AND progress >= 100
                     THEN 'completed'::enrollmentstatus
                 ELSE $1
             END,
             rejection_reason = $2,
             updated_at = $3
         WHERE id = $4 AND status = 'pending'
         RETURNING {COLUMNS}"
    ))
    .bind(status)
    .bind(rejection_reason)
    .bind(now)
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

pub(crate) struct SaveProgress<'a> {
    pub(crate) completed_material_ids: &'a [String],
    pub(crate) completed_chapter_ids: &'a [String],
    pub(crate) progress: i32,
    pub(crate) status: EnrollmentStatus,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn save_progress(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
    params: SaveProgress<'_>,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments SET
            completed_material_ids = $1,
            completed_chapter_ids = $2,
            progress = $3,
            status = $4,
            last_accessed_at = $5,
            updated_at = $5
         WHERE id = $6
         RETURNING {COLUMNS}"
    ))
    .bind(params.completed_material_ids)
    .bind(params.completed_chapter_ids)
    .bind(params.progress)
    .bind(params.status)
    .bind(params.now)
    .bind(id)
    .fetch_one(&mut **tx)
    .await
}

/// Appends `chapter_id` to the claimed set only while it is completed and unclaimed.
pub(crate) async fn claim_chapter(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
    chapter_id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments
         SET claimed_chapter_ids = array_append(claimed_chapter_ids, $2), updated_at = $3
         WHERE id = $1
           AND $2 = ANY(completed_chapter_ids)
           AND NOT ($2 = ANY(claimed_chapter_ids))
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(chapter_id)
    .bind(now)
    .fetch_optional(&mut **tx)
    .await
}

pub(crate) async fn claim_course(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments
         SET is_course_reward_claimed = TRUE, updated_at = $2
         WHERE id = $1 AND progress = 100 AND is_course_reward_claimed = FALSE
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(now)
    .fetch_optional(&mut **tx)
    .await
}

pub(crate) async fn touch_last_accessed(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE enrollments SET last_accessed_at = $1 WHERE id = $2")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<EnrollmentWithCourse>, sqlx::Error> {
    sqlx::query_as::<_, EnrollmentWithCourse>(&format!(
        "SELECT {JOINED_COLUMNS},
                c.title AS course_title,
                c.thumbnail_url AS course_thumbnail_url,
                c.level AS course_level,
                c.total_duration AS course_total_duration,
                c.completion_xp_bonus AS course_completion_xp_bonus
         FROM enrollments e
         JOIN courses c ON c.id = e.course_id
         WHERE e.user_id = $1
         ORDER BY e.updated_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct AdminEnrollmentFilter {
    pub(crate) status: Option<EnrollmentStatus>,
    pub(crate) package: Option<PackageTier>,
    pub(crate) course_id: Option<String>,
    pub(crate) search: Option<String>,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

pub(crate) async fn list_for_admin(
    pool: &PgPool,
    filter: AdminEnrollmentFilter,
) -> Result<Vec<AdminEnrollmentRow>, sqlx::Error> {
    let search = filter.search.map(|value| format!("%{}%", value.to_lowercase()));

    sqlx::query_as::<_, AdminEnrollmentRow>(&format!(
        "SELECT {JOINED_COLUMNS},
                u.username,
                u.email,
                c.title AS course_title,
                COUNT(*) OVER() AS total_count
         FROM enrollments e
         JOIN users u ON u.id = e.user_id
         JOIN courses c ON c.id = e.course_id
         WHERE ($1::enrollmentstatus IS NULL OR e.status = $1)
           AND ($2::packagetier IS NULL OR e.package = $2)
           AND ($3::text IS NULL OR e.course_id = $3)
           AND ($4::text IS NULL OR lower(u.username) LIKE $4 OR lower(u.email) LIKE $4)
         ORDER BY e.created_at DESC
         OFFSET $5
         LIMIT $6"
    ))
    .bind(filter.status)
    .bind(filter.package)
    .bind(filter.course_id)
    .bind(search)
    .bind(filter.skip)
    .bind(filter.limit)
    .fetch_all(pool)
    .await
}
