use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use time::PrimitiveDateTime;

use crate::db::models::PromoCode;
use crate::db::types::{DiscountType, PackageTier};

const COLUMNS: &str = "\
    id, code, discount_type, discount_value, valid_from, valid_until, usage_limit, used_count, \
    is_active, applicable_courses, applicable_packages, created_at, updated_at";

pub(crate) struct CreatePromoCode<'a> {
    pub(crate) id: &'a str,
    pub(crate) code: &'a str,
    pub(crate) discount_type: DiscountType,
    pub(crate) discount_value: f64,
    pub(crate) valid_from: PrimitiveDateTime,
    pub(crate) valid_until: PrimitiveDateTime,
    pub(crate) usage_limit: Option<i32>,
    pub(crate) applicable_courses: Vec<String>,
    pub(crate) applicable_packages: Vec<PackageTier>,
    pub(crate) now: PrimitiveDateTime,
}

/// Returns `None` when the code already exists.
pub(crate) async fn create(
    pool: &PgPool,
    params: CreatePromoCode<'_>,
) -> Result<Option<PromoCode>, sqlx::Error> {
    sqlx::query_as::<_, PromoCode>(&format!(
        "INSERT INTO promo_codes (
            id, code, discount_type, discount_value, valid_from, valid_until, usage_limit,
            applicable_courses, applicable_packages, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
         ON CONFLICT (code) DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.code)
    .bind(params.discount_type)
    .bind(params.discount_value)
    .bind(params.valid_from)
    .bind(params.valid_until)
    .bind(params.usage_limit)
    .bind(Json(params.applicable_courses))
    .bind(Json(params.applicable_packages))
    .bind(params.now)
    .bind(params.now)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_code(
    pool: &PgPool,
    code: &str,
) -> Result<Option<PromoCode>, sqlx::Error> {
    sqlx::query_as::<_, PromoCode>(&format!("SELECT {COLUMNS} FROM promo_codes WHERE code = $1"))
        .bind(code)
        .fetch_optional(pool)
        .await
}

/// Locks the code so evaluation and the usage increment see the same `used_count`.
pub(crate) async fn lock_by_code(
    tx: &mut Transaction<'_, Postgres>,
    code: &str,
) -> Result<Option<PromoCode>, sqlx::Error> {
    sqlx::query_as::<_, PromoCode>(&format!(
        "SELECT {COLUMNS} FROM promo_codes WHERE code = $1 FOR UPDATE"
    ))
    .bind(code)
    .fetch_optional(&mut **tx)
    .await
}

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<PromoCode>, sqlx::Error> {
    sqlx::query_as::<_, PromoCode>(&format!(
        "SELECT {COLUMNS} FROM promo_codes ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub(crate) async fn toggle_active(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<PromoCode>, sqlx::Error> {
    sqlx::query_as::<_, PromoCode>(&format!(
        "UPDATE promo_codes SET is_active = NOT is_active, updated_at = $1 WHERE id = $2
         RETURNING {COLUMNS}"
    ))
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn increment_usage(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE promo_codes SET used_count = used_count + 1, updated_at = $1 WHERE id = $2")
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
