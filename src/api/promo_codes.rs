use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::validation::validate_payload;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::{end_of_day, parse_date_or_datetime, primitive_now_utc};
use crate::repositories;
use crate::schemas::promo::{
    PromoCodeCreate, PromoCodeResponse, PromoValidateRequest, PromoValidateResponse,
};
use crate::services::promo;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_promo_codes).post(create_promo_code))
        .route("/validate", post(validate_promo_code))
        .route("/:promo_id/toggle", post(toggle_promo_code))
}

async fn validate_promo_code(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<PromoValidateRequest>,
) -> Result<Json<PromoValidateResponse>, ApiError> {
    let code = payload.code.as_deref().map(promo::normalize_code).unwrap_or_default();
    if code.is_empty() {
        return Err(ApiError::BadRequest("Code is required".to_string()));
    }

    let found = repositories::promo_codes::find_by_code(state.db(), &code)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load promo code"))?;

    let course_id = payload.course_id.as_deref().filter(|value| !value.trim().is_empty());
    if let Err(rejection) =
        promo::check(found.as_ref(), course_id, payload.package_tier, primitive_now_utc())
    {
        tracing::info!(
            user_id = %user.id,
            code = %code,
            reason = rejection.reason(),
            "Promo code rejected"
        );
        return Err(rejection.into());
    }

    let promo = found.ok_or_else(|| ApiError::NotFound("Invalid promo code".to_string()))?;
    Ok(Json(PromoValidateResponse {
        valid: true,
        code: promo.code,
        discount_type: promo.discount_type,
        discount_value: promo.discount_value,
    }))
}

async fn create_promo_code(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<PromoCodeCreate>,
) -> Result<(StatusCode, Json<PromoCodeResponse>), ApiError> {
    validate_payload(&payload)?;

    let code = promo::new_code(&payload.code).ok_or_else(|| {
        ApiError::BadRequest(format!("code must be at least {} characters", promo::MIN_CODE_LEN))
    })?;

    let valid_from = parse_date_or_datetime(&payload.valid_from)
        .ok_or_else(|| ApiError::BadRequest("Invalid validFrom date".to_string()))?;
    let valid_until = parse_date_or_datetime(&payload.valid_until)
        .map(end_of_day)
        .ok_or_else(|| ApiError::BadRequest("Invalid validUntil date".to_string()))?;
    if valid_until < valid_from {
        return Err(ApiError::BadRequest("validUntil must not precede validFrom".to_string()));
    }

    let created = repositories::promo_codes::create(
        state.db(),
        repositories::promo_codes::CreatePromoCode {
            id: &Uuid::new_v4().to_string(),
            code: &code,
            discount_type: payload.discount_type,
            discount_value: payload.discount_value,
            valid_from,
            valid_until,
            usage_limit: payload.usage_limit,
            applicable_courses: payload.applicable_courses,
            applicable_packages: payload.applicable_packages,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create promo code"))?
    .ok_or_else(|| ApiError::Conflict("Promo code already exists".to_string()))?;

    tracing::info!(
        admin_id = %admin.id,
        promo_id = %created.id,
        code = %created.code,
        "Promo code created"
    );
    Ok((StatusCode::CREATED, Json(PromoCodeResponse::from_db(created))))
}

async fn list_promo_codes(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<PromoCodeResponse>>, ApiError> {
    let promos = repositories::promo_codes::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list promo codes"))?;

    Ok(Json(promos.into_iter().map(PromoCodeResponse::from_db).collect()))
}

async fn toggle_promo_code(
    Path(promo_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PromoCodeResponse>, ApiError> {
    let promo = repositories::promo_codes::toggle_active(state.db(), &promo_id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to toggle promo code"))?
        .ok_or_else(|| ApiError::NotFound("Promo code not found".to_string()))?;

    tracing::info!(
        admin_id = %admin.id,
        promo_id = %promo.id,
        is_active = promo.is_active,
        "Promo code toggled"
    );
    Ok(Json(PromoCodeResponse::from_db(promo)))
}

#[cfg(test)]
mod tests;
