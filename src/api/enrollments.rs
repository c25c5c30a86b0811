use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::api::uploads::read_file_field;
use crate::api::validation::validate_upload;
use crate::core::state::AppState;
use crate::db::types::{EnrollmentStatus, PackageTier};
use crate::repositories;
use crate::schemas::enrollment::{
    AdminEnrollmentQuery, AdminEnrollmentResponse, EnrollResponse, EnrolledCourseResponse,
    EnrollmentCheckResponse, EnrollmentResponse, RejectEnrollmentRequest,
};
use crate::services::enrollment::{self, EnrollRequest, ReceiptUpload};

/// Student-facing routes, mounted under `/courses`.
pub(crate) fn course_router() -> Router<AppState> {
    Router::new()
        .route("/enrolled", get(list_enrolled))
        .route("/:course_id/enroll", post(enroll))
        .route("/:course_id/enrollment", get(check_enrollment))
}

/// Review queue, mounted under `/admin/enrollments`.
pub(crate) fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_for_admin))
        .route("/:enrollment_id/approve", post(approve))
        .route("/:enrollment_id/reject", post(reject))
}

#[derive(Debug, Default)]
struct EnrollForm {
    package: Option<String>,
    promo_code: Option<String>,
    receipt: Option<ReceiptUpload>,
}

async fn enroll(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<EnrollResponse>), ApiError> {
    let form = read_enroll_form(&state, multipart).await?;

    let outcome = enrollment::enroll(
        &state,
        EnrollRequest {
            user_id: &user.id,
            course_id: &course_id,
            package: form.package.as_deref(),
            promo_code: form.promo_code.as_deref(),
            receipt: form.receipt,
        },
    )
    .await?;

    let message = match outcome.enrollment.status {
        EnrollmentStatus::Pending => "Enrollment submitted. Awaiting admin approval.",
        _ => "Enrollment successful",
    };
    let status = if outcome.created { StatusCode::CREATED } else { StatusCode::OK };

    Ok((
        status,
        Json(EnrollResponse {
            message: message.to_string(),
            enrollment: EnrollmentResponse::from_db(outcome.enrollment),
            price: outcome.discount.into(),
            promo_applied: outcome.promo_applied,
        }),
    ))
}

async fn read_enroll_form(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<EnrollForm, ApiError> {
    let mut form = EnrollForm::default();
    let max_upload_size_mb = state.settings().storage().max_upload_size_mb;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "receipt" | "file" => {
                let file = read_file_field(field, max_upload_size_mb).await?;
                validate_upload(
                    &file.filename,
                    &file.content_type,
                    |ext| state.settings().storage().is_allowed_receipt_extension(ext),
                )?;
                form.receipt = Some(ReceiptUpload {
                    filename: file.filename,
                    content_type: file.content_type,
                    bytes: file.bytes,
                });
            }
            "package" | "promoCode" | "promo_code" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest(format!("Invalid {name} field")))?;
                if name == "package" {
                    form.package = Some(text);
                } else {
                    form.promo_code = Some(text);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn list_enrolled(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<EnrolledCourseResponse>>, ApiError> {
    let rows = repositories::enrollments::list_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;

    Ok(Json(rows.into_iter().map(EnrolledCourseResponse::from_row).collect()))
}

async fn check_enrollment(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<EnrollmentCheckResponse>, ApiError> {
    let enrollment =
        repositories::enrollments::find_by_user_course(state.db(), &user.id, &course_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load enrollment"))?;

    Ok(Json(EnrollmentCheckResponse {
        is_enrolled: enrollment.is_some(),
        enrollment: enrollment.map(EnrollmentResponse::from_db),
    }))
}

async fn list_for_admin(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Query(query): Query<AdminEnrollmentQuery>,
) -> Result<Json<PaginatedResponse<AdminEnrollmentResponse>>, ApiError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => Some(EnrollmentStatus::Pending),
        Some("all") => None,
        Some(value) => Some(value.parse::<EnrollmentStatus>().map_err(ApiError::BadRequest)?),
    };
    let package = match query.package.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(value) => Some(value.parse::<PackageTier>().map_err(ApiError::BadRequest)?),
    };
    let course_id = query
        .course_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && value != "all");
    let search = query
        .search
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let skip = query.skip.max(0);
    let limit = query.limit.clamp(1, 1000);
    let rows = repositories::enrollments::list_for_admin(
        state.db(),
        repositories::enrollments::AdminEnrollmentFilter {
            status,
            package,
            course_id,
            search,
            skip,
            limit,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;

    let total_count = rows.first().map(|row| row.total_count).unwrap_or(0);
    let items = rows.into_iter().map(AdminEnrollmentResponse::from_row).collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

async fn approve(
    Path(enrollment_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let enrollment = enrollment::approve(&state, &enrollment_id).await?;
    tracing::info!(
        admin_id = %admin.id,
        enrollment_id = %enrollment_id,
        "Admin approved enrollment"
    );
    Ok(Json(EnrollmentResponse::from_db(enrollment)))
}

async fn reject(
    Path(enrollment_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    payload: Option<Json<RejectEnrollmentRequest>>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    let enrollment = enrollment::reject(&state, &enrollment_id, payload.reason.as_deref()).await?;
    tracing::info!(
        admin_id = %admin.id,
        enrollment_id = %enrollment_id,
        "Admin rejected enrollment"
    );
    Ok(Json(EnrollmentResponse::from_db(enrollment)))
}
