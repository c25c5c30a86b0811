use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::enrollment::EnrollError;
use crate::services::progress::ProgressError;
use crate::services::promo::PromoRejection;
use crate::services::rewards::ClaimError;
use crate::services::social::SocialError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response = (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                let status = StatusCode::FORBIDDEN;
                (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response()
            }
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::NotFound(message) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Conflict(message) => {
                let status = StatusCode::CONFLICT;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::TooManyRequests(message) => {
                let status = StatusCode::TOO_MANY_REQUESTS;
                (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response()
            }
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                let status = StatusCode::SERVICE_UNAVAILABLE;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
        }
    }
}

impl From<EnrollError> for ApiError {
    fn from(err: EnrollError) -> Self {
        match err {
            EnrollError::CourseNotFound | EnrollError::EnrollmentNotFound => {
                ApiError::NotFound(err.to_string())
            }
            EnrollError::InvalidPackage(message) => ApiError::BadRequest(message),
            EnrollError::ReceiptRequired
            | EnrollError::AlreadyEnrolled(_)
            | EnrollError::NotPending => ApiError::BadRequest(err.to_string()),
            EnrollError::StorageUnavailable => ApiError::ServiceUnavailable(err.to_string()),
            EnrollError::Storage(source) => ApiError::internal(source, "Failed to upload receipt"),
            EnrollError::Database(source) => {
                ApiError::internal(source, "Failed to process enrollment")
            }
        }
    }
}

impl From<ProgressError> for ApiError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::EnrollmentNotFound | ProgressError::MaterialNotFound => {
                ApiError::NotFound(err.to_string())
            }
            ProgressError::Database(source) => ApiError::internal(source, "Failed to update progress"),
        }
    }
}

impl From<ClaimError> for ApiError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::EnrollmentNotFound
            | ClaimError::ChapterNotFound
            | ClaimError::UserNotFound
            | ClaimError::CourseNotFound => ApiError::NotFound(err.to_string()),
            ClaimError::NotCompleted(message) | ClaimError::AlreadyClaimed(message) => {
                ApiError::BadRequest(message.to_string())
            }
            ClaimError::Database(source) => ApiError::internal(source, "Failed to claim reward"),
        }
    }
}

impl From<SocialError> for ApiError {
    fn from(err: SocialError) -> Self {
        match err {
            SocialError::UserNotFound
            | SocialError::NotFollowing
            | SocialError::RequestNotFound => ApiError::NotFound(err.to_string()),
            SocialError::NotAuthorized => ApiError::Forbidden("Not authorized"),
            SocialError::Database(source) => {
                ApiError::internal(source, "Failed to update relationship")
            }
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<PromoRejection> for ApiError {
    fn from(err: PromoRejection) -> Self {
        match err {
            PromoRejection::NotFound => ApiError::NotFound(err.to_string()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::PackageTier;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn enrollment_errors_map_to_http_statuses() {
        assert_eq!(status_of(EnrollError::CourseNotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(status_of(EnrollError::ReceiptRequired.into()), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(EnrollError::AlreadyEnrolled(PackageTier::Basic).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(EnrollError::StorageUnavailable.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn claim_errors_keep_their_message() {
        let err: ApiError = ClaimError::AlreadyClaimed("Reward already claimed").into();
        match err {
            ApiError::BadRequest(message) => assert_eq!(message, "Reward already claimed"),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn unknown_promo_is_not_found() {
        assert_eq!(status_of(PromoRejection::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(status_of(PromoRejection::Expired.into()), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn social_errors_map_to_http_statuses() {
        assert_eq!(status_of(SocialError::RequestNotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(status_of(SocialError::NotAuthorized.into()), StatusCode::FORBIDDEN);
        assert_eq!(status_of(SocialError::AlreadyFriends.into()), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unauthorized_sets_bearer_challenge() {
        let response = ApiError::Unauthorized("nope").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
