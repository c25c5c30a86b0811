use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::{validate_password_len, validate_payload};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::{LoginRequest, RegisterRequest, TokenResponse};
use crate::schemas::user::UserResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    validate_payload(&payload)?;
    validate_password_len(&payload.password)?;

    let email = payload.email.trim().to_lowercase();
    check_rate_limit(&state, "register", &email).await?;

    let exists = repositories::users::exists_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if exists {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = primitive_now_utc();
    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: payload.username.trim(),
            email: &email,
            hashed_password,
            role: UserRole::Student,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Conflict("User already exists".to_string())
        }
        other => ApiError::internal(other, "Failed to create user"),
    })?;

    tracing::info!(user_id = %user.id, "User registered");
    let response = token_response(&state, user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    validate_payload(&payload)?;

    let email = payload.email.trim().to_lowercase();
    check_rate_limit(&state, "login", &email).await?;

    let user = repositories::users::find_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Invalid email or password"))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Invalid email or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Invalid email or password"));
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is deactivated"));
    }

    Ok(Json(token_response(&state, user)?))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn check_rate_limit(state: &AppState, action: &str, email: &str) -> Result<(), ApiError> {
    let security = state.settings().security();
    let rate_key = format!("rl:{action}:{email}");
    let allowed = state
        .redis()
        .rate_limit(&rate_key, security.login_rate_limit, security.login_rate_window_seconds)
        .await
        .unwrap_or(true);

    if allowed {
        Ok(())
    } else {
        tracing::warn!(action, "Auth rate limit exceeded");
        Err(ApiError::TooManyRequests("Too many attempts, try again later"))
    }
}

fn token_response(state: &AppState, user: User) -> Result<TokenResponse, ApiError> {
    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    })
}

#[cfg(test)]
mod tests;
