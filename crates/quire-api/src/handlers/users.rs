//! Account API handlers
//!
//! Registration, login and token refresh. Each outcome is recorded in the
//! audit log together with the caller's origin.

use crate::audit::{audit_log, AuditEvent, RequestOrigin};
use crate::auth::{LoginRequest, RefreshRequest, RegisterRequest, TokenPair};
use crate::error::{ApiJson, AppError};
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use quire_core::UserSummary;
use std::sync::Arc;

/// Register a new user account
///
/// Field lengths are checked against the configured limits; the nickname
/// must not be taken.
#[utoipa::path(
    post,
    path = "/api/users.register",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = UserSummary),
        (status = 400, description = "Invalid field length or nickname taken", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<Json<UserSummary>, AppError> {
    let origin = RequestOrigin::from_headers(&headers);
    let nickname = request.nickname.clone();

    match state.auth_service().register(request).await {
        Ok(user) => {
            audit_log(&AuditEvent::RegistrationSuccess {
                nickname: user.nickname.clone(),
                origin,
            });
            Ok(Json(user))
        }
        Err(e) => {
            audit_log(&AuditEvent::RegistrationFailure {
                nickname,
                reason: e.to_string(),
                origin,
            });
            Err(e)
        }
    }
}

/// Login with nickname and password
///
/// Returns a fresh token pair. Unknown nicknames and wrong passwords produce
/// the same response.
#[utoipa::path(
    post,
    path = "/api/users.login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 400, description = "Bad credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let origin = RequestOrigin::from_headers(&headers);
    let nickname = request.nickname.clone();

    match state.auth_service().login(request).await {
        Ok(tokens) => {
            audit_log(&AuditEvent::LoginSuccess { nickname, origin });
            Ok(Json(tokens))
        }
        Err(e) => {
            audit_log(&AuditEvent::LoginFailure {
                nickname,
                reason: e.to_string(),
                origin,
            });
            Err(e)
        }
    }
}

/// Exchange a refresh token for a new token pair
///
/// The presented refresh token stops working once this succeeds.
#[utoipa::path(
    post,
    path = "/api/users.refreshTokenPair",
    tag = "users",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens rotated", body = TokenPair),
        (status = 400, description = "Refresh token already used", body = crate::error::ApiError),
        (status = 401, description = "Invalid refresh token", body = crate::error::ApiError),
        (status = 403, description = "Refresh session expired", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let origin = RequestOrigin::from_headers(&headers);

    match state.auth_service().refresh_token_pair(request).await {
        Ok((user, tokens)) => {
            audit_log(&AuditEvent::TokenRefresh {
                nickname: user.nickname,
                origin,
            });
            Ok(Json(tokens))
        }
        Err(e) => {
            audit_log(&AuditEvent::TokenRefreshFailure {
                reason: e.to_string(),
                origin,
            });
            Err(e)
        }
    }
}
