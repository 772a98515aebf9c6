/// Authentication middleware for protecting routes
///
/// Extracts and validates the Bearer access token from the Authorization
/// header. On success the caller's identity is stored in the request
/// extensions, where handlers pick it up through the [`AuthenticatedUser`]
/// extractor.
use super::jwt::{validate_access_token, AccessClaims, JwtError};
use crate::audit::{audit_log, AuditEvent, RequestOrigin};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Identity of the caller, taken from a validated access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub nickname: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<AccessClaims> for AuthenticatedUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            nickname: claims.nickname,
            first_name: claims.first_name,
            last_name: claims.last_name,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present on routes behind `auth_middleware`
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::NotAuthorized)
    }
}

/// Authentication middleware errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingAuthHeader => AppError::NotAuthorized,
            AuthError::InvalidAuthHeader => {
                AppError::BadRequest("invalid authorization header".to_string())
            }
            AuthError::InvalidToken(JwtError::ExpiredToken) => AppError::ExpiredToken,
            AuthError::InvalidToken(_) => AppError::InvalidToken("invalid token".to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header
///
/// The header must consist of exactly two space-separated parts.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?;

    if value.is_empty() {
        return Err(AuthError::MissingAuthHeader);
    }

    let value = value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

/// Authentication middleware that requires a valid access token
///
/// 1. No Authorization header: rejected with `NotAuthorized`
/// 2. Header not `Bearer <token>`: rejected with `BadRequest`
/// 3. Expired token: `ExpiredToken`; any other validation failure: `InvalidToken`
/// 4. Otherwise the identity is attached and the request forwarded
///
/// ```ignore
/// let protected = Router::new()
///     .route("/articles.create", post(create_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())?;

    let claims = match validate_access_token(&state.jwt_config, token) {
        Ok(claims) => claims,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                reason: e.to_string(),
                origin: RequestOrigin::from_headers(request.headers()),
            });
            return Err(AuthError::InvalidToken(e));
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(claims));

    Ok(next.run(request).await)
}
