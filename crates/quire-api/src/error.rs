//! API error handling
//!
//! Every failure leaves the server as `{"error_code": <int>, "message": <str>}`.
//! The integer codes are part of the wire contract; clients switch on them,
//! so variants must never be renumbered.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quire_core::QuireError;
use serde::{Serialize, Serializer};
use utoipa::ToSchema;

/// Stable numeric error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    BadRequest = 0,
    InternalError = 1,
    BadAuth = 2,
    NotAuthorized = 3,
    InvalidToken = 4,
    ExpiredToken = 5,
    NotUniqueData = 6,
    InvalidFieldLength = 7,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::BadRequest
            | ErrorCode::BadAuth
            | ErrorCode::NotUniqueData
            | ErrorCode::InvalidFieldLength => StatusCode::BAD_REQUEST,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::NotAuthorized | ErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ErrorCode::ExpiredToken => StatusCode::FORBIDDEN,
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// API error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Numeric error code
    #[schema(value_type = u8, example = 2)]
    pub error_code: ErrorCode,
    /// Human-readable message
    pub message: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// Details are logged, never returned
    Internal(String),
    BadAuth,
    NotAuthorized,
    InvalidToken(String),
    ExpiredToken,
    NotUniqueData(String),
    InvalidFieldLength(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::BadRequest(_) => ErrorCode::BadRequest,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::BadAuth => ErrorCode::BadAuth,
            AppError::NotAuthorized => ErrorCode::NotAuthorized,
            AppError::InvalidToken(_) => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::NotUniqueData(_) => ErrorCode::NotUniqueData,
            AppError::InvalidFieldLength(_) => ErrorCode::InvalidFieldLength,
        }
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        AppError::Internal(detail.to_string())
    }

    /// Message sent to the client
    pub fn message(&self) -> String {
        match self {
            AppError::BadRequest(msg)
            | AppError::InvalidToken(msg)
            | AppError::NotUniqueData(msg)
            | AppError::InvalidFieldLength(msg) => msg.clone(),
            AppError::Internal(_) => "internal error".to_string(),
            AppError::BadAuth => "user with this nickname or password is not registered".to_string(),
            AppError::NotAuthorized => "not authorized".to_string(),
            AppError::ExpiredToken => "token expired".to_string(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Internal(detail) => write!(f, "internal error: {detail}"),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Request failed with internal error");
        }

        let code = self.code();
        let body = ApiError {
            error_code: code,
            message: self.message(),
        };

        (code.status(), Json(body)).into_response()
    }
}

impl From<QuireError> for AppError {
    fn from(err: QuireError) -> Self {
        match err {
            QuireError::NotFound(msg) => AppError::BadRequest(format!("{msg} not found")),
            QuireError::Conflict { field, value } => {
                AppError::NotUniqueData(format!("{field} {value} already exists"))
            }
            QuireError::DatabaseError(msg) => AppError::Internal(format!("Database error: {msg}")),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        AppError::BadRequest("bad JSON structure".to_string())
    }
}

/// JSON body extractor that reports decode failures in the API error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Check that `value` is within `min..=max` characters
pub(crate) fn check_length(
    field: &str,
    value: &str,
    bounds: quire_core::LengthBounds,
) -> Result<(), AppError> {
    if bounds.contains(value) {
        Ok(())
    } else {
        Err(AppError::InvalidFieldLength(format!(
            "{field} length < {} or > {}",
            bounds.min, bounds.max
        )))
    }
}
