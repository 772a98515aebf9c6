//! JWT token generation and validation
//!
//! Every successful login or refresh issues a pair of HMAC-signed tokens:
//! - an access token carrying the user's identity and an `exp` claim
//! - a refresh token carrying only the nickname and a unique `jti`
//!
//! Refresh tokens have no `exp`; their lifetime is bounded by the session
//! stored alongside the user. The `token_type` claim keeps one kind of token
//! from being accepted where the other is expected.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use quire_core::{AuthConfig, UserSummary};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Algorithms accepted on validation; anything else, `none` included, is rejected
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims embedded in an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub token_type: TokenType,
    pub nickname: String,
    pub first_name: String,
    pub last_name: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
}

impl AccessClaims {
    pub fn identity(&self) -> UserSummary {
        UserSummary {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            nickname: self.nickname.clone(),
        }
    }
}

/// Claims embedded in a refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub iss: String,
    pub token_type: TokenType,
    pub nickname: String,
    /// Unique per issuance, so rotated tokens never collide
    pub jti: String,
    pub iat: u64,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token signed with an unsupported algorithm")]
    InvalidAlgorithm,

    #[error("Invalid token claims: {0}")]
    InvalidClaims(String),

    #[error("Expected a {expected:?} token")]
    WrongTokenType { expected: TokenType },

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

impl From<ErrorKind> for JwtError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                JwtError::InvalidAlgorithm
            }
            ErrorKind::InvalidIssuer => JwtError::InvalidClaims("unexpected issuer".to_string()),
            ErrorKind::MissingRequiredClaim(claim) => {
                JwtError::InvalidClaims(format!("missing claim {claim}"))
            }
            ErrorKind::Json(e) => JwtError::InvalidClaims(e.to_string()),
            _ => JwtError::InvalidToken,
        }
    }
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    /// Token issuer identifier, checked on validation
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            access_ttl_secs: config.access_ttl_mins * 60,
            refresh_ttl_secs: config.refresh_ttl_mins * 60,
            issuer: config.issuer.clone(),
        }
    }
}

/// Access and refresh token pair returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub access_expires_in: u64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: u64,
}

/// A freshly issued pair and the instant it was issued at
#[derive(Debug, Clone)]
pub struct IssuedPair {
    pub tokens: TokenPair,
    pub issued_at: u64,
}

pub(crate) fn unix_now() -> Result<u64, JwtError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Generate an access token for `identity`, issued at `now`
pub fn generate_access_token(
    config: &JwtConfig,
    identity: &UserSummary,
    now: u64,
) -> Result<String, JwtError> {
    let claims = AccessClaims {
        iss: config.issuer.clone(),
        token_type: TokenType::Access,
        nickname: identity.nickname.clone(),
        first_name: identity.first_name.clone(),
        last_name: identity.last_name.clone(),
        iat: now,
        exp: now + config.access_ttl_secs,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?)
}

/// Generate a refresh token for `nickname`, issued at `now`
pub fn generate_refresh_token(
    config: &JwtConfig,
    nickname: &str,
    now: u64,
) -> Result<String, JwtError> {
    let claims = RefreshClaims {
        iss: config.issuer.clone(),
        token_type: TokenType::Refresh,
        nickname: nickname.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?)
}

/// Issue a new access/refresh pair for `identity`
pub fn issue_token_pair(config: &JwtConfig, identity: &UserSummary) -> Result<IssuedPair, JwtError> {
    let now = unix_now()?;

    Ok(IssuedPair {
        tokens: TokenPair {
            access_token: generate_access_token(config, identity, now)?,
            refresh_token: generate_refresh_token(config, &identity.nickname, now)?,
            access_expires_in: config.access_ttl_secs,
            refresh_expires_in: config.refresh_ttl_secs,
        },
        issued_at: now,
    })
}

fn validation(config: &JwtConfig, expect_exp: bool) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
    validation.set_issuer(&[&config.issuer]);
    validation.leeway = 0;
    if !expect_exp {
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
    }
    validation
}

/// Validate an access token and extract its claims
///
/// Expired tokens are reported as [`JwtError::ExpiredToken`] so callers can
/// tell them apart from forged or malformed ones.
pub fn validate_access_token(config: &JwtConfig, token: &str) -> Result<AccessClaims, JwtError> {
    let token_data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation(config, true),
    )
    .map_err(|e| JwtError::from(e.into_kind()))?;

    if token_data.claims.token_type != TokenType::Access {
        return Err(JwtError::WrongTokenType {
            expected: TokenType::Access,
        });
    }

    Ok(token_data.claims)
}

/// Validate a refresh token's signature and claims
///
/// This does not check whether the token is the one currently on record for
/// the user; that is the session store's job.
pub fn validate_refresh_token(config: &JwtConfig, token: &str) -> Result<RefreshClaims, JwtError> {
    let token_data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation(config, false),
    )
    .map_err(|e| JwtError::from(e.into_kind()))?;

    if token_data.claims.token_type != TokenType::Refresh {
        return Err(JwtError::WrongTokenType {
            expected: TokenType::Refresh,
        });
    }

    Ok(token_data.claims)
}
