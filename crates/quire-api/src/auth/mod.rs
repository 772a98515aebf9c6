//! Authentication and authorization module
//!
//! - Password hashing with Argon2id
//! - Access/refresh token issuance and validation
//! - Middleware guarding the authenticated routes
//! - Account service: registration, login and refresh-token rotation

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use jwt::{
    issue_token_pair, validate_access_token, validate_refresh_token, AccessClaims, JwtConfig,
    JwtError, RefreshClaims, TokenPair,
};
pub use middleware::{auth_middleware, AuthError, AuthenticatedUser};
pub use password::{hash_password, verify_password, PasswordConfig, PasswordError};
pub use service::{AuthService, LoginRequest, RefreshRequest, RegisterRequest};
