//! Account service layer
//!
//! Registration, login and refresh-token rotation on top of a [`UserStore`].
//! Exactly one refresh token is valid per user: login overwrites the stored
//! session and refresh swaps it only if the presented token is still current.

use super::jwt::{issue_token_pair, unix_now, validate_refresh_token, IssuedPair, JwtConfig, TokenPair};
use super::password::{verify_password, PasswordConfig};
use crate::error::{check_length, AppError};
use quire_core::{LimitsConfig, QuireError, RefreshSession, User, UserSummary};
use quire_store::UserStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};
use utoipa::ToSchema;

const USED_OR_INVALID_REFRESH: &str = "used or invalid refresh_token";

/// Plaintext behind the decoy hash; never a stored credential
const DECOY_PASSWORD: &str = "quire-login-decoy";

/// User registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub password: String,
}

/// User login request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub nickname: String,
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Account service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt_config: JwtConfig,
    password_config: PasswordConfig,
    limits: LimitsConfig,
    /// Verified against when the nickname is unknown, so every failed
    /// login costs one Argon2 run
    decoy_hash: Arc<OnceLock<String>>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        jwt_config: JwtConfig,
        password_config: PasswordConfig,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            users,
            jwt_config,
            password_config,
            limits,
            decoy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Share the decoy hash across services built per request
    pub fn with_decoy_hash(mut self, decoy_hash: Arc<OnceLock<String>>) -> Self {
        self.decoy_hash = decoy_hash;
        self
    }

    /// Register a new user
    ///
    /// # Returns
    ///
    /// * `Ok(UserSummary)` - The created user, without credentials
    /// * `Err(AppError)` - `InvalidFieldLength` or `NotUniqueData`
    pub async fn register(&self, request: RegisterRequest) -> Result<UserSummary, AppError> {
        check_length("first_name", &request.first_name, self.limits.first_name)?;
        check_length("last_name", &request.last_name, self.limits.last_name)?;
        check_length("nickname", &request.nickname, self.limits.nickname)?;
        check_length("password", &request.password, self.limits.password)?;

        if self.users.find_user(&request.nickname).await?.is_some() {
            return Err(not_unique_nickname());
        }

        let password_hash = self.hash(request.password).await?;
        let user = User::new(
            request.first_name,
            request.last_name,
            request.nickname,
            password_hash,
        );

        // The lookup above is advisory; the store's uniqueness check is authoritative
        match self.users.insert_user(&user).await {
            Ok(()) => {}
            Err(QuireError::Conflict { .. }) => return Err(not_unique_nickname()),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(nickname = %user.nickname, "User registered");
        Ok(user.summary())
    }

    /// Login with nickname and password
    ///
    /// Unknown nicknames and wrong passwords both yield [`AppError::BadAuth`].
    pub async fn login(&self, request: LoginRequest) -> Result<TokenPair, AppError> {
        check_length("nickname", &request.nickname, self.limits.nickname)?;
        check_length("password", &request.password, self.limits.password)?;

        let Some(user) = self.users.find_user(&request.nickname).await? else {
            tracing::debug!(nickname = %request.nickname, "Login for unknown nickname");
            self.verify_decoy(request.password).await?;
            return Err(AppError::BadAuth);
        };

        if !self.verify(request.password, user.password_hash.clone()).await? {
            tracing::debug!(nickname = %user.nickname, "Login with wrong password");
            return Err(AppError::BadAuth);
        }

        let issued = self.issue(&user)?;
        let session = RefreshSession {
            token_hash: hash_token(&issued.tokens.refresh_token),
            issued_at: to_timestamp(issued.issued_at),
        };
        self.users
            .set_refresh_session(&user.nickname, &session)
            .await?;

        Ok(issued.tokens)
    }

    /// Exchange the current refresh token for a new pair
    ///
    /// The presented token must be the one on record. Rotation is a
    /// compare-and-swap, so two concurrent refreshes with the same token
    /// produce exactly one new pair. Returns the owner along with the pair.
    pub async fn refresh_token_pair(
        &self,
        request: RefreshRequest,
    ) -> Result<(UserSummary, TokenPair), AppError> {
        let claims = validate_refresh_token(&self.jwt_config, &request.refresh_token)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected refresh token");
                AppError::InvalidToken("invalid refresh_token".to_string())
            })?;

        let user = self
            .users
            .find_user(&claims.nickname)
            .await?
            .ok_or_else(|| AppError::InvalidToken("invalid refresh_token".to_string()))?;

        let presented_hash = hash_token(&request.refresh_token);
        let session = match &user.refresh {
            Some(session) if session.token_hash == presented_hash => session,
            _ => {
                tracing::warn!(nickname = %user.nickname, "Refresh token reuse or mismatch");
                return Err(AppError::BadRequest(USED_OR_INVALID_REFRESH.to_string()));
            }
        };

        let now = to_timestamp(unix_now().map_err(AppError::internal)?);
        let ttl = to_timestamp(self.jwt_config.refresh_ttl_secs);
        if now.saturating_sub(session.issued_at) >= ttl {
            return Err(AppError::ExpiredToken);
        }

        let issued = self.issue(&user)?;
        let next = RefreshSession {
            token_hash: hash_token(&issued.tokens.refresh_token),
            issued_at: to_timestamp(issued.issued_at),
        };

        if !self
            .users
            .rotate_refresh_session(&user.nickname, &presented_hash, &next)
            .await?
        {
            tracing::warn!(nickname = %user.nickname, "Lost refresh rotation race");
            return Err(AppError::BadRequest(USED_OR_INVALID_REFRESH.to_string()));
        }

        Ok((user.summary(), issued.tokens))
    }

    fn issue(&self, user: &User) -> Result<IssuedPair, AppError> {
        issue_token_pair(&self.jwt_config, &user.summary())
            .map_err(|e| AppError::internal(format!("Failed to issue tokens: {e}")))
    }

    /// Argon2 is deliberately slow, so it runs off the async workers
    async fn hash(&self, password: String) -> Result<String, AppError> {
        let config = self.password_config.clone();
        tokio::task::spawn_blocking(move || config.hash(&password))
            .await
            .map_err(AppError::internal)?
            .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))
    }

    async fn verify(&self, password: String, hash: String) -> Result<bool, AppError> {
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(AppError::internal)?
            .map_err(|e| AppError::internal(format!("Failed to verify password: {e}")))
    }

    /// Run the verifier against the decoy hash, built on first use with the
    /// current cost parameters
    async fn verify_decoy(&self, password: String) -> Result<(), AppError> {
        let decoy = self.decoy_hash.clone();
        let config = self.password_config.clone();

        tokio::task::spawn_blocking(move || {
            let hash = match decoy.get() {
                Some(hash) => hash,
                None => {
                    let built = config.hash(DECOY_PASSWORD)?;
                    decoy.get_or_init(|| built)
                }
            };
            verify_password(&password, hash)
        })
        .await
        .map_err(AppError::internal)?
        .map_err(|e| AppError::internal(format!("Failed to verify password: {e}")))?;

        Ok(())
    }
}

fn not_unique_nickname() -> AppError {
    AppError::NotUniqueData("user with this nickname already exists".to_string())
}

/// Hash a token for storage (simple SHA-256)
pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn to_timestamp(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}
