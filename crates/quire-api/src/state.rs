//! Application state management

use crate::articles::ArticleService;
use crate::auth::{AuthService, JwtConfig, PasswordConfig};
use quire_core::AppConfig;
use quire_store::{ArticleStore, MemoryStore, UserStore};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Application state shared across handlers
///
/// Everything here is read-only after startup; the stores synchronize
/// their own access.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Token signing settings derived from `config.auth`
    pub jwt_config: JwtConfig,
    pub password_config: PasswordConfig,
    pub users: Arc<dyn UserStore>,
    pub articles: Arc<dyn ArticleStore>,
    /// Decoy password hash for logins with unknown nicknames
    login_decoy: Arc<OnceLock<String>>,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        articles: Arc<dyn ArticleStore>,
    ) -> Self {
        Self {
            jwt_config: JwtConfig::from(&config.auth),
            password_config: PasswordConfig::default(),
            config,
            users,
            articles,
            login_decoy: Arc::new(OnceLock::new()),
            start_time: Instant::now(),
        }
    }

    /// State backed by a fresh [`MemoryStore`]
    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store)
    }

    pub fn with_password_config(mut self, password_config: PasswordConfig) -> Self {
        self.password_config = password_config;
        self
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(
            self.users.clone(),
            self.jwt_config.clone(),
            self.password_config.clone(),
            self.config.limits.clone(),
        )
        .with_decoy_hash(self.login_decoy.clone())
    }

    pub fn article_service(&self) -> ArticleService {
        ArticleService::new(self.articles.clone(), self.config.limits.clone())
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
