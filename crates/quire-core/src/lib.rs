//! Quire Core - Domain models and shared types
//!
//! This crate defines the abstractions shared by the store and API crates:
//! - User and article documents
//! - Article filters and pagination
//! - Common error types
//! - Configuration management

pub mod config;
pub mod models;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LengthBounds, LimitsConfig,
    LoggingConfig, Profile, ServerConfig,
};
pub use models::{
    Article, ArticleFilter, ArticleSummary, Page, RefreshSession, User, UserSummary,
};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Quire operations
#[derive(Error, Debug)]
pub enum QuireError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique field already holds `value`
    #[error("Already exists: {field} {value}")]
    Conflict { field: &'static str, value: String },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

pub type Result<T> = std::result::Result<T, QuireError>;
