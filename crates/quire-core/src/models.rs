//! Document models
//!
//! Users and articles as they are persisted in the document store, plus the
//! public projections returned by the API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================================
// Users
// ============================================================================

/// The refresh token currently accepted for a user
///
/// Only a SHA-256 digest of the token is kept. `issued_at` bounds the
/// lifetime of the session since refresh tokens carry no `exp` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSession {
    /// Hex-encoded SHA-256 of the refresh token string
    pub token_hash: String,
    /// Unix timestamp (seconds) at which the token was issued
    pub issued_at: i64,
}

/// User account document, keyed by nickname
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub nickname: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2id PHC string
    pub password_hash: String,
    #[serde(default)]
    pub is_admin: bool,
    /// Current refresh session, `None` until the first login
    #[serde(default)]
    pub refresh: Option<RefreshSession>,
}

impl User {
    /// Create a regular (non-admin) user without any session
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        nickname: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            password_hash: password_hash.into(),
            is_admin: false,
            refresh: None,
        }
    }

    /// Public view of the user, without credentials
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            nickname: self.nickname.clone(),
        }
    }
}

/// Public user representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
}

// ============================================================================
// Articles
// ============================================================================

/// Article document
///
/// `id` is chosen by the author and is unique, as is `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Article {
    pub id: String,
    pub name: String,
    /// Nickname of the user who created the article
    pub author: String,
    pub is_draft: bool,
    /// Thumbnail image URL
    pub thumbnail: String,
    /// Free-form article body, stored as-is
    #[serde(default)]
    #[schema(value_type = Object)]
    pub article_data: serde_json::Value,
}

impl Article {
    pub fn summary(&self) -> ArticleSummary {
        ArticleSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            author: self.author.clone(),
            is_draft: self.is_draft,
            thumbnail: self.thumbnail.clone(),
        }
    }
}

/// Article metadata without the body, used in listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ArticleSummary {
    pub id: String,
    pub name: String,
    pub author: String,
    pub is_draft: bool,
    pub thumbnail: String,
}

/// Conjunctive filter over articles; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    /// Case-insensitive substring of the article name
    pub name_contains: Option<String>,
    pub is_draft: Option<bool>,
    pub author: Option<String>,
}

impl ArticleFilter {
    pub fn name_contains(query: impl Into<String>) -> Self {
        Self {
            name_contains: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn published() -> Self {
        Self {
            is_draft: Some(false),
            ..Default::default()
        }
    }

    pub fn drafts_of(author: impl Into<String>) -> Self {
        Self {
            is_draft: Some(true),
            author: Some(author.into()),
            ..Default::default()
        }
    }

    /// Evaluate the filter against a single article
    pub fn matches(&self, article: &Article) -> bool {
        if let Some(query) = &self.name_contains {
            if !article
                .name
                .to_lowercase()
                .contains(&query.to_lowercase())
            {
                return false;
            }
        }

        if let Some(is_draft) = self.is_draft {
            if article.is_draft != is_draft {
                return false;
            }
        }

        if let Some(author) = &self.author {
            if &article.author != author {
                return false;
            }
        }

        true
    }
}

/// Offset/count pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub count: usize,
}

impl Page {
    pub fn new(offset: usize, count: usize) -> Self {
        Self { offset, count }
    }

    /// A single-item window, used for find-one lookups
    pub fn first() -> Self {
        Self::new(0, 1)
    }
}
