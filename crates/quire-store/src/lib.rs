//! Quire Store - document store abstraction
//!
//! Services talk to storage only through [`UserStore`] and [`ArticleStore`].
//! Two implementations are provided: [`MemoryStore`] for tests and local
//! development, and [`SurrealStore`] backed by SurrealDB.

use async_trait::async_trait;
use quire_core::{Article, ArticleFilter, Page, RefreshSession, Result, User};

pub mod memory;
pub mod surrealdb_store;

pub use memory::MemoryStore;
pub use surrealdb_store::SurrealStore;

/// User documents, keyed by nickname
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by nickname
    async fn find_user(&self, nickname: &str) -> Result<Option<User>>;

    /// Insert a new user; fails with `QuireError::Conflict` if the nickname is taken
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Unconditionally replace the user's refresh session
    ///
    /// Fails with `QuireError::NotFound` if the user does not exist.
    async fn set_refresh_session(&self, nickname: &str, session: &RefreshSession) -> Result<()>;

    /// Replace the refresh session only if the stored token hash still equals
    /// `current_hash`. Returns `false` when another writer got there first.
    async fn rotate_refresh_session(
        &self,
        nickname: &str,
        current_hash: &str,
        next: &RefreshSession,
    ) -> Result<bool>;
}

/// Article documents, keyed by their custom id
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert a new article; fails with `QuireError::Conflict` if the id is taken
    async fn insert_article(&self, article: &Article) -> Result<()>;

    /// Get an article by id
    async fn find_article(&self, id: &str) -> Result<Option<Article>>;

    /// Get an article by exact name
    async fn find_article_by_name(&self, name: &str) -> Result<Option<Article>>;

    /// Find articles matching `filter`, ordered by id, within `page`
    async fn find_articles(&self, filter: &ArticleFilter, page: Page) -> Result<Vec<Article>>;

    /// Replace an existing article; fails with `QuireError::NotFound` if absent
    async fn update_article(&self, article: &Article) -> Result<()>;
}
