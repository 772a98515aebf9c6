//! In-memory store
//!
//! Backs the test suites and `--in-memory` development runs. Each map sits
//! behind its own `RwLock`, so a compare-and-swap on a user document is
//! atomic with respect to every other request.

use super::{ArticleStore, UserStore};
use async_trait::async_trait;
use quire_core::{Article, ArticleFilter, Page, QuireError, RefreshSession, Result, User};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Thread-safe in-memory document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    articles: RwLock<BTreeMap<String, Article>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, nickname: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(nickname).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.nickname) {
            return Err(QuireError::Conflict {
                field: "nickname",
                value: user.nickname.clone(),
            });
        }
        users.insert(user.nickname.clone(), user.clone());
        Ok(())
    }

    async fn set_refresh_session(&self, nickname: &str, session: &RefreshSession) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(nickname)
            .ok_or_else(|| QuireError::NotFound(format!("user {nickname}")))?;
        user.refresh = Some(session.clone());
        Ok(())
    }

    async fn rotate_refresh_session(
        &self,
        nickname: &str,
        current_hash: &str,
        next: &RefreshSession,
    ) -> Result<bool> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(nickname) else {
            return Ok(false);
        };

        match &user.refresh {
            Some(session) if session.token_hash == current_hash => {
                user.refresh = Some(next.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert_article(&self, article: &Article) -> Result<()> {
        let mut articles = self.articles.write().await;
        if articles.contains_key(&article.id) {
            return Err(QuireError::Conflict {
                field: "id",
                value: article.id.clone(),
            });
        }
        check_name_free(&articles, article)?;
        articles.insert(article.id.clone(), article.clone());
        Ok(())
    }

    async fn find_article(&self, id: &str) -> Result<Option<Article>> {
        Ok(self.articles.read().await.get(id).cloned())
    }

    async fn find_article_by_name(&self, name: &str) -> Result<Option<Article>> {
        Ok(self
            .articles
            .read()
            .await
            .values()
            .find(|a| a.name == name)
            .cloned())
    }

    async fn find_articles(&self, filter: &ArticleFilter, page: Page) -> Result<Vec<Article>> {
        Ok(self
            .articles
            .read()
            .await
            .values()
            .filter(|a| filter.matches(a))
            .skip(page.offset)
            .take(page.count)
            .cloned()
            .collect())
    }

    async fn update_article(&self, article: &Article) -> Result<()> {
        let mut articles = self.articles.write().await;
        check_name_free(&articles, article)?;
        let existing = articles
            .get_mut(&article.id)
            .ok_or_else(|| QuireError::NotFound(format!("article {}", article.id)))?;
        *existing = article.clone();
        Ok(())
    }
}

/// Names are unique across articles, like the SurrealDB `idx_article_name` index
fn check_name_free(articles: &BTreeMap<String, Article>, article: &Article) -> Result<()> {
    let taken = articles
        .values()
        .any(|other| other.name == article.name && other.id != article.id);
    if taken {
        return Err(QuireError::Conflict {
            field: "name",
            value: article.name.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn session(hash: &str) -> RefreshSession {
        RefreshSession {
            token_hash: hash.to_string(),
            issued_at: 1_700_000_000,
        }
    }

    fn article(id: &str, name: &str, author: &str, is_draft: bool) -> Article {
        Article {
            id: id.to_string(),
            name: name.to_string(),
            author: author.to_string(),
            is_draft,
            thumbnail: "https://example.com/t.png".to_string(),
            article_data: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_user() {
        let store = MemoryStore::new();
        let user = User::new("Anna", "Lee", "anna9", "hash");

        store.insert_user(&user).await.unwrap();

        let found = store.find_user("anna9").await.unwrap().unwrap();
        assert_eq!(found.first_name, "Anna");
        assert!(store.find_user("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_nickname_conflicts() {
        let store = MemoryStore::new();
        store
            .insert_user(&User::new("Anna", "Lee", "anna9", "hash"))
            .await
            .unwrap();

        let result = store
            .insert_user(&User::new("Other", "Person", "anna9", "hash2"))
            .await;
        assert!(matches!(
            result,
            Err(QuireError::Conflict {
                field: "nickname",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_set_refresh_session_for_missing_user() {
        let store = MemoryStore::new();
        let result = store.set_refresh_session("ghost", &session("h")).await;
        assert!(matches!(result, Err(QuireError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rotate_requires_current_hash() {
        let store = MemoryStore::new();
        store
            .insert_user(&User::new("Anna", "Lee", "anna9", "hash"))
            .await
            .unwrap();
        store
            .set_refresh_session("anna9", &session("first"))
            .await
            .unwrap();

        assert!(!store
            .rotate_refresh_session("anna9", "stale", &session("second"))
            .await
            .unwrap());
        assert!(store
            .rotate_refresh_session("anna9", "first", &session("second"))
            .await
            .unwrap());
        assert!(!store
            .rotate_refresh_session("anna9", "first", &session("third"))
            .await
            .unwrap());

        let user = store.find_user("anna9").await.unwrap().unwrap();
        assert_eq!(user.refresh.unwrap().token_hash, "second");
    }

    #[tokio::test]
    async fn test_concurrent_rotation_has_single_winner() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_user(&User::new("Anna", "Lee", "anna9", "hash"))
            .await
            .unwrap();
        store
            .set_refresh_session("anna9", &session("shared"))
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .rotate_refresh_session("anna9", "shared", &session(&format!("next-{i}")))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_find_articles_with_pagination() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .insert_article(&article(
                    &format!("post-{i}"),
                    &format!("Post {i}"),
                    "anna9",
                    i % 2 == 0,
                ))
                .await
                .unwrap();
        }

        let all = store
            .find_articles(&ArticleFilter::default(), Page::new(0, 10))
            .await
            .unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].id, "post-0");

        let window = store
            .find_articles(&ArticleFilter::default(), Page::new(1, 2))
            .await
            .unwrap();
        let ids: Vec<_> = window.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["post-1", "post-2"]);

        let published = store
            .find_articles(&ArticleFilter::published(), Page::new(0, 10))
            .await
            .unwrap();
        assert_eq!(published.len(), 2);
    }

    #[tokio::test]
    async fn test_update_article() {
        let store = MemoryStore::new();
        let mut post = article("post", "Original", "anna9", true);
        store.insert_article(&post).await.unwrap();

        post.name = "Renamed".to_string();
        store.update_article(&post).await.unwrap();

        assert!(store.find_article_by_name("Original").await.unwrap().is_none());
        assert_eq!(
            store.find_article("post").await.unwrap().unwrap().name,
            "Renamed"
        );

        let missing = article("missing", "Missing", "anna9", true);
        assert!(matches!(
            store.update_article(&missing).await,
            Err(QuireError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_article_name_is_unique() {
        let store = MemoryStore::new();
        store
            .insert_article(&article("first", "Taken", "anna9", false))
            .await
            .unwrap();
        let mut second = article("second", "Free", "anna9", false);
        store.insert_article(&second).await.unwrap();

        let result = store
            .insert_article(&article("third", "Taken", "bob", false))
            .await;
        assert!(matches!(
            result,
            Err(QuireError::Conflict { field: "name", .. })
        ));

        second.name = "Taken".to_string();
        assert!(matches!(
            store.update_article(&second).await,
            Err(QuireError::Conflict { field: "name", .. })
        ));

        // Keeping its own name is not a collision
        let first = article("first", "Taken", "anna9", true);
        store.update_article(&first).await.unwrap();
    }
}
