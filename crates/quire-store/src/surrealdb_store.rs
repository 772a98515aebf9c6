//! SurrealDB implementation of the document store
//!
//! Users live in the `user` table with the nickname as record key; articles
//! live in `article` keyed by their custom id. Article bodies are stored as
//! serialized JSON text so arbitrary client payloads round-trip unchanged.

use super::{ArticleStore, UserStore};
use async_trait::async_trait;
use quire_core::{
    Article, ArticleFilter, DatabaseConfig, Page, QuireError, RefreshSession, Result, User,
};
use serde::{Deserialize, Serialize};
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::sql::Thing;
use surrealdb::Surreal;

const USER_TABLE: &str = "user";
const ARTICLE_TABLE: &str = "article";

/// SurrealDB document store
pub struct SurrealStore {
    client: Surreal<Client>,
}

impl SurrealStore {
    /// Create a new SurrealDB connection
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        // The ws engine adds the scheme itself
        let url = config
            .surrealdb_url
            .strip_prefix("ws://")
            .or_else(|| config.surrealdb_url.strip_prefix("wss://"))
            .unwrap_or(&config.surrealdb_url);

        let client = Surreal::new::<Ws>(url)
            .await
            .map_err(|e| QuireError::DatabaseError(format!("SurrealDB connection failed: {e}")))?;

        client
            .signin(Root {
                username: &config.surrealdb_user,
                password: &config.surrealdb_pass,
            })
            .await
            .map_err(|e| QuireError::DatabaseError(format!("SurrealDB auth failed: {e}")))?;

        client
            .use_ns(&config.surrealdb_namespace)
            .use_db(&config.surrealdb_database)
            .await
            .map_err(|e| QuireError::DatabaseError(format!("SurrealDB namespace error: {e}")))?;

        tracing::info!(url = %config.surrealdb_url, "Connected to SurrealDB");

        Ok(Self { client })
    }

    /// Initialize schema (idempotent, run on startup)
    pub async fn init_schema(&self) -> Result<()> {
        self.client
            .query(
                r#"
                DEFINE TABLE IF NOT EXISTS user SCHEMALESS;
                DEFINE INDEX IF NOT EXISTS idx_user_nickname ON user FIELDS nickname UNIQUE;
                DEFINE TABLE IF NOT EXISTS article SCHEMALESS;
                DEFINE INDEX IF NOT EXISTS idx_article_id ON article FIELDS article_id UNIQUE;
                DEFINE INDEX IF NOT EXISTS idx_article_name ON article FIELDS name UNIQUE;
                DEFINE INDEX IF NOT EXISTS idx_article_author ON article FIELDS author, is_draft;
            "#,
            )
            .await
            .map_err(|e| QuireError::DatabaseError(format!("Schema init failed: {e}")))?
            .check()
            .map_err(|e| QuireError::DatabaseError(format!("Schema init failed: {e}")))?;

        Ok(())
    }
}

/// User record for SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    nickname: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    is_admin: bool,
    refresh: Option<RefreshSession>,
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            id: None,
            nickname: user.nickname.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            password_hash: user.password_hash.clone(),
            is_admin: user.is_admin,
            refresh: user.refresh.clone(),
        }
    }
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        Self {
            nickname: r.nickname,
            first_name: r.first_name,
            last_name: r.last_name,
            password_hash: r.password_hash,
            is_admin: r.is_admin,
            refresh: r.refresh,
        }
    }
}

/// Article record for SurrealDB
///
/// `article_id` holds the custom id because `id` is the record link.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArticleRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    article_id: String,
    name: String,
    author: String,
    is_draft: bool,
    thumbnail: String,
    article_data: String,
}

impl TryFrom<&Article> for ArticleRecord {
    type Error = QuireError;

    fn try_from(article: &Article) -> Result<Self> {
        let article_data = serde_json::to_string(&article.article_data)
            .map_err(|e| QuireError::DatabaseError(format!("Failed to encode article: {e}")))?;

        Ok(Self {
            id: None,
            article_id: article.id.clone(),
            name: article.name.clone(),
            author: article.author.clone(),
            is_draft: article.is_draft,
            thumbnail: article.thumbnail.clone(),
            article_data,
        })
    }
}

impl TryFrom<ArticleRecord> for Article {
    type Error = QuireError;

    fn try_from(r: ArticleRecord) -> Result<Self> {
        let article_data = serde_json::from_str(&r.article_data)
            .map_err(|e| QuireError::DatabaseError(format!("Corrupt article body: {e}")))?;

        Ok(Self {
            id: r.article_id,
            name: r.name,
            author: r.author,
            is_draft: r.is_draft,
            thumbnail: r.thumbnail,
            article_data,
        })
    }
}

fn db_error(context: &str) -> impl Fn(surrealdb::Error) -> QuireError + '_ {
    move |e| QuireError::DatabaseError(format!("{context}: {e}"))
}

/// Unique indexes defined by `init_schema` and the field each guards
const UNIQUE_INDEXES: &[(&str, &str)] = &[
    ("idx_user_nickname", "nickname"),
    ("idx_article_id", "id"),
    ("idx_article_name", "name"),
];

/// Classify a failed write
///
/// `unique` lists the written record's unique fields with their values, the
/// record key first. A violated index, or a create on an existing record key,
/// becomes `Conflict` on that field; anything else is a database error.
fn write_error(message: &str, context: &str, unique: &[(&'static str, &str)]) -> QuireError {
    let violated = UNIQUE_INDEXES
        .iter()
        .find(|(index, _)| message.contains(index))
        .map(|(_, field)| *field)
        .or_else(|| {
            message
                .contains("already exists")
                .then(|| unique.first().map(|(field, _)| *field))
                .flatten()
        });

    match violated.and_then(|field| unique.iter().find(|(f, _)| *f == field)) {
        Some(&(field, value)) => QuireError::Conflict {
            field,
            value: value.to_string(),
        },
        None => QuireError::DatabaseError(format!("{context}: {message}")),
    }
}

#[async_trait]
impl UserStore for SurrealStore {
    async fn find_user(&self, nickname: &str) -> Result<Option<User>> {
        let record: Option<UserRecord> = self
            .client
            .select((USER_TABLE, nickname.to_string()))
            .await
            .map_err(db_error("Failed to get user"))?;

        Ok(record.map(User::from))
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        if self.find_user(&user.nickname).await?.is_some() {
            return Err(QuireError::Conflict {
                field: "nickname",
                value: user.nickname.clone(),
            });
        }

        let created: Option<UserRecord> = self
            .client
            .create((USER_TABLE, user.nickname.clone()))
            .content(UserRecord::from(user))
            .await
            .map_err(|e| {
                // Lost a race against a concurrent registration
                write_error(
                    &e.to_string(),
                    "Failed to create user",
                    &[("nickname", user.nickname.as_str())],
                )
            })?;

        created
            .map(|_| ())
            .ok_or_else(|| QuireError::DatabaseError("Failed to create user".to_string()))
    }

    async fn set_refresh_session(&self, nickname: &str, session: &RefreshSession) -> Result<()> {
        let updated: Vec<UserRecord> = self
            .client
            .query("UPDATE user SET refresh = $refresh WHERE nickname = $nickname RETURN AFTER")
            .bind(("refresh", session.clone()))
            .bind(("nickname", nickname.to_string()))
            .await
            .map_err(db_error("Failed to store refresh session"))?
            .take(0)
            .map_err(db_error("Failed to store refresh session"))?;

        if updated.is_empty() {
            return Err(QuireError::NotFound(format!("user {nickname}")));
        }
        Ok(())
    }

    async fn rotate_refresh_session(
        &self,
        nickname: &str,
        current_hash: &str,
        next: &RefreshSession,
    ) -> Result<bool> {
        // Single-document UPDATE with the comparison in WHERE, so the
        // check and the write cannot interleave with another rotation.
        let updated: Vec<UserRecord> = self
            .client
            .query(
                "UPDATE user SET refresh = $next \
                 WHERE nickname = $nickname AND refresh.token_hash = $current \
                 RETURN AFTER",
            )
            .bind(("next", next.clone()))
            .bind(("nickname", nickname.to_string()))
            .bind(("current", current_hash.to_string()))
            .await
            .map_err(db_error("Failed to rotate refresh session"))?
            .take(0)
            .map_err(db_error("Failed to rotate refresh session"))?;

        Ok(!updated.is_empty())
    }
}

#[async_trait]
impl ArticleStore for SurrealStore {
    async fn insert_article(&self, article: &Article) -> Result<()> {
        if self.find_article(&article.id).await?.is_some() {
            return Err(QuireError::Conflict {
                field: "id",
                value: article.id.clone(),
            });
        }

        let created: Option<ArticleRecord> = self
            .client
            .create((ARTICLE_TABLE, article.id.clone()))
            .content(ArticleRecord::try_from(article)?)
            .await
            .map_err(|e| {
                write_error(
                    &e.to_string(),
                    "Failed to create article",
                    &[("id", article.id.as_str()), ("name", article.name.as_str())],
                )
            })?;

        created
            .map(|_| ())
            .ok_or_else(|| QuireError::DatabaseError("Failed to create article".to_string()))
    }

    async fn find_article(&self, id: &str) -> Result<Option<Article>> {
        let record: Option<ArticleRecord> = self
            .client
            .select((ARTICLE_TABLE, id.to_string()))
            .await
            .map_err(db_error("Failed to get article"))?;

        record.map(Article::try_from).transpose()
    }

    async fn find_article_by_name(&self, name: &str) -> Result<Option<Article>> {
        let records: Vec<ArticleRecord> = self
            .client
            .query("SELECT * FROM article WHERE name = $name LIMIT 1")
            .bind(("name", name.to_string()))
            .await
            .map_err(db_error("Query failed"))?
            .take(0)
            .map_err(db_error("Result extraction failed"))?;

        records.into_iter().next().map(Article::try_from).transpose()
    }

    async fn find_articles(&self, filter: &ArticleFilter, page: Page) -> Result<Vec<Article>> {
        let mut conditions = Vec::new();
        if filter.name_contains.is_some() {
            conditions.push("string::lowercase(name) CONTAINS string::lowercase($name)");
        }
        if filter.is_draft.is_some() {
            conditions.push("is_draft = $is_draft");
        }
        if filter.author.is_some() {
            conditions.push("author = $author");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT * FROM article {where_clause} ORDER BY article_id LIMIT $limit START $start"
        );

        let mut query = self
            .client
            .query(sql)
            .bind(("limit", page.count))
            .bind(("start", page.offset));
        if let Some(name) = &filter.name_contains {
            query = query.bind(("name", name.clone()));
        }
        if let Some(is_draft) = filter.is_draft {
            query = query.bind(("is_draft", is_draft));
        }
        if let Some(author) = &filter.author {
            query = query.bind(("author", author.clone()));
        }

        let records: Vec<ArticleRecord> = query
            .await
            .map_err(db_error("Query failed"))?
            .take(0)
            .map_err(db_error("Result extraction failed"))?;

        records.into_iter().map(Article::try_from).collect()
    }

    async fn update_article(&self, article: &Article) -> Result<()> {
        let record = ArticleRecord::try_from(article)?;
        let unique = [("name", article.name.as_str())];
        let update_error =
            |e: surrealdb::Error| write_error(&e.to_string(), "Failed to update article", &unique);

        let updated: Vec<ArticleRecord> = self
            .client
            .query(
                "UPDATE article SET name = $name, is_draft = $is_draft, \
                 thumbnail = $thumbnail, article_data = $article_data \
                 WHERE article_id = $article_id RETURN AFTER",
            )
            .bind(("name", record.name))
            .bind(("is_draft", record.is_draft))
            .bind(("thumbnail", record.thumbnail))
            .bind(("article_data", record.article_data))
            .bind(("article_id", record.article_id))
            .await
            .map_err(update_error)?
            .take(0)
            .map_err(update_error)?;

        if updated.is_empty() {
            return Err(QuireError::NotFound(format!("article {}", article.id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_record_roundtrips_body() {
        let article = Article {
            id: "intro".to_string(),
            name: "Intro".to_string(),
            author: "anna9".to_string(),
            is_draft: false,
            thumbnail: "https://example.com/t.png".to_string(),
            article_data: serde_json::json!({ "blocks": [{ "type": "text", "value": "hi" }] }),
        };

        let record = ArticleRecord::try_from(&article).unwrap();
        assert_eq!(record.article_id, "intro");
        assert!(record.id.is_none());

        let back = Article::try_from(record).unwrap();
        assert_eq!(back, article);
    }

    #[test]
    fn test_user_record_conversion() {
        let mut user = User::new("Anna", "Lee", "anna9", "hash");
        user.refresh = Some(RefreshSession {
            token_hash: "abc".to_string(),
            issued_at: 42,
        });

        let record = UserRecord::from(&user);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["refresh"]["token_hash"], "abc");

        let back = User::from(record);
        assert_eq!(back.refresh, user.refresh);
    }

    #[test]
    fn test_write_error_names_violated_index() {
        let unique: [(&'static str, &str); 2] = [("id", "intro"), ("name", "Intro")];

        let name = write_error(
            "Database index `idx_article_name` already contains 'Intro', with record `article:other`",
            "Failed to create article",
            &unique,
        );
        assert!(matches!(
            name,
            QuireError::Conflict { field: "name", ref value } if value == "Intro"
        ));

        let key = write_error(
            "Database record `article:intro` already exists",
            "Failed to create article",
            &unique,
        );
        assert!(matches!(key, QuireError::Conflict { field: "id", .. }));

        let other = write_error("connection reset", "Failed to create article", &unique);
        assert!(matches!(other, QuireError::DatabaseError(_)));
    }

    #[test]
    fn test_update_name_collision_is_conflict() {
        let err = write_error(
            "Database index `idx_article_name` already contains 'Taken', with record `article:a1`",
            "Failed to update article",
            &[("name", "Taken")],
        );
        assert!(matches!(err, QuireError::Conflict { field: "name", .. }));
    }

    #[tokio::test]
    #[ignore = "requires SurrealDB"]
    async fn test_surreal_user_roundtrip() {
        let store = SurrealStore::new(&DatabaseConfig::default()).await.unwrap();
        store.init_schema().await.unwrap();

        let nickname = format!("t{}", std::process::id());
        let user = User::new("Test", "User", nickname.clone(), "hash");
        store.insert_user(&user).await.unwrap();
        assert!(matches!(
            store.insert_user(&user).await,
            Err(QuireError::Conflict {
                field: "nickname",
                ..
            })
        ));

        let first = RefreshSession {
            token_hash: "first".to_string(),
            issued_at: 1,
        };
        let second = RefreshSession {
            token_hash: "second".to_string(),
            issued_at: 2,
        };
        store.set_refresh_session(&nickname, &first).await.unwrap();
        assert!(store
            .rotate_refresh_session(&nickname, "first", &second)
            .await
            .unwrap());
        assert!(!store
            .rotate_refresh_session(&nickname, "first", &second)
            .await
            .unwrap());
    }
}
