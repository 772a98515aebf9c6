//! Article service layer
//!
//! Validation and authorship rules for articles on top of an [`ArticleStore`].
//! Article ids are chosen by their authors; both the id and the name are
//! unique across all articles.

use crate::auth::AuthenticatedUser;
use crate::error::{check_length, AppError};
use quire_core::{Article, ArticleFilter, ArticleSummary, LimitsConfig, Page, QuireError};
use quire_store::ArticleStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::ValidateUrl;

/// Body of `articles.create` and `articles.update`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ArticleRequest {
    pub id: String,
    pub name: String,
    pub is_draft: bool,
    pub thumbnail: String,
    #[schema(value_type = Object)]
    pub article_data: serde_json::Value,
}

/// Body of `articles.findOne`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct FindOneRequest {
    pub query: String,
}

/// Body of `articles.findMany`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct FindManyRequest {
    pub query: String,
    pub offset: usize,
    pub count: usize,
}

/// Body of `articles.getById`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ArticleIdRequest {
    pub id: String,
}

/// Body of `articles.getList` and `articles.getDraftsList`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ListRequest {
    pub offset: usize,
    pub count: usize,
}

/// Article service
#[derive(Clone)]
pub struct ArticleService {
    articles: Arc<dyn ArticleStore>,
    limits: LimitsConfig,
}

impl ArticleService {
    pub fn new(articles: Arc<dyn ArticleStore>, limits: LimitsConfig) -> Self {
        Self { articles, limits }
    }

    /// Create an article authored by `author`
    pub async fn create(
        &self,
        author: &AuthenticatedUser,
        request: ArticleRequest,
    ) -> Result<ArticleSummary, AppError> {
        self.validate(&request)?;

        if self.articles.find_article(&request.id).await?.is_some() {
            return Err(not_unique("id"));
        }
        if self
            .articles
            .find_article_by_name(&request.name)
            .await?
            .is_some()
        {
            return Err(not_unique("name"));
        }

        let article = Article {
            id: request.id,
            name: request.name,
            author: author.nickname.clone(),
            is_draft: request.is_draft,
            thumbnail: request.thumbnail,
            article_data: request.article_data,
        };

        // A concurrent writer can take the id or name after the checks above
        self.articles
            .insert_article(&article)
            .await
            .map_err(store_error)?;

        tracing::info!(id = %article.id, author = %article.author, "Article created");
        Ok(article.summary())
    }

    /// Replace the mutable fields of an article owned by `author`
    ///
    /// The id and the author never change.
    pub async fn update(
        &self,
        author: &AuthenticatedUser,
        request: ArticleRequest,
    ) -> Result<Article, AppError> {
        self.validate(&request)?;

        let existing = self
            .articles
            .find_article(&request.id)
            .await?
            .ok_or_else(|| AppError::BadRequest("article with this id doesn't exist".to_string()))?;

        if existing.author != author.nickname {
            return Err(AppError::BadRequest(
                "you're not the author of this article".to_string(),
            ));
        }

        if let Some(other) = self.articles.find_article_by_name(&request.name).await? {
            if other.id != existing.id {
                return Err(not_unique("name"));
            }
        }

        let updated = Article {
            name: request.name,
            is_draft: request.is_draft,
            thumbnail: request.thumbnail,
            article_data: request.article_data,
            ..existing
        };
        self.articles
            .update_article(&updated)
            .await
            .map_err(store_error)?;

        Ok(updated)
    }

    /// First article whose name contains `query`, case-insensitively
    pub async fn find_one(&self, request: FindOneRequest) -> Result<Option<ArticleSummary>, AppError> {
        check_query(&request.query)?;

        let found = self
            .articles
            .find_articles(&ArticleFilter::name_contains(request.query), Page::first())
            .await?;

        Ok(found.first().map(Article::summary))
    }

    pub async fn find_many(&self, request: FindManyRequest) -> Result<Vec<ArticleSummary>, AppError> {
        check_query(&request.query)?;
        let page = self.page(request.offset, request.count)?;

        self.list(ArticleFilter::name_contains(request.query), page)
            .await
    }

    pub async fn get_by_id(&self, request: ArticleIdRequest) -> Result<Article, AppError> {
        check_length("id", &request.id, self.limits.article_id)?;

        self.articles
            .find_article(&request.id)
            .await?
            .ok_or_else(|| AppError::BadRequest("article with this id doesn't exist".to_string()))
    }

    /// Published articles
    pub async fn get_list(&self, request: ListRequest) -> Result<Vec<ArticleSummary>, AppError> {
        let page = self.page(request.offset, request.count)?;
        self.list(ArticleFilter::published(), page).await
    }

    /// Drafts written by `author`
    pub async fn get_drafts(
        &self,
        author: &AuthenticatedUser,
        request: ListRequest,
    ) -> Result<Vec<ArticleSummary>, AppError> {
        let page = self.page(request.offset, request.count)?;
        self.list(ArticleFilter::drafts_of(author.nickname.clone()), page)
            .await
    }

    async fn list(&self, filter: ArticleFilter, page: Page) -> Result<Vec<ArticleSummary>, AppError> {
        let articles = self.articles.find_articles(&filter, page).await?;
        Ok(articles.iter().map(Article::summary).collect())
    }

    fn validate(&self, request: &ArticleRequest) -> Result<(), AppError> {
        check_length("id", &request.id, self.limits.article_id)?;
        check_length("name", &request.name, self.limits.article_name)?;

        if !request.thumbnail.validate_url() {
            return Err(AppError::BadRequest("invalid thumbnail".to_string()));
        }

        Ok(())
    }

    /// A `count` of zero means "as many as allowed"
    fn page(&self, offset: usize, count: usize) -> Result<Page, AppError> {
        let max = self.limits.find_max_count;
        if count > max {
            return Err(AppError::BadRequest(format!("count > {max}")));
        }

        Ok(Page::new(offset, if count == 0 { max } else { count }))
    }
}

fn check_query(query: &str) -> Result<(), AppError> {
    if query.is_empty() {
        return Err(AppError::InvalidFieldLength("empty query string".to_string()));
    }
    Ok(())
}

fn not_unique(field: &str) -> AppError {
    AppError::NotUniqueData(format!("article with this {field} already exists"))
}

fn store_error(err: QuireError) -> AppError {
    match err {
        QuireError::Conflict { field, .. } => not_unique(field),
        other => other.into(),
    }
}
