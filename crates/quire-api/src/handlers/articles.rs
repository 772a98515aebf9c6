//! Article API handlers

use crate::articles::{
    ArticleIdRequest, ArticleRequest, FindManyRequest, FindOneRequest, ListRequest,
};
use crate::auth::AuthenticatedUser;
use crate::error::{ApiJson, AppError};
use crate::state::AppState;
use axum::{extract::State, Json};
use quire_core::{Article, ArticleSummary};
use std::sync::Arc;

/// Create an article owned by the caller
#[utoipa::path(
    post,
    path = "/api/articles.create",
    tag = "articles",
    request_body = ArticleRequest,
    responses(
        (status = 200, description = "Article created", body = ArticleSummary),
        (status = 400, description = "Invalid article or duplicate id/name", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 403, description = "Token expired", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<ArticleRequest>,
) -> Result<Json<ArticleSummary>, AppError> {
    let article = state.article_service().create(&user, request).await?;
    Ok(Json(article))
}

/// Update one of the caller's articles
#[utoipa::path(
    post,
    path = "/api/articles.update",
    tag = "articles",
    request_body = ArticleRequest,
    responses(
        (status = 200, description = "Article updated", body = Article),
        (status = 400, description = "Unknown article, not the author, or invalid fields", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 403, description = "Token expired", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<ArticleRequest>,
) -> Result<Json<Article>, AppError> {
    let article = state.article_service().update(&user, request).await?;
    Ok(Json(article))
}

/// Find the first article whose name contains the query
///
/// Responds with `{}` when nothing matches.
#[utoipa::path(
    post,
    path = "/api/articles.findOne",
    tag = "articles",
    request_body = FindOneRequest,
    responses(
        (status = 200, description = "Matching article, or an empty object", body = ArticleSummary),
        (status = 400, description = "Empty query", body = crate::error::ApiError),
    )
)]
pub async fn find_one_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<FindOneRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let found = state.article_service().find_one(request).await?;

    let body = match found {
        Some(article) => serde_json::to_value(article).map_err(AppError::internal)?,
        None => serde_json::json!({}),
    };
    Ok(Json(body))
}

/// Search articles by name
#[utoipa::path(
    post,
    path = "/api/articles.findMany",
    tag = "articles",
    request_body = FindManyRequest,
    responses(
        (status = 200, description = "Matching articles", body = [ArticleSummary]),
        (status = 400, description = "Empty query or count too large", body = crate::error::ApiError),
    )
)]
pub async fn find_many_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<FindManyRequest>,
) -> Result<Json<Vec<ArticleSummary>>, AppError> {
    let articles = state.article_service().find_many(request).await?;
    Ok(Json(articles))
}

/// Get a full article by id
#[utoipa::path(
    post,
    path = "/api/articles.getById",
    tag = "articles",
    request_body = ArticleIdRequest,
    responses(
        (status = 200, description = "Article", body = Article),
        (status = 400, description = "Unknown id", body = crate::error::ApiError),
    )
)]
pub async fn get_by_id_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ArticleIdRequest>,
) -> Result<Json<Article>, AppError> {
    let article = state.article_service().get_by_id(request).await?;
    Ok(Json(article))
}

/// List published articles
#[utoipa::path(
    post,
    path = "/api/articles.getList",
    tag = "articles",
    request_body = ListRequest,
    responses(
        (status = 200, description = "Published articles", body = [ArticleSummary]),
        (status = 400, description = "Count too large", body = crate::error::ApiError),
    )
)]
pub async fn get_list_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ListRequest>,
) -> Result<Json<Vec<ArticleSummary>>, AppError> {
    let articles = state.article_service().get_list(request).await?;
    Ok(Json(articles))
}

/// List the caller's drafts
#[utoipa::path(
    post,
    path = "/api/articles.getDraftsList",
    tag = "articles",
    request_body = ListRequest,
    responses(
        (status = 200, description = "Caller's drafts", body = [ArticleSummary]),
        (status = 400, description = "Count too large", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_drafts_list_handler(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<ListRequest>,
) -> Result<Json<Vec<ArticleSummary>>, AppError> {
    let articles = state.article_service().get_drafts(&user, request).await?;
    Ok(Json(articles))
}
