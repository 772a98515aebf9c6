//! OpenAPI document for the REST API

use crate::articles::{
    ArticleIdRequest, ArticleRequest, FindManyRequest, FindOneRequest, ListRequest,
};
use crate::auth::{LoginRequest, RefreshRequest, RegisterRequest, TokenPair};
use crate::error::ApiError;
use crate::handlers::health::HealthResponse;
use quire_core::{Article, ArticleSummary, UserSummary};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::users::register_handler,
        crate::handlers::users::login_handler,
        crate::handlers::users::refresh_handler,
        crate::handlers::articles::create_handler,
        crate::handlers::articles::update_handler,
        crate::handlers::articles::find_one_handler,
        crate::handlers::articles::find_many_handler,
        crate::handlers::articles::get_by_id_handler,
        crate::handlers::articles::get_list_handler,
        crate::handlers::articles::get_drafts_list_handler,
    ),
    components(schemas(
        ApiError,
        HealthResponse,
        RegisterRequest,
        LoginRequest,
        RefreshRequest,
        TokenPair,
        UserSummary,
        ArticleRequest,
        FindOneRequest,
        FindManyRequest,
        ArticleIdRequest,
        ListRequest,
        Article,
        ArticleSummary,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Liveness"),
        (name = "users", description = "Registration, login and token refresh"),
        (name = "articles", description = "Article publishing and search"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected operations
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_all_methods() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();

        for path in [
            "/health",
            "/api/users.register",
            "/api/users.login",
            "/api/users.refreshTokenPair",
            "/api/articles.create",
            "/api/articles.getDraftsList",
        ] {
            assert!(paths.iter().any(|p| p == path), "missing {path}");
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
