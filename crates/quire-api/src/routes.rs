//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::{articles, users};
use crate::state::AppState;
use axum::{middleware, routing::post, Router};
use std::sync::Arc;

/// Routes mounted under `/api`
///
/// Method names keep their dotted form (`users.login`, `articles.getList`)
/// and every call is a POST with a JSON body.
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/users.register", post(users::register_handler))
        .route("/users.login", post(users::login_handler))
        .route("/users.refreshTokenPair", post(users::refresh_handler))
        .route("/articles.findOne", post(articles::find_one_handler))
        .route("/articles.findMany", post(articles::find_many_handler))
        .route("/articles.getById", post(articles::get_by_id_handler))
        .route("/articles.getList", post(articles::get_list_handler));

    // Protected routes (Bearer access token required)
    let protected_routes = Router::new()
        .route("/articles.create", post(articles::create_handler))
        .route("/articles.update", post(articles::update_handler))
        .route(
            "/articles.getDraftsList",
            post(articles::get_drafts_list_handler),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
