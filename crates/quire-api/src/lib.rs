//! Quire API - REST server for content publishing
//!
//! Users register and log in to obtain an access/refresh token pair; the
//! access token authorizes article writes, the refresh token is exchanged
//! (and rotated) for a new pair.

pub mod articles;
pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderValue, Method},
    routing::get,
    BoxError, Json, Router,
};
use error::AppError;
use quire_core::ServerConfig;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// Build the complete application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;
    let cors = cors_layer(server);
    let timeout = Duration::from_secs(server.request_timeout_secs);

    let router = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(openapi::ApiDoc::openapi()) }),
        )
        .nest("/api", routes::api_routes(state.clone()));

    with_timeout(router, timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Router over an empty in-memory store with cheap password hashing
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router(Arc::new(test_state()))
}

/// State used by [`create_router_for_testing`]
#[cfg(any(test, feature = "test-utils"))]
pub fn test_state() -> AppState {
    AppState::in_memory(quire_core::AppConfig::default())
        .with_password_config(auth::PasswordConfig::light())
}

/// Bound every request by `timeout`; expiry answers with the JSON error envelope
fn with_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_middleware_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        AppError::internal("request timeout exceeded")
    } else {
        AppError::internal(format!("unhandled middleware error: {err}"))
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if server.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_timeout_uses_error_envelope() {
        let slow = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "done"
            }),
        );
        let app = with_timeout(slow, Duration::from_millis(20));

        let response = app
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error_code"], 1);
        assert_eq!(json["message"], "internal error");
    }

    #[tokio::test]
    async fn test_fast_request_passes_timeout() {
        let app = with_timeout(
            Router::new().route("/fast", get(|| async { "done" })),
            Duration::from_secs(1),
        );

        let response = app
            .oneshot(Request::builder().uri("/fast").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
