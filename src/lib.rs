use std::sync::Arc;

use axum::{
    middleware,
    routing::{any, get},
    Router,
};

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;

use auth::TokenVerifier;
use config::OAuthSettings;

#[derive(Clone)]
pub struct AppState {
    pub oauth: Option<Arc<OAuthSettings>>,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    pub fn new(oauth: Option<OAuthSettings>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            oauth: oauth.map(Arc::new),
            verifier,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/mcp", any(http::handlers::mcp_endpoint))
        .route("/call-tool", any(http::handlers::call_tool))
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .route(
            "/.well-known/oauth-protected-resource",
            get(http::handlers::protected_resource),
        )
        .layer(middleware::from_fn(http::cors::cors_headers))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
