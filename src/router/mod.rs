//! HTTP router: the user-token-gated ingestion/query surface and the
//! admin-token-gated token management surface, plus the CORS preamble
//! browser clients rely on.

mod error;
mod handlers;
mod middleware;

pub use error::ApiError;

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::archive::Archive;
use crate::auth::TokenStore;
use crate::config::Configuration;
use crate::fanout::Engine;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub archive: Archive,
    pub auth: Arc<TokenStore>,
    pub config: Arc<Configuration>,
}

/// Build the HTTP router with all routes and the CORS/tracing layers.
pub fn build_router(state: AppState) -> Router {
    let logs_routes = Router::new()
        .route("/logs", get(handlers::get_logs).post(handlers::post_logs))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_user_token,
        ));

    let token_routes = Router::new()
        .route("/add-token", get(handlers::add_token))
        .route("/remove-token", get(handlers::remove_token))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin_token,
        ));

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .cors_origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("*")),
        )
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            middleware::USER_TOKEN_HEADER.parse().unwrap(),
            middleware::ADMIN_TOKEN_HEADER.parse().unwrap(),
        ]);

    Router::new()
        .merge(logs_routes)
        .merge(token_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
