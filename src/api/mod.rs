//! HTTP API module
//!
//! This module contains the settings server: the JSON configuration API, the
//! embedded UI assets and the server lifecycle.

pub mod assets;
pub mod handlers;
pub mod responses;
pub mod server;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    response::Response,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;
use handlers::*;

pub use server::{ConfigServer, BASE_PORT};

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE";

/// Create the HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/config",
            get(get_config_handler).post(save_config_handler).fallback(not_found_handler),
        )
        .route(
            "/api/haptic-preview",
            post(haptic_preview_handler).fallback(not_found_handler),
        )
        .route(
            "/api/restore-defaults",
            post(restore_defaults_handler).fallback(not_found_handler),
        )
        .fallback(static_asset_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer())
                .layer(middleware::map_response(with_cors_headers)),
        )
        .with_state(state)
}

/// Answers every OPTIONS request itself and allows any origin
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

/// Advertise the allowed methods and headers on regular responses too
async fn with_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers
        .entry(header::ACCESS_CONTROL_ALLOW_METHODS)
        .or_insert(HeaderValue::from_static(ALLOWED_METHODS));
    headers
        .entry(header::ACCESS_CONTROL_ALLOW_HEADERS)
        .or_insert(HeaderValue::from_static("Content-Type"));
    response
}
