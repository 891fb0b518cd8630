use axum::{routing::get, Router};
use std::sync::Arc;
use tower::Layer;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::TraceLayer,
};

use crate::api;
use crate::db::SqliteRepository;
use crate::tmdb::MovieCatalog;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqliteRepository>,
    pub catalog: Arc<dyn MovieCatalog>,
}

impl AppState {
    pub fn new(db: Arc<SqliteRepository>, catalog: Arc<dyn MovieCatalog>) -> Self {
        Self { db, catalog }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::welcome))
        .route(
            "/movies",
            get(api::list_movies)
                .post(api::create_movie)
                .fallback(api::movies_method_not_allowed),
        )
        .route(
            "/comments",
            get(api::list_comments)
                .post(api::create_comment)
                .fallback(api::comments_method_not_allowed),
        )
        .route(
            "/top",
            get(api::top).fallback(api::top_method_not_allowed),
        )
        .fallback(api::not_found)
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The router behind trailing-slash normalization.
///
/// The path has to be rewritten before routing happens, so this wraps the
/// router instead of being one of its layers.
pub fn build_app(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state))
}
