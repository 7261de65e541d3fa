pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;
use crate::storage::ImageStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub images: Arc<ImageStore>,
}

impl AppState {
    /// State with images stored on the local filesystem under the configured upload dir
    pub fn new(db: Database, config: Arc<Config>) -> Self {
        let images = Arc::new(ImageStore::local(&config.storage.upload_dir));
        Self { db, config, images }
    }
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/upload", post(handlers::blog::upload))
        .route("/search", get(handlers::blog::search))
        .route("/author", get(handlers::blog::list_by_author))
        .route("/blog-count", get(handlers::blog::blog_count))
        .route("/blog", get(handlers::blog::get_blog))
        .route(
            "/delete-blog",
            get(handlers::blog::delete_blog).delete(handlers::blog::delete_blog),
        )
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes));

    Router::new()
        .nest("/api", api_routes)
        .nest_service("/images", ServeDir::new(&state.config.storage.upload_dir))
        .fallback_service(ServeDir::new(&state.config.server.static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
