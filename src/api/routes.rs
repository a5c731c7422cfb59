use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = match state.config.max_upload_size {
        Some(max) => DefaultBodyLimit::max(max as usize),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        // Page
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload).layer(upload_limit))
        // Metadata
        .route("/files", get(handlers::list_files))
        .route("/files/:filename", get(handlers::get_file))
        // Media
        .route("/image/:filename", get(handlers::serve_image))
        .route("/audio/:filename", get(handlers::serve_audio))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
