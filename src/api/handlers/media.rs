use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::classify::{is_inline_audio, MediaKind};
use crate::store::StoredFile;
use crate::AppState;

/// Stream an image inline.
/// Route: GET /image/:filename
pub async fn serve_image(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let file = find_file(&state, &filename).await?;

    if MediaKind::from_content_type(&file.content_type) != MediaKind::Image {
        return Err(ApiError::not_found("This is not an image file."));
    }

    stream_file(&state, file).await
}

/// Stream audio inline. Only types a browser can play are served.
/// Route: GET /audio/:filename
pub async fn serve_audio(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let file = find_file(&state, &filename).await?;

    if !is_inline_audio(&file.content_type) {
        return Err(ApiError::not_found("This is not an audio file."));
    }

    stream_file(&state, file).await
}

async fn find_file(state: &AppState, filename: &str) -> Result<StoredFile, ApiError> {
    state
        .store
        .find(filename)
        .await?
        .ok_or_else(|| ApiError::not_found("No file exists."))
}

async fn stream_file(state: &AppState, file: StoredFile) -> Result<Response, ApiError> {
    let content = state.store.open(&file.filename).await?;

    let mut response = (StatusCode::OK, Body::from_stream(content)).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        file.content_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        header::HeaderValue::from(file.length),
    );

    if let Ok(value) = format!("inline; filename=\"{}\"", file.filename).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Stored files are never modified
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=3600"),
    );

    Ok(response)
}
