use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::store::StoredFile;
use crate::AppState;

/// Route: GET /files
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StoredFile>>, ApiError> {
    let files = state.store.list().await?;
    if files.is_empty() {
        return Err(ApiError::not_found("No files exist."));
    }

    Ok(Json(files))
}

/// Route: GET /files/:filename
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<StoredFile>, ApiError> {
    let file = state
        .store
        .find(&filename)
        .await?
        .ok_or_else(|| ApiError::not_found("No file exists."))?;

    Ok(Json(file))
}
