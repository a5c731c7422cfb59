use askama::Template;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::response::{Html, Redirect};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::classify::classify;
use crate::store::{StoreError, StoredFile};
use crate::uploads::{detect_content_type, store_upload, UploadError};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

/// A stored file with its presentation flags, computed per request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    #[serde(flatten)]
    pub file: StoredFile,
    pub is_image: bool,
    pub is_audio: bool,
}

impl From<StoredFile> for FileView {
    fn from(file: StoredFile) -> Self {
        let flags = classify(&file.content_type);
        Self {
            file,
            is_image: flags.is_image,
            is_audio: flags.is_audio,
        }
    }
}

/// The upload form plus every stored file; `files` is `None` when the
/// bucket is empty.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub files: Option<Vec<FileView>>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Route: GET /
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let files = state.store.list().await?;
    let files = if files.is_empty() {
        None
    } else {
        Some(files.into_iter().map(FileView::from).collect())
    };

    let page = IndexTemplate { files }
        .render()
        .map_err(|e| ApiError::internal(format!("Failed to render page: {e}")))?;

    Ok(Html(page))
}

/// Accept one file from the `file` form field, then go back to the listing.
/// Route: POST /upload
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        if field.name() != Some("file") {
            continue;
        }

        // A form submitted with no file chosen sends an unnamed, empty part
        let original_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let content_type = detect_content_type(field.content_type(), field.file_name());
        let data = field.map_err(std::io::Error::other).boxed();

        store_upload(
            state.store.as_ref(),
            &state.rng,
            &original_name,
            &content_type,
            data,
        )
        .await
        .map_err(upload_error)?;
        break;
    }

    Ok(Redirect::to("/"))
}

// ============================================================================
// Helpers
// ============================================================================

fn multipart_error(e: &MultipartError) -> ApiError {
    let status = e.status();
    let message = format!("Invalid multipart data: {}", e.body_text());
    if status.is_client_error() {
        ApiError::Fail(status, message)
    } else {
        ApiError::Error(status, message)
    }
}

/// Multipart failures while streaming the file (oversized body, broken
/// encoding) reach the store as I/O errors; report them with their own status.
fn upload_error(e: UploadError) -> ApiError {
    if let UploadError::Store(StoreError::Io(io)) = &e {
        if let Some(multipart) = io
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<MultipartError>())
        {
            return multipart_error(multipart);
        }
    }
    e.into()
}
