//! Storage adapter: names incoming uploads and hands their content to the store.

use ring::rand::SecureRandom;
use thiserror::Error;

use crate::store::{ByteStream, LargeObjectStore, StoreError, StoredFile, DEFAULT_CONTENT_TYPE};

/// Random bytes in a generated filename (32 hex characters).
const NAME_BYTES: usize = 16;

/// Fresh names to try when a generated name is already taken.
const MAX_NAME_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Random number generator failed")]
    Randomness,
    #[error("Could not find an unused filename after {0} attempts")]
    NameExhausted(usize),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Extension of the last path segment, dot included.
///
/// Empty when the name has no dot, when its last dot is the leading one
/// (`.bashrc`), or for `..`. Leading dots before a later one don't count, so
/// `..foo` gives `.foo`.
pub fn extension(original_name: &str) -> &str {
    let base = original_name.rsplit('/').next().unwrap_or(original_name);
    if base == ".." {
        return "";
    }
    match base.rfind('.') {
        Some(i) if i > 0 => &base[i..],
        _ => "",
    }
}

/// 16 random bytes, hex-encoded, followed by the original extension.
pub fn random_filename(
    rng: &dyn SecureRandom,
    original_name: &str,
) -> Result<String, UploadError> {
    let mut buf = [0u8; NAME_BYTES];
    rng.fill(&mut buf).map_err(|_| UploadError::Randomness)?;

    let mut name = String::with_capacity(NAME_BYTES * 2 + 8);
    for byte in buf {
        name.push_str(&format!("{byte:02x}"));
    }
    name.push_str(extension(original_name));
    Ok(name)
}

/// Pick the content type to record for an upload.
///
/// Uses the part's declared type unless it is missing or generic, then
/// guesses from the original filename.
pub fn detect_content_type(declared: Option<&str>, original_name: Option<&str>) -> String {
    declared
        .filter(|ct| !ct.is_empty() && *ct != DEFAULT_CONTENT_TYPE)
        .map(|ct| ct.to_string())
        .or_else(|| {
            original_name
                .and_then(|n| mime_guess::from_path(n).first())
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

/// Name the upload and store its content.
///
/// Randomness failure aborts before anything is written.
pub async fn store_upload(
    store: &dyn LargeObjectStore,
    rng: &(dyn SecureRandom + Sync),
    original_name: &str,
    content_type: &str,
    data: ByteStream<'_>,
) -> Result<StoredFile, UploadError> {
    let mut filename = None;
    for _ in 0..MAX_NAME_ATTEMPTS {
        let candidate = random_filename(rng, original_name)?;
        if !store.exists(&candidate).await? {
            filename = Some(candidate);
            break;
        }
        tracing::warn!(filename = %candidate, "Generated filename already taken");
    }
    let filename = filename.ok_or(UploadError::NameExhausted(MAX_NAME_ATTEMPTS))?;

    let file = store.put(&filename, content_type, data).await?;

    tracing::info!(
        filename = %file.filename,
        original = %original_name,
        content_type = %file.content_type,
        length = file.length,
        bucket = %file.bucket_name,
        "Stored upload"
    );
    Ok(file)
}
