use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata of one uploaded file as exposed by the `/files` endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    /// Total byte length of the content
    pub length: u64,
    pub chunk_size: u32,
    pub upload_date: DateTime<Utc>,
    pub bucket_name: String,
}

/// File record persisted by the embedded store (msgpack).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FileDocument {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub length: u64,
    pub chunk_size: u32,
    pub upload_date: DateTime<Utc>,
}

impl FileDocument {
    /// Number of chunks holding the content.
    pub fn chunk_count(&self) -> u32 {
        self.length.div_ceil(self.chunk_size as u64) as u32
    }

    pub fn into_stored(self, bucket_name: &str) -> StoredFile {
        StoredFile {
            id: self.id,
            filename: self.filename,
            content_type: self.content_type,
            length: self.length,
            chunk_size: self.chunk_size,
            upload_date: self.upload_date,
            bucket_name: bucket_name.to_string(),
        }
    }
}
