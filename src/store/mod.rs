mod embedded;
mod gridfs;
pub mod models;

pub use embedded::EmbeddedStore;
pub use gridfs::GridFsStore;
pub use models::StoredFile;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

/// Content type recorded when none could be determined.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A stream of file content, chunk by chunk.
pub type ByteStream<'a> = BoxStream<'a, Result<Bytes, std::io::Error>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Corrupt file {filename}: {reason}")]
    Corrupt { filename: String, reason: String },
    #[error("File already exists: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("Invalid connection string: {0}")]
    InvalidUri(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("MongoDB error: {0}")]
    Mongo(Box<mongodb::error::Error>),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl From<redb::CommitError> for StoreError {
    fn from(e: redb::CommitError) -> Self {
        StoreError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for StoreError {
    fn from(e: redb::DatabaseError) -> Self {
        StoreError::Database(Box::new(e))
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(e: redb::StorageError) -> Self {
        StoreError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for StoreError {
    fn from(e: redb::TableError) -> Self {
        StoreError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        StoreError::Transaction(Box::new(e))
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Mongo(Box::new(e))
    }
}

/// Chunked binary storage for uploaded files, scoped to one bucket.
///
/// Content is split into fixed-size chunks plus one metadata record per file.
/// Chunks are always written before the record, so an interrupted upload
/// never becomes visible through `find` or `list`.
#[async_trait]
pub trait LargeObjectStore: Send + Sync {
    fn bucket_name(&self) -> &str;

    /// Store `data` under `filename`, consuming the stream as it arrives.
    async fn put(
        &self,
        filename: &str,
        content_type: &str,
        data: ByteStream<'_>,
    ) -> Result<StoredFile, StoreError>;

    /// All files in the bucket, oldest upload first.
    async fn list(&self) -> Result<Vec<StoredFile>, StoreError>;

    async fn find(&self, filename: &str) -> Result<Option<StoredFile>, StoreError>;

    /// Stream the content of `filename` in chunk order.
    async fn open(&self, filename: &str) -> Result<ByteStream<'static>, StoreError>;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn exists(&self, filename: &str) -> Result<bool, StoreError> {
        Ok(self.find(filename).await?.is_some())
    }
}
