use async_trait::async_trait;
use futures::{AsyncWriteExt, StreamExt, TryStreamExt};
use mongodb::bson::{doc, Bson};
use mongodb::error::{ErrorKind, GridFsErrorKind};
use mongodb::gridfs::{FilesCollectionDocument, GridFsBucket};
use mongodb::options::GridFsBucketOptions;
use mongodb::{Client, Database};
use tokio_util::compat::FuturesAsyncReadCompatExt;
use tokio_util::io::ReaderStream;

use super::{ByteStream, LargeObjectStore, StoreError, StoredFile, DEFAULT_CONTENT_TYPE};

/// Large-object store backed by MongoDB GridFS.
///
/// The content type is kept in the file document's `metadata.contentType`.
pub struct GridFsStore {
    bucket: GridFsBucket,
    bucket_name: String,
    database: Database,
}

impl GridFsStore {
    /// Connect and verify the server answers before returning.
    ///
    /// The database is taken from the path of `uri`.
    pub async fn connect(
        uri: &str,
        bucket_name: &str,
        chunk_size: u32,
    ) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.default_database().ok_or_else(|| {
            StoreError::InvalidUri("connection string does not name a database".to_string())
        })?;

        database.run_command(doc! { "ping": 1 }).await?;

        let options = GridFsBucketOptions::builder()
            .bucket_name(bucket_name.to_string())
            .chunk_size_bytes(chunk_size)
            .build();
        let bucket = database.gridfs_bucket(options);

        tracing::info!(database = %database.name(), bucket = %bucket_name, "Connected to GridFS");

        Ok(Self {
            bucket,
            bucket_name: bucket_name.to_string(),
            database,
        })
    }

    fn to_stored(&self, file: FilesCollectionDocument) -> StoredFile {
        let id = match &file.id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        };
        let content_type = file
            .metadata
            .as_ref()
            .and_then(|m| m.get_str("contentType").ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let upload_date =
            chrono::DateTime::from_timestamp_millis(file.upload_date.timestamp_millis())
                .unwrap_or_default();

        StoredFile {
            id,
            filename: file.filename.unwrap_or_default(),
            content_type,
            length: file.length,
            chunk_size: file.chunk_size_bytes,
            upload_date,
            bucket_name: self.bucket_name.clone(),
        }
    }
}

#[async_trait]
impl LargeObjectStore for GridFsStore {
    fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    async fn put(
        &self,
        filename: &str,
        content_type: &str,
        mut data: ByteStream<'_>,
    ) -> Result<StoredFile, StoreError> {
        let mut upload = self
            .bucket
            .open_upload_stream(filename)
            .metadata(doc! { "contentType": content_type })
            .await?;
        let id = upload.id().clone();

        // Chunks are flushed as they fill; the files document is only
        // written by `close`, so an abort leaves nothing visible.
        let written: Result<(), std::io::Error> = async {
            while let Some(bytes) = data.try_next().await? {
                upload.write_all(&bytes).await?;
            }
            upload.close().await
        }
        .await;

        if let Err(e) = written {
            if let Err(abort_err) = upload.abort().await {
                tracing::warn!(filename, error = %abort_err, "Failed to abort GridFS upload");
            }
            return Err(e.into());
        }

        let file = self
            .bucket
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| StoreError::NotFound(filename.to_string()))?;

        Ok(self.to_stored(file))
    }

    async fn list(&self) -> Result<Vec<StoredFile>, StoreError> {
        let files: Vec<FilesCollectionDocument> = self
            .bucket
            .find(doc! {})
            .sort(doc! { "uploadDate": 1 })
            .await?
            .try_collect()
            .await?;

        Ok(files.into_iter().map(|f| self.to_stored(f)).collect())
    }

    async fn find(&self, filename: &str) -> Result<Option<StoredFile>, StoreError> {
        let file = self.bucket.find_one(doc! { "filename": filename }).await?;
        Ok(file.map(|f| self.to_stored(f)))
    }

    async fn open(&self, filename: &str) -> Result<ByteStream<'static>, StoreError> {
        let download = self
            .bucket
            .open_download_stream_by_name(filename)
            .await
            .map_err(|e| {
                if matches!(
                    *e.kind,
                    ErrorKind::GridFs(GridFsErrorKind::FileNotFound { .. })
                ) {
                    StoreError::NotFound(filename.to_string())
                } else {
                    StoreError::from(e)
                }
            })?;

        Ok(ReaderStream::new(download.compat()).boxed())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
