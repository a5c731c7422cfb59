use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

use super::models::{FileDocument, StoredFile};
use super::{ByteStream, LargeObjectStore, StoreError};

/// Large-object store kept in a local redb file.
///
/// Mirrors the GridFS layout: a `<bucket>.files` table of msgpack file records
/// keyed by filename and a `<bucket>.chunks` table keyed by `(file id, n)`.
/// Chunk keys use the record id rather than the filename, so chunks orphaned
/// by an interrupted upload never collide with a later upload of the same name.
pub struct EmbeddedStore {
    db: Arc<Database>,
    bucket_name: String,
    files_table: String,
    chunks_table: String,
    chunk_size: u32,
}

impl EmbeddedStore {
    /// Open or create the store under `data_dir`.
    pub fn open<P: AsRef<Path>>(
        data_dir: P,
        bucket_name: &str,
        chunk_size: u32,
    ) -> Result<Self, StoreError> {
        debug_assert!(chunk_size > 0, "chunk size must be positive");

        std::fs::create_dir_all(data_dir.as_ref())?;
        let db = Arc::new(Database::create(data_dir.as_ref().join("file-gallery.redb"))?);

        let store = Self {
            db,
            bucket_name: bucket_name.to_string(),
            files_table: format!("{bucket_name}.files"),
            chunks_table: format!("{bucket_name}.chunks"),
            chunk_size,
        };

        // Create both tables up front so read transactions can open them
        let write_txn = store.db.begin_write()?;
        {
            let _ = write_txn.open_table(store.files_def())?;
            let _ = write_txn.open_table(store.chunks_def())?;
        }
        write_txn.commit()?;

        Ok(store)
    }

    fn files_def(&self) -> TableDefinition<'_, &'static str, &'static [u8]> {
        TableDefinition::new(&self.files_table)
    }

    fn chunks_def(&self) -> TableDefinition<'_, (&'static str, u32), &'static [u8]> {
        TableDefinition::new(&self.chunks_table)
    }

    fn get_document(&self, filename: &str) -> Result<Option<FileDocument>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.files_def())?;

        match table.get(filename)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    fn write_chunk(&self, file_id: &str, n: u32, data: &[u8]) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(self.chunks_def())?;
            table.insert((file_id, n), data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Drain `data` into chunks of `id`, counting committed chunks in
    /// `written`. Returns the total byte length.
    async fn write_chunks(
        &self,
        id: &str,
        data: &mut ByteStream<'_>,
        written: &mut u32,
    ) -> Result<u64, StoreError> {
        let chunk_size = self.chunk_size as usize;
        let mut pending = BytesMut::with_capacity(chunk_size);
        let mut length: u64 = 0;

        while let Some(bytes) = data.try_next().await? {
            length += bytes.len() as u64;
            pending.extend_from_slice(&bytes);

            while pending.len() >= chunk_size {
                let chunk = pending.split_to(chunk_size);
                self.write_chunk(id, *written, &chunk)?;
                *written += 1;
            }
        }
        if !pending.is_empty() {
            self.write_chunk(id, *written, &pending)?;
            *written += 1;
        }

        Ok(length)
    }

    /// Remove chunks `0..count` of `id` in one transaction.
    fn remove_chunks(&self, id: &str, count: u32) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(self.chunks_def())?;
            for n in 0..count {
                table.remove((id, n))?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Publish the file record. Fails with `Conflict` (dropping the freshly
    /// written chunks) when the filename is already taken.
    fn commit_document(&self, doc: &FileDocument) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        let taken = {
            let mut files = write_txn.open_table(self.files_def())?;
            let taken = files.get(doc.filename.as_str())?.is_some();
            if !taken {
                let data = rmp_serde::to_vec_named(doc)?;
                files.insert(doc.filename.as_str(), data.as_slice())?;
            }
            taken
        };

        if taken {
            let mut chunks = write_txn.open_table(self.chunks_def())?;
            for n in 0..doc.chunk_count() {
                chunks.remove((doc.id.as_str(), n))?;
            }
        }
        write_txn.commit()?;

        if taken {
            return Err(StoreError::Conflict(doc.filename.clone()));
        }
        Ok(())
    }
}

/// Read chunk `n` of `doc`, checking its size against the record.
fn read_chunk(
    db: &Database,
    chunks_table: &str,
    doc: &FileDocument,
    n: u32,
) -> Result<Bytes, StoreError> {
    let definition: TableDefinition<(&'static str, u32), &'static [u8]> =
        TableDefinition::new(chunks_table);
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(definition)?;

    let data = table
        .get((doc.id.as_str(), n))?
        .ok_or_else(|| StoreError::Corrupt {
            filename: doc.filename.clone(),
            reason: format!("missing chunk {n}"),
        })?;
    let bytes = Bytes::copy_from_slice(data.value());

    let chunk_size = doc.chunk_size as u64;
    let expected = if n + 1 == doc.chunk_count() {
        doc.length - chunk_size * n as u64
    } else {
        chunk_size
    };
    if bytes.len() as u64 != expected {
        return Err(StoreError::Corrupt {
            filename: doc.filename.clone(),
            reason: format!(
                "chunk {n} has {} bytes, expected {expected}",
                bytes.len()
            ),
        });
    }

    Ok(bytes)
}

#[async_trait]
impl LargeObjectStore for EmbeddedStore {
    fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    async fn put(
        &self,
        filename: &str,
        content_type: &str,
        mut data: ByteStream<'_>,
    ) -> Result<StoredFile, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut written: u32 = 0;

        let length = match self.write_chunks(&id, &mut data, &mut written).await {
            Ok(length) => length,
            Err(e) => {
                if let Err(cleanup_err) = self.remove_chunks(&id, written) {
                    tracing::warn!(filename, error = %cleanup_err, "Failed to remove partial chunks");
                }
                return Err(e);
            }
        };

        let doc = FileDocument {
            id,
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            length,
            chunk_size: self.chunk_size,
            upload_date: Utc::now(),
        };
        self.commit_document(&doc)?;

        tracing::debug!(filename, chunks = doc.chunk_count(), "Committed file");
        Ok(doc.into_stored(&self.bucket_name))
    }

    async fn list(&self) -> Result<Vec<StoredFile>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.files_def())?;

        let mut docs = Vec::new();
        for entry in table.iter()? {
            let (_, data) = entry?;
            let doc: FileDocument = rmp_serde::from_slice(data.value())?;
            docs.push(doc);
        }
        docs.sort_by(|a, b| {
            a.upload_date
                .cmp(&b.upload_date)
                .then_with(|| a.filename.cmp(&b.filename))
        });

        Ok(docs
            .into_iter()
            .map(|doc| doc.into_stored(&self.bucket_name))
            .collect())
    }

    async fn find(&self, filename: &str) -> Result<Option<StoredFile>, StoreError> {
        Ok(self
            .get_document(filename)?
            .map(|doc| doc.into_stored(&self.bucket_name)))
    }

    async fn open(&self, filename: &str) -> Result<ByteStream<'static>, StoreError> {
        let doc = self
            .get_document(filename)?
            .ok_or_else(|| StoreError::NotFound(filename.to_string()))?;

        let db = Arc::clone(&self.db);
        let chunks_table = self.chunks_table.clone();
        let stream = futures::stream::iter(0..doc.chunk_count())
            .map(move |n| read_chunk(&db, &chunks_table, &doc, n).map_err(std::io::Error::other));

        Ok(stream.boxed())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(self.files_def())?;
        Ok(())
    }
}
