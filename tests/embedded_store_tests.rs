use bytes::Bytes;
use file_gallery::store::{ByteStream, EmbeddedStore, LargeObjectStore, StoreError};
use file_gallery::uploads::store_upload;
use futures::{StreamExt, TryStreamExt};
use redb::ReadableTable;
use ring::rand::SystemRandom;

const CHUNK_SIZE: u32 = 16;

fn test_store() -> (tempfile::TempDir, EmbeddedStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = EmbeddedStore::open(dir.path().join("data"), "uploads", CHUNK_SIZE).unwrap();
    (dir, store)
}

/// Split `data` into stream items of `piece` bytes, unaligned with chunks.
fn stream_of(data: &[u8], piece: usize) -> ByteStream<'static> {
    let items: Vec<Result<Bytes, std::io::Error>> = data
        .chunks(piece)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    futures::stream::iter(items).boxed()
}

/// Count every chunk entry in the `uploads` bucket, reopening the store file.
fn chunk_entries(dir: &tempfile::TempDir) -> usize {
    let db = redb::Database::open(dir.path().join("data").join("file-gallery.redb")).unwrap();
    let definition: redb::TableDefinition<(&'static str, u32), &'static [u8]> =
        redb::TableDefinition::new("uploads.chunks");
    let read_txn = db.begin_read().unwrap();
    let table = read_txn.open_table(definition).unwrap();
    table.iter().unwrap().count()
}

async fn read_all(store: &EmbeddedStore, filename: &str) -> Vec<u8> {
    let chunks: Vec<Bytes> = store.open(filename).await.unwrap().try_collect().await.unwrap();
    chunks.concat()
}

#[tokio::test]
async fn test_put_and_find() {
    let (_dir, store) = test_store();

    let file = store
        .put("a.txt", "text/plain", stream_of(b"hello world", 4))
        .await
        .unwrap();
    assert_eq!(file.filename, "a.txt");
    assert_eq!(file.content_type, "text/plain");
    assert_eq!(file.length, 11);
    assert_eq!(file.chunk_size, CHUNK_SIZE);
    assert_eq!(file.bucket_name, "uploads");

    let found = store.find("a.txt").await.unwrap().expect("file should exist");
    assert_eq!(found, file);
}

#[tokio::test]
async fn test_find_missing() {
    let (_dir, store) = test_store();
    assert!(store.find("missing").await.unwrap().is_none());
    assert!(!store.exists("missing").await.unwrap());
}

#[tokio::test]
async fn test_multi_chunk_round_trip() {
    let (_dir, store) = test_store();
    let data: Vec<u8> = (0..100u8).collect();

    store
        .put("big.bin", "application/octet-stream", stream_of(&data, 7))
        .await
        .unwrap();

    let chunks: Vec<Bytes> = store
        .open("big.bin")
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    // 100 bytes in 16-byte chunks
    assert_eq!(chunks.len(), 7);
    assert!(chunks[..6].iter().all(|c| c.len() == 16));
    assert_eq!(chunks[6].len(), 4);
    assert_eq!(chunks.concat(), data);
}

#[tokio::test]
async fn test_exact_chunk_multiple() {
    let (_dir, store) = test_store();
    let data = vec![7u8; 32];

    store.put("even", "text/plain", stream_of(&data, 32)).await.unwrap();
    assert_eq!(read_all(&store, "even").await, data);
}

#[tokio::test]
async fn test_empty_file() {
    let (_dir, store) = test_store();

    let file = store.put("empty", "text/plain", stream_of(b"", 1)).await.unwrap();
    assert_eq!(file.length, 0);
    assert!(read_all(&store, "empty").await.is_empty());
}

#[tokio::test]
async fn test_open_missing_is_not_found() {
    let (_dir, store) = test_store();
    assert!(matches!(
        store.open("missing").await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_duplicate_filename_conflicts() {
    let (dir, store) = test_store();
    store.put("dup", "text/plain", stream_of(b"first", 5)).await.unwrap();

    let result = store.put("dup", "text/plain", stream_of(b"second!", 5)).await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));

    // The original content is untouched
    assert_eq!(read_all(&store, "dup").await, b"first");

    drop(store);
    assert_eq!(chunk_entries(&dir), 1);
}

#[tokio::test]
async fn test_failed_stream_leaves_no_record() {
    let (dir, store) = test_store();
    let items: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(&[1u8; 40])),
        Err(std::io::Error::other("client went away")),
    ];

    let result = store
        .put("partial", "text/plain", futures::stream::iter(items).boxed())
        .await;
    assert!(matches!(result, Err(StoreError::Io(_))));
    assert!(store.find("partial").await.unwrap().is_none());
    assert!(store.list().await.unwrap().is_empty());

    // The two full chunks written before the error are gone too
    drop(store);
    assert_eq!(chunk_entries(&dir), 0);
}

#[tokio::test]
async fn test_list_in_upload_order() {
    let (_dir, store) = test_store();
    for name in ["c", "a", "b"] {
        store.put(name, "text/plain", stream_of(b"x", 1)).await.unwrap();
    }

    let names: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.filename)
        .collect();
    assert_eq!(names, vec!["c", "a", "b"]);
}

#[tokio::test]
async fn test_buckets_are_separate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data");
    {
        let uploads = EmbeddedStore::open(&path, "uploads", CHUNK_SIZE).unwrap();
        uploads.put("shared", "text/plain", stream_of(b"one", 3)).await.unwrap();
    }

    let other = EmbeddedStore::open(&path, "archive", CHUNK_SIZE).unwrap();
    assert!(other.find("shared").await.unwrap().is_none());
    assert!(other.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reopen_keeps_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data");
    {
        let store = EmbeddedStore::open(&path, "uploads", CHUNK_SIZE).unwrap();
        store.put("kept", "image/png", stream_of(b"persisted bytes", 4)).await.unwrap();
    }

    let store = EmbeddedStore::open(&path, "uploads", CHUNK_SIZE).unwrap();
    assert_eq!(read_all(&store, "kept").await, b"persisted bytes");
}

#[tokio::test]
async fn test_ping() {
    let (_dir, store) = test_store();
    store.ping().await.unwrap();
}

#[tokio::test]
async fn test_store_upload_generates_name() {
    let (_dir, store) = test_store();
    let rng = SystemRandom::new();

    let file = store_upload(&store, &rng, "photo.PNG", "image/png", stream_of(b"png", 2))
        .await
        .unwrap();

    assert_eq!(file.filename.len(), 36);
    assert!(file.filename.ends_with(".PNG"));
    assert_eq!(file.content_type, "image/png");
    assert_eq!(read_all(&store, &file.filename).await, b"png");
}

#[tokio::test]
async fn test_store_upload_names_are_unique() {
    let (_dir, store) = test_store();
    let rng = SystemRandom::new();

    let a = store_upload(&store, &rng, "a.wav", "audio/wav", stream_of(b"1", 1))
        .await
        .unwrap();
    let b = store_upload(&store, &rng, "a.wav", "audio/wav", stream_of(b"2", 1))
        .await
        .unwrap();

    assert_ne!(a.filename, b.filename);
    assert_eq!(store.list().await.unwrap().len(), 2);
}
