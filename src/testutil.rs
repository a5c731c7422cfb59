//! Shared test helpers for file-gallery tests.

use std::sync::Arc;

use ring::rand::SystemRandom;

use crate::config::{Config, ServerConfig, StorageBackend, StorageConfig};
use crate::store::EmbeddedStore;
use crate::AppState;

/// Small chunks so multi-chunk paths run with small payloads.
pub const TEST_CHUNK_SIZE: u32 = 1024;

/// Create a test AppState backed by an embedded store in a temporary directory.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    test_state_with_limit(temp_dir, 10 * 1024 * 1024) // 10MB for tests
}

/// Like [`test_state`], with a custom upload body limit.
pub fn test_state_with_limit(temp_dir: &tempfile::TempDir, max_upload_size: u64) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");

    let config = Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
        },
        storage: StorageConfig {
            backend: StorageBackend::Embedded,
            chunk_size: TEST_CHUNK_SIZE,
            data_dir: data_dir.to_string_lossy().to_string(),
            ..Default::default()
        },
        max_upload_size: Some(max_upload_size),
    };

    let store = EmbeddedStore::open(
        &data_dir,
        &config.storage.bucket_name,
        config.storage.chunk_size,
    )
    .expect("Failed to open test store");

    Arc::new(AppState {
        config,
        rng: SystemRandom::new(),
        store: Arc::new(store),
    })
}
