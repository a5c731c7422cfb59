use thiserror::Error;

/// GridFS default chunk size (255 KiB).
pub const DEFAULT_CHUNK_SIZE: u32 = 255 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    /// Request body limit for uploads in bytes. `None` accepts any size.
    pub max_upload_size: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// redb file on local disk
    Embedded,
    GridFs,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket_name: String,
    pub chunk_size: u32,
    /// Directory for the embedded backend
    pub data_dir: String,
    /// MongoDB connection string; the path names the database
    pub mongodb_uri: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::GridFs,
            bucket_name: "uploads".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            data_dir: "./data".to_string(),
            mongodb_uri: "mongodb://localhost:27017/gridfstest".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn load_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = StorageConfig::default();

        let bind_address = lookup("BIND_ADDRESS").unwrap_or(ServerConfig::default().bind_address);

        let backend = match lookup("STORAGE_BACKEND")
            .unwrap_or_else(|| "gridfs".to_string())
            .to_lowercase()
            .as_str()
        {
            "gridfs" | "mongodb" => StorageBackend::GridFs,
            "embedded" | "redb" => StorageBackend::Embedded,
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown STORAGE_BACKEND '{other}' (expected gridfs or embedded)"
                )))
            }
        };

        let chunk_size = match lookup("CHUNK_SIZE") {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!("CHUNK_SIZE must be an integer, got '{raw}'"))
            })?,
            None => defaults.chunk_size,
        };

        let max_upload_size = match lookup("MAX_UPLOAD_SIZE") {
            Some(raw) => Some(raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "MAX_UPLOAD_SIZE must be a byte count, got '{raw}'"
                ))
            })?),
            None => None,
        };

        let config = Config {
            server: ServerConfig { bind_address },
            storage: StorageConfig {
                backend,
                bucket_name: lookup("BUCKET_NAME").unwrap_or(defaults.bucket_name),
                chunk_size,
                data_dir: lookup("DATA_DIR").unwrap_or(defaults.data_dir),
                mongodb_uri: lookup("MONGODB_URI").unwrap_or(defaults.mongodb_uri),
            },
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.bucket_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "BUCKET_NAME cannot be empty".to_string(),
            ));
        }

        if self.storage.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "CHUNK_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::GridFs
            && !(self.storage.mongodb_uri.starts_with("mongodb://")
                || self.storage.mongodb_uri.starts_with("mongodb+srv://"))
        {
            return Err(ConfigError::ValidationError(
                "MONGODB_URI must start with mongodb:// or mongodb+srv://".to_string(),
            ));
        }

        if self.max_upload_size == Some(0) {
            tracing::warn!("MAX_UPLOAD_SIZE is 0, every upload will be rejected");
        }

        Ok(())
    }
}
