use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_gallery::{
    api,
    config::{Config, StorageBackend},
    store::{EmbeddedStore, GridFsStore, LargeObjectStore},
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "file-gallery starting");

    // Load configuration
    let config = Config::load()?;

    // Connect the large-object store before accepting requests
    let store: Arc<dyn LargeObjectStore> = match config.storage.backend {
        StorageBackend::GridFs => {
            let store = GridFsStore::connect(
                &config.storage.mongodb_uri,
                &config.storage.bucket_name,
                config.storage.chunk_size,
            )
            .await?;
            info!(
                bucket = %config.storage.bucket_name,
                "Using GridFS storage backend"
            );
            Arc::new(store)
        }
        StorageBackend::Embedded => {
            let store = EmbeddedStore::open(
                &config.storage.data_dir,
                &config.storage.bucket_name,
                config.storage.chunk_size,
            )?;
            info!(
                bucket = %config.storage.bucket_name,
                "Using embedded storage backend at: {}",
                config.storage.data_dir
            );
            Arc::new(store)
        }
    };

    // Create shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        rng: ring::rand::SystemRandom::new(),
        store,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!("Listening on: {}", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
