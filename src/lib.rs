//! file-gallery - upload files through a browser form and serve them back
//!
//! This crate provides:
//! - Multipart upload into chunked large-object storage (MongoDB GridFS or an
//!   embedded redb store) under randomly generated filenames
//! - JSON metadata endpoints for stored files
//! - Inline streaming of images and audio, selected by content type
//! - A server-rendered page listing every file with previews

pub mod api;
pub mod classify;
pub mod config;
pub mod store;
#[cfg(test)]
pub mod testutil;
pub mod uploads;

use std::sync::Arc;

use config::Config;
use ring::rand::SystemRandom;
use store::LargeObjectStore;

/// Shared application state
pub struct AppState {
    pub config: Config,
    /// Randomness source for generated filenames
    pub rng: SystemRandom,
    pub store: Arc<dyn LargeObjectStore>,
}
