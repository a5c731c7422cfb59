mod files;
mod health;
mod media;
mod pages;

pub use files::{get_file, list_files};
pub use health::health;
pub use media::{serve_audio, serve_image};
pub use pages::{index, upload};
