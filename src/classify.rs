//! Content-type classification for rendering and media serving.

use serde::Serialize;

const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png"];

const AUDIO_TYPES: &[&str] = &["audio/mp3", "audio/wav", "audio/x-ms-wma"];

/// Audio types browsers play inline in an `<audio>` element.
const INLINE_AUDIO_TYPES: &[&str] = &["audio/mp3", "audio/wav"];

/// Category of a stored file derived from its content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Image,
    Other,
}

impl MediaKind {
    /// Content types are matched exactly.
    pub fn from_content_type(content_type: &str) -> Self {
        if IMAGE_TYPES.contains(&content_type) {
            MediaKind::Image
        } else if AUDIO_TYPES.contains(&content_type) {
            MediaKind::Audio
        } else {
            MediaKind::Other
        }
    }
}

/// Presentation flags attached to a file in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_image: bool,
    pub is_audio: bool,
}

pub fn classify(content_type: &str) -> Classification {
    let kind = MediaKind::from_content_type(content_type);
    Classification {
        is_image: kind == MediaKind::Image,
        is_audio: kind == MediaKind::Audio,
    }
}

/// Audio that `/audio/:filename` will stream. Narrower than
/// [`MediaKind::Audio`]: `audio/x-ms-wma` is listed as audio but not served.
pub fn is_inline_audio(content_type: &str) -> bool {
    INLINE_AUDIO_TYPES.contains(&content_type)
}
