//! Image captioning through a vision language model.
//!
//! The caption is the seed of every generated prompt. Captioners are async
//! HTTP clients; retrying transient failures is the caller's choice via
//! [`caption_with_retry`].

mod ollama;
mod retry;

pub use ollama::OllamaCaptioner;
pub use retry::{backoff_duration, caption_with_retry, is_retryable, RetryPolicy};

use async_trait::async_trait;
use base64::Engine;

use crate::error::ProviderResult;

/// Base64-encoded image ready to send to a captioning API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Create an `ImageInput` from raw bytes and format string.
    ///
    /// The format is the image format identifier (e.g., "jpeg", "png", "webp").
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            other => {
                tracing::warn!("Unknown image format '{other}', defaulting to image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }
}

/// A backend that describes an image in one sentence.
///
/// Uses `async_trait` so captioners can be held as `Box<dyn Captioner>`.
#[async_trait]
pub trait Captioner: Send + Sync {
    /// Backend name for logging (e.g., "ollama").
    fn name(&self) -> &str;

    /// Check whether the backend is reachable.
    async fn is_available(&self) -> bool;

    /// Generate a caption for `image`.
    async fn caption(&self, image: &ImageInput) -> ProviderResult<String>;
}
