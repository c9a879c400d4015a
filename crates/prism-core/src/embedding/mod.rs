//! Joint image/text embedding.
//!
//! The [`EmbeddingProvider`] trait is the only thing the ranking and search
//! code knows about the model: batched text embedding, image embedding, and a
//! token budget check. [`ClipProvider`] implements it with a CLIP model
//! exported to ONNX and run locally through ONNX Runtime.
//!
//! # Usage
//!
//! ```rust,ignore
//! use prism_core::embedding::{ClipProvider, EmbeddingProvider};
//! use prism_core::Config;
//!
//! let config = Config::default();
//! let provider = ClipProvider::load(&config.clip, &config.model_dir())?;
//! let features = provider.embed_image(&image)?;
//! let fits = provider.fits_budget("a photo of a cat, oil painting");
//! ```

pub(crate) mod precision;
pub(crate) mod preprocess;
pub(crate) mod text;
pub(crate) mod vision;

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::config::ClipConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::labels::sanitize_model_name;

pub use self::precision::Precision;

use self::preprocess::preprocess;
use self::text::ClipTextEncoder;
use self::vision::ClipVisionSession;

/// Vision tower filename inside a model directory.
const VISION_MODEL_FILENAME: &str = "vision_model.onnx";
/// Text tower filename inside a model directory.
const TEXT_MODEL_FILENAME: &str = "text_model.onnx";
/// Tokenizer filename inside a model directory.
const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// Source of embeddings in a shared image/text space.
///
/// Returned vectors should be unit length; callers normalize again anyway.
/// Methods are synchronous and blocking.
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier, used to key cached label embeddings.
    fn model_id(&self) -> &str;

    /// Embed a batch of strings, one vector per input in input order.
    fn embed_text(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>>;

    /// Embed a single image.
    fn embed_image(&self, image: &DynamicImage) -> ProviderResult<Vec<f32>>;

    /// Whether `text` fits the model's maximum context length.
    fn fits_budget(&self, text: &str) -> bool;
}

/// CLIP image + text encoders backed by ONNX Runtime.
pub struct ClipProvider {
    model_id: String,
    image_size: u32,
    vision: ClipVisionSession,
    text: ClipTextEncoder,
}

impl ClipProvider {
    /// Load both encoders for `config.model` from `model_dir`.
    ///
    /// Expects `vision_model.onnx`, `text_model.onnx` and `tokenizer.json` in
    /// `{model_dir}/{sanitized model id}/`.
    pub fn load(config: &ClipConfig, model_dir: &Path) -> ProviderResult<Self> {
        let dir = Self::model_path(config, model_dir);
        for file in [VISION_MODEL_FILENAME, TEXT_MODEL_FILENAME, TOKENIZER_FILENAME] {
            let path = dir.join(file);
            if !path.exists() {
                return Err(ProviderError::Model {
                    message: format!(
                        "{file} not found at {:?}. Export the {} model to ONNX and place it there.",
                        path, config.model
                    ),
                });
            }
        }

        tracing::info!("Loading CLIP model {} from {:?}", config.model, dir);
        let vision = ClipVisionSession::load(&dir.join(VISION_MODEL_FILENAME))?;
        let text = ClipTextEncoder::new(
            &dir.join(TEXT_MODEL_FILENAME),
            &dir.join(TOKENIZER_FILENAME),
            config.context_length,
        )?;
        tracing::info!("CLIP model loaded successfully");

        Ok(Self {
            model_id: config.model.clone(),
            image_size: config.image_size,
            vision,
            text,
        })
    }

    /// Directory expected to hold the model's ONNX files.
    pub fn model_path(config: &ClipConfig, model_dir: &Path) -> PathBuf {
        model_dir.join(sanitize_model_name(&config.model))
    }

    /// Check whether all model files exist on disk.
    pub fn model_exists(config: &ClipConfig, model_dir: &Path) -> bool {
        let dir = Self::model_path(config, model_dir);
        [VISION_MODEL_FILENAME, TEXT_MODEL_FILENAME, TOKENIZER_FILENAME]
            .iter()
            .all(|f| dir.join(f).exists())
    }
}

impl EmbeddingProvider for ClipProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed_text(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        self.text.encode_batch(texts)
    }

    fn embed_image(&self, image: &DynamicImage) -> ProviderResult<Vec<f32>> {
        let tensor = preprocess(image, self.image_size);
        self.vision.embed(&tensor)
    }

    fn fits_budget(&self, text: &str) -> bool {
        self.text.fits(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_path_is_sanitized() {
        let config = ClipConfig::default();
        let path = ClipProvider::model_path(&config, Path::new("/models"));
        assert_eq!(path, PathBuf::from("/models/ViT-L-14_openai"));
    }

    #[test]
    fn test_load_missing_model_reports_location() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClipConfig::default();
        assert!(!ClipProvider::model_exists(&config, dir.path()));

        let err = match ClipProvider::load(&config, dir.path()) {
            Ok(_) => panic!("load should fail without model files"),
            Err(e) => e,
        };
        let message = err.to_string();
        assert!(message.contains("vision_model.onnx"));
        assert!(message.contains("ViT-L-14_openai"));
    }
}
