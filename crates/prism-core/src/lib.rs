//! Prism Core - turn images into text prompts.
//!
//! Prism ranks large curated vocabularies (artists, mediums, movements,
//! "flavors") against a CLIP image embedding and assembles the best-scoring
//! prompt around a caption, within the text encoder's token budget.
//!
//! # Architecture
//!
//! ```text
//! Image → Caption (Ollama) ─┐
//!       → Embed (CLIP) ─────┴→ Rank label tables → Search prompt → Truncate
//! ```
//!
//! Label embeddings are computed once per model and cached on disk, keyed by
//! a hash of the label list.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prism_core::{caption, ClipProvider, Config, Interrogator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let provider = Arc::new(ClipProvider::load(&config.clip, &config.model_dir())?);
//!     let interrogator = Interrogator::new(&config, provider)?;
//!
//!     let bytes = std::fs::read("cat.jpg")?;
//!     let image = image::load_from_memory(&bytes)?;
//!     let captioner = caption::OllamaCaptioner::new(&config.caption);
//!     let input = caption::ImageInput::from_bytes(&bytes, "jpeg");
//!     let text = caption::caption_with_retry(&captioner, &input, (&config.caption).into()).await?;
//!
//!     let features = interrogator.image_features(&image)?;
//!     println!("{}", interrogator.interrogate(&features, &text, 32)?);
//!     Ok(())
//! }
//! ```

pub mod caption;
pub mod config;
pub mod embedding;
pub mod error;
pub mod interrogator;
pub mod labels;
pub mod math;
pub mod prompt;

#[cfg(test)]
mod testing;

pub use config::{Config, Mode};
pub use embedding::{ClipProvider, EmbeddingProvider, Precision};
pub use error::{CacheError, ConfigError, PrismError, ProviderError, ProviderResult, Result};
pub use interrogator::{Interrogator, InterrogatorOptions, LabelSource};
pub use labels::{LabelTable, RankedLabel, TableSettings};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
