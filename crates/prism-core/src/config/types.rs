//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::embedding::Precision;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding one subdirectory of ONNX files per CLIP model
    pub model_dir: PathBuf,

    /// Directory for cached label embeddings
    pub cache_dir: PathBuf,

    /// Directory containing the vocabulary lists (artists.txt, flavors.txt, ...)
    pub data_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.prism/models"),
            cache_dir: PathBuf::from("~/.prism/cache"),
            data_dir: PathBuf::from("~/.prism/data"),
        }
    }
}

/// CLIP model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Model identifier, `architecture/pretrained` (e.g. "ViT-L-14/openai").
    /// Also keys the label cache, so switching models never reuses embeddings.
    pub model: String,

    /// Maximum token sequence length the text encoder accepts
    pub context_length: usize,

    /// Square input resolution of the vision encoder
    pub image_size: u32,

    /// Numeric precision for stored label embeddings.
    /// Comparisons always run at full precision.
    pub precision: Precision,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            model: "ViT-L-14/openai".to_string(),
            context_length: 77,
            image_size: 224,
            precision: Precision::Full,
        }
    }
}

/// Which prompt assembly strategy to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Joint category seeding plus greedy flavor chaining
    #[default]
    Best,
    /// Fixed template of top-1 categories and top flavors
    Classic,
    /// Single ranking over all vocabularies merged
    Fast,
}

/// Interrogator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterrogatorConfig {
    /// Labels per embedding batch, and the partition size for hierarchical ranking
    pub chunk_size: usize,

    /// Flavor candidates carried into the greedy chaining loop
    pub flavor_intermediate_count: usize,

    /// Upper bound on flavors appended to a prompt
    pub max_flavors: usize,

    /// Default prompt assembly strategy
    pub mode: Mode,

    /// Persist label embeddings under `general.cache_dir`
    pub cache_labels: bool,
}

impl Default for InterrogatorConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2048,
            flavor_intermediate_count: 2048,
            max_flavors: 32,
            mode: Mode::Best,
            cache_labels: true,
        }
    }
}

/// Captioning backend settings (Ollama vision model).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Ollama API endpoint
    pub endpoint: String,

    /// Vision model name
    pub model: String,

    /// Instruction sent alongside the image
    pub prompt: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Max retry attempts for transient failures
    pub retry_attempts: u32,

    /// Base delay between retries in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2-vision".to_string(),
            prompt: "Describe this image in one short sentence, starting with what it is \
                     (for example \"a photo of a cat sitting on a couch\")."
                .to_string(),
            max_tokens: 48,
            temperature: 0.0,
            timeout_ms: 120_000,
            retry_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
