//! Error types for the Prism interrogation engine.
//!
//! Errors are split by origin: configuration, the embedding/captioning
//! provider, and the on-disk label cache. Cache errors never reach callers;
//! the label table logs them and recomputes.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Prism operations.
#[derive(Error, Debug)]
pub enum PrismError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Embedding or captioning provider failures
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Two embedding sets with different dimensions were combined
    #[error("Embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// An operation needed labels but got neither a file nor an option list
    #[error("No labels supplied: {0}")]
    MissingLabels(String),

    /// A vocabulary file could not be read
    #[error("Failed to read vocabulary {path}: {message}")]
    VocabularyRead { path: PathBuf, message: String },
}

/// Failures raised by the embedding model or the captioner.
///
/// The core never retries these; they propagate to the caller.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Model files missing or unloadable
    #[error("Model error: {message}")]
    Model { message: String },

    /// Encoder inference failed or returned unusable output
    #[error("Inference failed: {message}")]
    Inference { message: String },

    /// Tokenization failed
    #[error("Tokenizer error: {message}")]
    Tokenizer { message: String },

    /// Caption generation failed
    #[error("Caption error: {message}")]
    Caption {
        message: String,
        status_code: Option<u16>,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },
}

/// Reasons a persisted label cache entry was rejected.
///
/// Every variant is treated as a cache miss.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("no cache entry")]
    Missing,

    #[error("cache entry unreadable: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("cache entry malformed: {0}")]
    Malformed(String),

    #[error("label hash mismatch (stored {stored}, expected {expected})")]
    HashMismatch { stored: String, expected: String },

    #[error("label list mismatch (stored {stored} labels, expected {expected})")]
    LabelMismatch { stored: usize, expected: usize },

    #[error("model mismatch (stored {stored}, expected {expected})")]
    ModelMismatch { stored: String, expected: String },

    #[error("vector encoding mismatch (stored {stored}, expected {expected})")]
    EncodingMismatch { stored: String, expected: String },
}

/// Convenience type alias for Prism results.
pub type Result<T> = std::result::Result<T, PrismError>;

/// Convenience type alias for provider-level results.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
