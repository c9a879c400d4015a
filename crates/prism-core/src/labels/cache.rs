//! On-disk cache of label embeddings.
//!
//! One JSON file per `(model, table name)` pair holds the label list, the
//! content hash it was built from, the model id, and the embedding matrix as
//! base64-encoded little-endian values. An entry is only accepted when every
//! one of those matches the table being built; anything else is a miss.

use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::embedding::Precision;
use crate::error::{CacheError, PrismError};

/// Bumped whenever the hash input or the vector encoding changes.
const CACHE_FORMAT_VERSION: u32 = 1;

/// Make a model identifier safe to use in a file name.
pub fn sanitize_model_name(model: &str) -> String {
    model.replace(['/', '@'], "_")
}

/// BLAKE3 hash of all labels joined with `,`, in order.
///
/// Any edit to a label's text or position changes the hash.
pub fn content_hash(labels: &[String]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            hasher.update(b",");
        }
        hasher.update(label.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Cache file location for a named table built with `model_id`.
pub fn cache_path(cache_dir: &Path, model_id: &str, name: &str) -> PathBuf {
    cache_dir.join(format!("{}_{}.json", sanitize_model_name(model_id), name))
}

/// Serialized cache record.
#[derive(Serialize, Deserialize)]
struct CacheEntry {
    version: u32,
    model: String,
    hash: String,
    encoding: String,
    dim: usize,
    labels: Vec<String>,
    embeds: String,
}

/// Labels and embeddings recovered from a valid cache entry.
pub(crate) struct CachedTable {
    pub labels: Vec<String>,
    pub matrix: Vec<f32>,
    pub dim: usize,
}

/// Load a cache entry, accepting it only if it matches exactly.
///
/// The hash alone is not enough: joining with `,` maps `["a", "b"]` and
/// `["a,b"]` to the same input, so the stored labels are compared too.
pub(crate) fn load(
    path: &Path,
    expected_labels: &[String],
    expected_hash: &str,
    model_id: &str,
    precision: Precision,
) -> Result<CachedTable, CacheError> {
    if !path.exists() {
        return Err(CacheError::Missing);
    }
    let bytes = std::fs::read(path)?;
    let entry: CacheEntry =
        serde_json::from_slice(&bytes).map_err(|e| CacheError::Malformed(e.to_string()))?;

    if entry.version != CACHE_FORMAT_VERSION {
        return Err(CacheError::EncodingMismatch {
            stored: format!("v{}", entry.version),
            expected: format!("v{CACHE_FORMAT_VERSION}"),
        });
    }
    if entry.hash != expected_hash {
        return Err(CacheError::HashMismatch {
            stored: entry.hash,
            expected: expected_hash.to_string(),
        });
    }
    if entry.labels != expected_labels {
        return Err(CacheError::LabelMismatch {
            stored: entry.labels.len(),
            expected: expected_labels.len(),
        });
    }
    if entry.model != model_id {
        return Err(CacheError::ModelMismatch {
            stored: entry.model,
            expected: model_id.to_string(),
        });
    }
    if entry.encoding != precision.name() {
        return Err(CacheError::EncodingMismatch {
            stored: entry.encoding,
            expected: precision.name().to_string(),
        });
    }

    let raw = base64::engine::general_purpose::STANDARD
        .decode(entry.embeds.as_bytes())
        .map_err(|e| CacheError::Malformed(format!("embeds are not base64: {e}")))?;
    let matrix = precision
        .decode(&raw)
        .ok_or_else(|| CacheError::Malformed("embeds byte length is ragged".into()))?;
    if matrix.len() != entry.labels.len() * entry.dim {
        return Err(CacheError::Malformed(format!(
            "{} values for {} labels x {} dims",
            matrix.len(),
            entry.labels.len(),
            entry.dim
        )));
    }

    Ok(CachedTable {
        labels: entry.labels,
        matrix,
        dim: entry.dim,
    })
}

/// Write a complete cache entry, replacing any previous one.
///
/// The entry is written to a sibling temp file and renamed into place, so a
/// reader never sees a half-written file.
pub(crate) fn save(
    path: &Path,
    model_id: &str,
    hash: &str,
    precision: Precision,
    labels: &[String],
    matrix: &[f32],
    dim: usize,
) -> Result<(), PrismError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let entry = CacheEntry {
        version: CACHE_FORMAT_VERSION,
        model: model_id.to_string(),
        hash: hash.to_string(),
        encoding: precision.name().to_string(),
        dim,
        labels: labels.to_vec(),
        embeds: base64::engine::general_purpose::STANDARD.encode(precision.encode(matrix)),
    };
    let bytes = serde_json::to_vec(&entry)?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &bytes)?;
    std::fs::rename(&tmp_path, path)?;

    tracing::info!(
        "Saved label cache to {:?} ({} labels, {:.1} MB)",
        path,
        labels.len(),
        bytes.len() as f64 / 1_000_000.0
    );
    Ok(())
}
