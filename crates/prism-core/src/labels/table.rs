//! Label tables: candidate strings with cached embeddings.
//!
//! A table stores a flat N×dim matrix (row-major), one row per label, that is
//! dot-producted against an image embedding for ranking. Named tables are
//! persisted per model and reloaded when the label list is unchanged.

use std::path::PathBuf;

use crate::embedding::{EmbeddingProvider, Precision};
use crate::error::{PrismError, Result};

use super::cache::{self, cache_path, content_hash};
use super::rank::{embed_prepared, hierarchical_top_k};

/// How tables are built: where to cache, batch size, storage precision.
#[derive(Debug, Clone)]
pub struct TableSettings {
    /// Cache directory; `None` disables persistence for every table.
    pub cache_dir: Option<PathBuf>,
    /// Labels per embedding batch and per ranking chunk.
    pub chunk_size: usize,
    /// Storage precision of label embeddings.
    pub precision: Precision,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            cache_dir: None,
            chunk_size: 2048,
            precision: Precision::Full,
        }
    }
}

/// A label with its similarity to the query embedding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedLabel<'a> {
    pub label: &'a str,
    pub score: f32,
}

/// Ordered labels and their unit-length embeddings.
#[derive(Debug, Clone)]
pub struct LabelTable {
    labels: Vec<String>,
    /// Flat matrix: labels.len() × dim, row-major.
    matrix: Vec<f32>,
    dim: usize,
    chunk_size: usize,
}

impl LabelTable {
    /// Build a table, reusing cached embeddings when possible.
    ///
    /// With a `name` and a cache directory, an existing cache entry for
    /// `(provider model, name)` is used when its label hash matches exactly;
    /// otherwise labels are embedded in batches of `chunk_size` and the entry
    /// is rewritten. Unnamed tables are never cached.
    pub fn build(
        labels: Vec<String>,
        name: Option<&str>,
        provider: &dyn EmbeddingProvider,
        settings: &TableSettings,
    ) -> Result<Self> {
        let chunk_size = settings.chunk_size.max(1);
        let hash = content_hash(&labels);
        let path = match (name, &settings.cache_dir) {
            (Some(name), Some(dir)) => Some(cache_path(dir, provider.model_id(), name)),
            _ => None,
        };

        if let Some(path) = &path {
            match cache::load(path, &labels, &hash, provider.model_id(), settings.precision) {
                Ok(cached) => {
                    tracing::info!(
                        "Loaded {} cached labels for {:?} from {:?}",
                        cached.labels.len(),
                        name.unwrap_or_default(),
                        path
                    );
                    return Ok(Self {
                        labels: cached.labels,
                        matrix: cached.matrix,
                        dim: cached.dim,
                        chunk_size,
                    });
                }
                Err(crate::error::CacheError::Missing) => {
                    tracing::debug!("No label cache at {:?}", path);
                }
                Err(e) => {
                    tracing::warn!("Ignoring label cache {:?}: {e}", path);
                }
            }
        }

        if name.is_some() {
            tracing::info!(
                "Embedding {} labels for {:?} (this may take a while on first run)...",
                labels.len(),
                name.unwrap_or_default()
            );
        }

        let mut matrix: Vec<f32> = Vec::new();
        let mut dim = 0;
        for (batch_idx, chunk) in labels.chunks(chunk_size).enumerate() {
            let vectors = embed_prepared(provider, chunk, chunk_size, settings.precision)?;
            for v in vectors {
                if dim == 0 {
                    dim = v.len();
                    matrix.reserve(labels.len() * dim);
                } else if v.len() != dim {
                    return Err(PrismError::DimensionMismatch {
                        expected: dim,
                        found: v.len(),
                    });
                }
                matrix.extend_from_slice(&v);
            }

            let encoded = ((batch_idx + 1) * chunk_size).min(labels.len());
            if name.is_some() && (encoded % 10_000 < chunk_size || encoded == labels.len()) {
                tracing::info!("  Embedded {}/{} labels", encoded, labels.len());
            }
        }

        if let (Some(path), Some(name)) = (&path, name) {
            if let Err(e) = cache::save(
                path,
                provider.model_id(),
                &hash,
                settings.precision,
                &labels,
                &matrix,
                dim,
            ) {
                tracing::error!("Failed to save label cache for {name:?}: {e}");
            }
        }

        Ok(Self {
            labels,
            matrix,
            dim,
            chunk_size,
        })
    }

    /// Concatenate tables into one unnamed table without re-embedding.
    ///
    /// Labels keep their source order and are not deduplicated. Empty tables
    /// are skipped; the result ranks with the first non-empty table's chunk size.
    pub fn merge(tables: &[&LabelTable]) -> Result<Self> {
        let chunk_size = tables
            .iter()
            .find(|t| !t.is_empty())
            .map(|t| t.chunk_size)
            .unwrap_or_else(|| TableSettings::default().chunk_size);

        let mut labels = Vec::with_capacity(tables.iter().map(|t| t.len()).sum());
        let mut matrix = Vec::with_capacity(tables.iter().map(|t| t.matrix.len()).sum());
        let mut dim = 0;

        for table in tables.iter().filter(|t| !t.is_empty()) {
            if dim == 0 {
                dim = table.dim;
            } else if table.dim != dim {
                return Err(PrismError::DimensionMismatch {
                    expected: dim,
                    found: table.dim,
                });
            }
            labels.extend_from_slice(&table.labels);
            matrix.extend_from_slice(&table.matrix);
        }

        Ok(Self {
            labels,
            matrix,
            dim,
            chunk_size,
        })
    }

    /// The `top_count` best labels for `image_embedding`, best first.
    pub fn rank(&self, image_embedding: &[f32], top_count: usize) -> Result<Vec<&str>> {
        Ok(self
            .rank_scored(image_embedding, top_count)?
            .into_iter()
            .map(|r| r.label)
            .collect())
    }

    /// Like [`rank`](Self::rank), with each label's similarity.
    ///
    /// Tables larger than one chunk use the two-stage chunked reduction, which
    /// may return fewer than `top_count` labels and is not an exact global top-k.
    /// A query whose length differs from the table's dimension is an error.
    pub fn rank_scored(
        &self,
        image_embedding: &[f32],
        top_count: usize,
    ) -> Result<Vec<RankedLabel<'_>>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if image_embedding.len() != self.dim {
            return Err(PrismError::DimensionMismatch {
                expected: self.dim,
                found: image_embedding.len(),
            });
        }

        let ranked = hierarchical_top_k(
            image_embedding,
            &self.matrix,
            self.dim,
            self.labels.len(),
            self.chunk_size,
            top_count,
        )
        .into_iter()
        .map(|(row, score)| RankedLabel {
            label: &self.labels[row],
            score,
        })
        .collect();
        Ok(ranked)
    }

    /// All labels in table order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Embedding of the label at `index`.
    pub fn embedding(&self, index: usize) -> Option<&[f32]> {
        if index >= self.labels.len() {
            return None;
        }
        Some(&self.matrix[index * self.dim..(index + 1) * self.dim])
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the table has no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Embedding dimension (0 for an empty table).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Ranking chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Build a table from a pre-computed matrix (for testing).
    #[cfg(test)]
    pub(crate) fn from_raw(labels: Vec<String>, matrix: Vec<f32>, dim: usize, chunk_size: usize) -> Self {
        assert_eq!(
            matrix.len(),
            labels.len() * dim,
            "Matrix size ({}) does not match {} labels × {} dim",
            matrix.len(),
            labels.len(),
            dim,
        );
        Self {
            labels,
            matrix,
            dim,
            chunk_size,
        }
    }
}
