//! Similarity ranking primitives.
//!
//! Scores are dot products against a flat row-major embedding matrix. Ties
//! always resolve to the candidate seen first, so every ranking here is
//! deterministic.

use std::cmp::Ordering;

use crate::embedding::{EmbeddingProvider, Precision};
use crate::error::{ProviderError, ProviderResult};
use crate::math::dot;

/// Top `k` rows among `candidates`, best first, as `(row, score)` pairs.
///
/// Equal scores keep the order of `candidates`.
pub(crate) fn top_k(
    query: &[f32],
    matrix: &[f32],
    dim: usize,
    candidates: &[usize],
    k: usize,
) -> Vec<(usize, f32)> {
    let k = k.min(candidates.len());
    if k == 0 {
        return Vec::new();
    }

    // (position in candidates, row, score)
    let mut scored: Vec<(usize, usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(pos, &row)| (pos, row, dot(query, &matrix[row * dim..(row + 1) * dim])))
        .collect();

    let order = |a: &(usize, usize, f32), b: &(usize, usize, f32)| -> Ordering {
        b.2.total_cmp(&a.2).then(a.0.cmp(&b.0))
    };
    if k < scored.len() {
        scored.select_nth_unstable_by(k - 1, order);
        scored.truncate(k);
    }
    scored.sort_by(order);

    scored.into_iter().map(|(_, row, score)| (row, score)).collect()
}

/// Two-stage top-k over `count` rows partitioned into `chunk_size` blocks.
///
/// Tables no larger than one chunk are ranked directly. Larger tables keep
/// `chunk_size / num_chunks` (at least one) best rows from every chunk, then
/// rank those survivors again. A chunk holding more of the global winners
/// than it may keep loses the excess; callers rely on this exact reduction.
pub(crate) fn hierarchical_top_k(
    query: &[f32],
    matrix: &[f32],
    dim: usize,
    count: usize,
    chunk_size: usize,
    k: usize,
) -> Vec<(usize, f32)> {
    if k == 0 || count == 0 {
        return Vec::new();
    }
    if count <= chunk_size {
        let rows: Vec<usize> = (0..count).collect();
        return top_k(query, matrix, dim, &rows, k);
    }

    let num_chunks = count.div_ceil(chunk_size);
    let keep_per_chunk = (chunk_size / num_chunks).max(1);

    let mut survivors = Vec::with_capacity(num_chunks * keep_per_chunk);
    for chunk_idx in 0..num_chunks {
        let start = chunk_idx * chunk_size;
        let stop = (start + chunk_size).min(count);
        let rows: Vec<usize> = (start..stop).collect();
        survivors.extend(
            top_k(query, matrix, dim, &rows, keep_per_chunk)
                .into_iter()
                .map(|(row, _)| row),
        );
    }

    tracing::trace!(
        "Hierarchical rank: {} rows, {} chunks, {} survivors",
        count,
        num_chunks,
        survivors.len()
    );

    top_k(query, matrix, dim, &survivors, k)
}

/// Embed `texts` in batches of at most `batch_size`, preparing each vector.
///
/// Fails if the provider returns a different number of vectors than inputs,
/// or vectors of inconsistent length.
pub(crate) fn embed_prepared(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
    precision: Precision,
) -> ProviderResult<Vec<Vec<f32>>> {
    let mut out: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size.max(1)) {
        let vectors = provider.embed_text(chunk)?;
        if vectors.len() != chunk.len() {
            return Err(ProviderError::Inference {
                message: format!(
                    "embedding provider returned {} vectors for {} texts",
                    vectors.len(),
                    chunk.len()
                ),
            });
        }
        for mut v in vectors {
            if let Some(first) = out.first() {
                if first.len() != v.len() {
                    return Err(ProviderError::Inference {
                        message: format!(
                            "embedding provider returned {}-dim vector after {}-dim ones",
                            v.len(),
                            first.len()
                        ),
                    });
                }
            }
            precision.prepare(&mut v);
            out.push(v);
        }
    }
    Ok(out)
}

/// Cosine similarity between an image embedding and one string.
pub fn similarity(
    provider: &dyn EmbeddingProvider,
    image_embedding: &[f32],
    text: &str,
) -> ProviderResult<f32> {
    let scores = similarities(provider, image_embedding, &[text.to_string()], 1)?;
    scores
        .first()
        .copied()
        .ok_or_else(|| ProviderError::Inference {
            message: "embedding provider returned nothing for a single text".to_string(),
        })
}

/// Similarity of each string to an image embedding, in input order.
///
/// Strings are embedded in batches of `batch_size` and never cached. Text
/// vectors must have the image embedding's dimension.
pub fn similarities(
    provider: &dyn EmbeddingProvider,
    image_embedding: &[f32],
    texts: &[String],
    batch_size: usize,
) -> ProviderResult<Vec<f32>> {
    let vectors = embed_prepared(provider, texts, batch_size, Precision::Full)?;
    vectors
        .iter()
        .map(|v| {
            if v.len() != image_embedding.len() {
                return Err(ProviderError::Inference {
                    message: format!(
                        "text embedding has {} dims, image embedding has {}",
                        v.len(),
                        image_embedding.len()
                    ),
                });
            }
            Ok(dot(image_embedding, v))
        })
        .collect()
}

/// Best-matching string among throwaway candidates, as `(index, score)`.
///
/// The first candidate wins ties. Returns `None` for an empty candidate list.
pub fn rank_strings(
    provider: &dyn EmbeddingProvider,
    image_embedding: &[f32],
    candidates: &[String],
    batch_size: usize,
) -> ProviderResult<Option<(usize, f32)>> {
    let scores = similarities(provider, image_embedding, candidates, batch_size)?;
    let mut best: Option<(usize, f32)> = None;
    for (i, score) in scores.into_iter().enumerate() {
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((i, score)),
        }
    }
    Ok(best)
}
