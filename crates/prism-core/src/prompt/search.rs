//! Prompt search: joint category seeding followed by greedy flavor chaining.
//!
//! Starting from the caption, the best medium, artist, trending and movement
//! labels are evaluated together in every combination, since a pair may score
//! differently than either alone. Flavors are then appended one at a time while
//! each addition strictly improves similarity to the image and the prompt stays
//! within the token budget.

use std::collections::HashSet;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::labels::{rank_strings, similarity, LabelTable};

use super::truncate::SEPARATOR;

/// The five vocabularies a search draws from.
#[derive(Debug, Clone, Copy)]
pub struct CategoryTables<'a> {
    pub medium: &'a LabelTable,
    pub artist: &'a LabelTable,
    pub trending: &'a LabelTable,
    pub movement: &'a LabelTable,
    pub flavors: &'a LabelTable,
}

/// Search limits.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Upper bound on chained flavor terms
    pub max_flavors: usize,
    /// Flavor candidates carried from the flavor table into chaining
    pub flavor_intermediate_count: usize,
    /// Candidate prompts per embedding batch
    pub batch_size: usize,
}

/// Build the best-scoring prompt for `image_embedding`, starting from `caption`.
///
/// Stopping early (no improvement, budget reached, flavors exhausted) is normal
/// termination; errors come only from the embedding provider.
pub fn search(
    provider: &dyn EmbeddingProvider,
    image_embedding: &[f32],
    caption: &str,
    tables: &CategoryTables<'_>,
    params: &SearchParams,
) -> Result<String> {
    let flavors = tables
        .flavors
        .rank(image_embedding, params.flavor_intermediate_count)?;
    let mut opts: Vec<&str> = Vec::with_capacity(4);
    for table in [tables.medium, tables.artist, tables.trending, tables.movement] {
        if let Some(best) = table.rank(image_embedding, 1)?.first() {
            opts.push(*best);
        }
    }

    let mut best_prompt = caption.to_string();
    let mut best_score = similarity(provider, image_embedding, &best_prompt)?;
    tracing::debug!("Caption score {:.4}: {:?}", best_score, best_prompt);

    // Joint seeding over every subset of the category winners.
    let seeds = subset_prompts(&best_prompt, &opts);
    if let Some((idx, score)) = rank_strings(provider, image_embedding, &seeds, params.batch_size)? {
        best_prompt = seeds[idx].clone();
        best_score = score;
    }
    tracing::debug!("Seeded prompt {:.4}: {:?}", best_score, best_prompt);

    // Rank order, first occurrence wins.
    let mut seen = HashSet::new();
    let mut remaining: Vec<&str> = flavors.into_iter().filter(|f| seen.insert(*f)).collect();

    for step in 0..params.max_flavors {
        let candidates: Vec<String> = remaining
            .iter()
            .map(|f| format!("{best_prompt}{SEPARATOR}{f}"))
            .collect();
        let Some((idx, score)) =
            rank_strings(provider, image_embedding, &candidates, params.batch_size)?
        else {
            tracing::debug!("Flavor chain exhausted after {} steps", step);
            break;
        };

        if score <= best_score {
            tracing::debug!(
                "Flavor chain converged after {} steps: {:?} scores {:.4} <= {:.4}",
                step,
                remaining[idx],
                score,
                best_score
            );
            break;
        }
        if !provider.fits_budget(&candidates[idx]) {
            tracing::debug!(
                "Flavor chain reached token budget after {} steps; {:?} not added",
                step,
                remaining[idx]
            );
            break;
        }

        best_score = score;
        best_prompt = candidates[idx].clone();
        tracing::trace!("Added flavor {:?} ({:.4})", remaining[idx], best_score);
        remaining.remove(idx);
    }

    Ok(best_prompt)
}

/// All `2^n` prompts formed by appending a subset of `opts` to `base`.
///
/// Bit `b` of the subset index selects `opts[b]`; selected options keep the
/// order of `opts`. Index 0 is `base` itself.
fn subset_prompts(base: &str, opts: &[&str]) -> Vec<String> {
    (0..1usize << opts.len())
        .map(|mask| {
            let mut prompt = base.to_string();
            for (bit, opt) in opts.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    prompt.push_str(SEPARATOR);
                    prompt.push_str(opt);
                }
            }
            prompt
        })
        .collect()
}
