//! Benchmarks for label ranking.
//!
//! Run with: cargo bench -p prism-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::DynamicImage;
use prism_core::prompt::truncate_to_fit;
use prism_core::{EmbeddingProvider, LabelTable, ProviderResult, TableSettings};

const DIM: usize = 768;

/// Deterministic pseudo-random vectors from a string hash.
struct HashProvider;

fn hashed_vector(text: &str) -> Vec<f32> {
    let seed = blake3::hash(text.as_bytes());
    let mut state = u64::from_le_bytes(seed.as_bytes()[..8].try_into().unwrap());
    (0..DIM)
        .map(|_| {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 40) as f32 / (1u64 << 24) as f32 - 0.5
        })
        .collect()
}

impl EmbeddingProvider for HashProvider {
    fn model_id(&self) -> &str {
        "bench/hash"
    }

    fn embed_text(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hashed_vector(t)).collect())
    }

    fn embed_image(&self, _image: &DynamicImage) -> ProviderResult<Vec<f32>> {
        Ok(hashed_vector("image"))
    }

    fn fits_budget(&self, text: &str) -> bool {
        text.len() < 300
    }
}

fn build_table(count: usize) -> LabelTable {
    let labels: Vec<String> = (0..count).map(|i| format!("flavor {i}")).collect();
    LabelTable::build(labels, None, &HashProvider, &TableSettings::default()).unwrap()
}

fn benchmark_rank_small(c: &mut Criterion) {
    let table = build_table(2_000);
    let query = prism_core::math::l2_normalize(&hashed_vector("image"));

    c.bench_function("rank_2k_top1", |b| {
        b.iter(|| table.rank(black_box(&query), 1))
    });
}

fn benchmark_rank_hierarchical(c: &mut Criterion) {
    let table = build_table(50_000);
    let query = prism_core::math::l2_normalize(&hashed_vector("image"));

    c.bench_function("rank_50k_top2048", |b| {
        b.iter(|| table.rank(black_box(&query), 2048))
    });
    c.bench_function("rank_50k_top32", |b| {
        b.iter(|| table.rank(black_box(&query), 32))
    });
}

fn benchmark_truncate(c: &mut Criterion) {
    let prompt = (0..64)
        .map(|i| format!("flavor {i}"))
        .collect::<Vec<_>>()
        .join(", ");

    c.bench_function("truncate_64_parts", |b| {
        b.iter(|| truncate_to_fit(black_box(&prompt), |s| HashProvider.fits_budget(s)))
    });
}

criterion_group!(
    benches,
    benchmark_rank_small,
    benchmark_rank_hierarchical,
    benchmark_truncate,
);
criterion_main!(benches);
