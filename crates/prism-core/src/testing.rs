//! Deterministic embedding provider for unit tests.
//!
//! Every string maps to a 2-d unit vector `[s, sqrt(1 - s^2)]` where `s` is
//! its scripted score (0.0 when unscripted). The image embedding is `[1, 0]`,
//! so the similarity of any string is exactly its scripted score.

use std::collections::HashMap;
use std::sync::Mutex;

use image::DynamicImage;

use crate::embedding::EmbeddingProvider;
use crate::error::{ProviderError, ProviderResult};

pub(crate) struct ScriptedProvider {
    model_id: String,
    scores: HashMap<String, f32>,
    max_chars: Option<usize>,
    fail: bool,
    drop_last: bool,
    batches: Mutex<Vec<usize>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            model_id: "test/model".to_string(),
            scores: HashMap::new(),
            max_chars: None,
            fail: false,
            drop_last: false,
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn score(mut self, text: &str, score: f32) -> Self {
        assert!((-1.0..=1.0).contains(&score), "score must be a cosine");
        self.scores.insert(text.to_string(), score);
        self
    }

    pub fn model(mut self, model_id: &str) -> Self {
        self.model_id = model_id.to_string();
        self
    }

    /// Strings longer than `max_chars` characters do not fit the budget.
    pub fn budget(mut self, max_chars: usize) -> Self {
        self.max_chars = Some(max_chars);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn drop_last_vector(mut self) -> Self {
        self.drop_last = true;
        self
    }

    pub fn image(&self) -> Vec<f32> {
        vec![1.0, 0.0]
    }

    /// Sizes of every `embed_text` batch seen so far.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }

    pub fn embed_calls(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let s = self.scores.get(text).copied().unwrap_or(0.0);
        vec![s, (1.0 - s * s).max(0.0).sqrt()]
    }
}

impl EmbeddingProvider for ScriptedProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed_text(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        self.batches.lock().unwrap().push(texts.len());
        if self.fail {
            return Err(ProviderError::Inference {
                message: "scripted failure".to_string(),
            });
        }
        let mut out: Vec<Vec<f32>> = texts.iter().map(|t| self.vector_for(t)).collect();
        if self.drop_last {
            out.pop();
        }
        Ok(out)
    }

    fn embed_image(&self, _image: &DynamicImage) -> ProviderResult<Vec<f32>> {
        Ok(self.image())
    }

    fn fits_budget(&self, text: &str) -> bool {
        self.max_chars
            .map_or(true, |max| text.chars().count() <= max)
    }
}
