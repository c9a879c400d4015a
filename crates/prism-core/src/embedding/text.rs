//! CLIP text encoder and token budget check.
//!
//! Loads the CLIP text ONNX model and its tokenizer, encodes strings to
//! vectors aligned with the vision encoder's space, and answers whether a
//! string still fits in the model's context window.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use crate::error::{ProviderError, ProviderResult};

/// Output names that carry the projected (cross-modal) embedding, in preference order.
const EMBEDDING_OUTPUTS: [&str; 2] = ["text_embeds", "pooler_output"];

/// CLIP text encoder wrapper.
///
/// Uses the same `Mutex<Session>` pattern as the vision encoder.
pub struct ClipTextEncoder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    context_length: usize,
    /// Whether the exported graph declares an `attention_mask` input.
    wants_attention_mask: bool,
}

impl ClipTextEncoder {
    /// Load the text encoder from `text_model_path` and `tokenizer_path`.
    pub fn new(
        text_model_path: &Path,
        tokenizer_path: &Path,
        context_length: usize,
    ) -> ProviderResult<Self> {
        let session = Session::builder()
            .map_err(|e| ProviderError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(text_model_path)
            .map_err(|e| ProviderError::Model {
                message: format!("Failed to load text model {:?}: {e}", text_model_path),
            })?;

        let mut tokenizer =
            tokenizers::Tokenizer::from_file(tokenizer_path).map_err(|e| {
                ProviderError::Tokenizer {
                    message: format!("Failed to load tokenizer {:?}: {e}", tokenizer_path),
                }
            })?;
        // Padding and truncation are done here so token counts stay honest.
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| ProviderError::Tokenizer {
                message: format!("Failed to disable tokenizer truncation: {e}"),
            })?;

        let wants_attention_mask = session
            .inputs()
            .iter()
            .any(|i| i.name() == "attention_mask");

        tracing::debug!(
            "Loaded CLIP text encoder (inputs: {:?}, outputs: {:?}, context: {})",
            session
                .inputs()
                .iter()
                .map(|i| i.name())
                .collect::<Vec<_>>(),
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>(),
            context_length,
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            context_length,
            wants_attention_mask,
        })
    }

    /// Token ids for `text`, including start/end markers, never truncated.
    fn token_ids(&self, text: &str) -> ProviderResult<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ProviderError::Tokenizer {
                message: format!("Tokenization failed: {e}"),
            })?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Whether `text` tokenizes strictly inside the context window.
    ///
    /// A sequence that fills every slot is treated as truncated.
    pub fn fits(&self, text: &str) -> bool {
        match self.token_ids(text) {
            Ok(ids) => ids.len() < self.context_length,
            Err(e) => {
                tracing::warn!("Treating untokenizable text as over budget: {e}");
                false
            }
        }
    }

    /// Encode a batch of strings to normalized embeddings, one per input.
    pub fn encode_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        let batch_size = texts.len();
        if batch_size == 0 {
            return Ok(vec![]);
        }
        let max_length = self.context_length;

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| ProviderError::Tokenizer {
                message: format!("Tokenization failed: {e}"),
            })?;

        // Zero-padded ids; over-long sequences keep their end-of-text marker in the last slot.
        let mut input_ids = vec![0i64; batch_size * max_length];
        let mut attention_mask = vec![0i64; batch_size * max_length];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let kept = ids.len().min(max_length);
            for (j, &id) in ids.iter().take(kept).enumerate() {
                input_ids[i * max_length + j] = id as i64;
                attention_mask[i * max_length + j] = 1;
            }
            if ids.len() > max_length {
                if let Some(&eot) = ids.last() {
                    input_ids[i * max_length + max_length - 1] = eot as i64;
                }
            }
        }

        let shape = vec![batch_size as i64, max_length as i64];
        let input_ids_value =
            Value::from_array((shape.clone(), input_ids)).map_err(|e| {
                ProviderError::Inference {
                    message: format!("Failed to create input_ids tensor: {e}"),
                }
            })?;

        let mut session = self.session.lock().map_err(|e| ProviderError::Inference {
            message: format!("Text session lock poisoned: {e}"),
        })?;

        let outputs = if self.wants_attention_mask {
            let mask_value = Value::from_array((shape, attention_mask)).map_err(|e| {
                ProviderError::Inference {
                    message: format!("Failed to create attention_mask tensor: {e}"),
                }
            })?;
            session.run(ort::inputs![
                "input_ids" => input_ids_value,
                "attention_mask" => mask_value
            ])
        } else {
            session.run(ort::inputs!["input_ids" => input_ids_value])
        }
        .map_err(|e| ProviderError::Inference {
            message: format!("Text encoder inference failed: {e}"),
        })?;

        let embedding_output = EMBEDDING_OUTPUTS
            .iter()
            .find_map(|wanted| outputs.iter().find(|(name, _)| *name == *wanted))
            .ok_or_else(|| ProviderError::Inference {
                message: format!("Text encoder produced none of {:?}", EMBEDDING_OUTPUTS),
            })?;

        let (out_shape, data) =
            embedding_output
                .1
                .try_extract_tensor::<f32>()
                .map_err(|e| ProviderError::Inference {
                    message: format!("Failed to extract text embeddings: {e}"),
                })?;

        let embedding_dim = match out_shape.len() {
            2 => out_shape[1] as usize,
            _ => {
                return Err(ProviderError::Inference {
                    message: format!("Unexpected text embedding shape: {:?}", out_shape),
                });
            }
        };

        let embeddings: Vec<Vec<f32>> = data
            .chunks(embedding_dim)
            .take(batch_size)
            .map(crate::math::l2_normalize)
            .collect();

        Ok(embeddings)
    }
}
