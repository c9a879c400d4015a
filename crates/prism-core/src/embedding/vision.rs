//! CLIP vision encoder session.
//!
//! Loads a CLIP visual tower exported to ONNX and turns a preprocessed image
//! tensor into a unit-length embedding in the shared image/text space.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use crate::error::{ProviderError, ProviderResult};

/// Output names that carry the projected (cross-modal) embedding, in preference order.
const EMBEDDING_OUTPUTS: [&str; 2] = ["image_embeds", "pooler_output"];

/// Wraps an ONNX Runtime session for CLIP image embedding.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct ClipVisionSession {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
}

impl ClipVisionSession {
    /// Load a CLIP vision encoder from an ONNX file.
    pub fn load(model_path: &Path) -> ProviderResult<Self> {
        let session = Session::builder()
            .map_err(|e| ProviderError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| ProviderError::Model {
                message: format!("Failed to load vision model {:?}: {e}", model_path),
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "pixel_values".to_string());

        tracing::debug!(
            "Loaded CLIP vision encoder from {:?} (input: {:?}, outputs: {:?})",
            model_path,
            input_name,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
        })
    }

    /// Run inference on a preprocessed image tensor and return the embedding.
    ///
    /// Input shape: \[1, 3, size, size\] (NCHW, CLIP-normalized).
    /// Output: L2-normalized embedding vector.
    pub fn embed(&self, preprocessed: &Array4<f32>) -> ProviderResult<Vec<f32>> {
        let shape: Vec<i64> = preprocessed.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = preprocessed.iter().copied().collect();

        let input_value =
            Value::from_array((shape, flat_data)).map_err(|e| ProviderError::Inference {
                message: format!("Failed to create image tensor: {e}"),
            })?;

        let mut session = self.session.lock().map_err(|e| ProviderError::Inference {
            message: format!("Vision session lock poisoned: {e}"),
        })?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .map_err(|e| ProviderError::Inference {
                message: format!("Vision encoder inference failed: {e}"),
            })?;

        let embedding_output = EMBEDDING_OUTPUTS
            .iter()
            .find_map(|wanted| outputs.iter().find(|(name, _)| *name == *wanted))
            .ok_or_else(|| ProviderError::Inference {
                message: format!("Vision encoder produced none of {:?}", EMBEDDING_OUTPUTS),
            })?;

        let (shape, data) =
            embedding_output
                .1
                .try_extract_tensor::<f32>()
                .map_err(|e| ProviderError::Inference {
                    message: format!("Failed to extract image embedding: {e}"),
                })?;

        // [1, dim] or [dim]
        let mut raw = match shape.len() {
            1 => data.to_vec(),
            2 => {
                let dim = shape[1] as usize;
                data[..dim].to_vec()
            }
            _ => {
                return Err(ProviderError::Inference {
                    message: format!("Unexpected image embedding shape: {:?}", shape),
                });
            }
        };

        crate::math::l2_normalize_in_place(&mut raw);
        Ok(raw)
    }
}
