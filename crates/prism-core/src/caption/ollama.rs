//! Ollama captioner for local vision model inference.
//!
//! Talks to a local Ollama instance via its HTTP API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{Captioner, ImageInput};
use crate::config::CaptionConfig;
use crate::error::{ProviderError, ProviderResult};

/// Captioner backed by an Ollama vision model.
pub struct OllamaCaptioner {
    endpoint: String,
    model: String,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl OllamaCaptioner {
    pub fn new(config: &CaptionConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            prompt: config.prompt.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client: reqwest::Client::new(),
        }
    }

    fn request_body(&self, image: &ImageInput) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            prompt: self.prompt.clone(),
            images: vec![image.data.clone()],
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        }
    }
}

/// Ollama /api/generate request body.
#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    images: Vec<String>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama /api/generate response.
#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

/// First non-blank line of a model reply, trimmed.
fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

#[async_trait]
impl Captioner for OllamaCaptioner {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        match self.client.get(&url).timeout(Duration::from_secs(5)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn caption(&self, image: &ImageInput) -> ProviderResult<String> {
        let url = format!("{}/api/generate", self.endpoint);
        let start = Instant::now();

        let resp = self
            .client
            .post(&url)
            .json(&self.request_body(image))
            .send()
            .await
            .map_err(|e| ProviderError::Caption {
                message: format!("Ollama request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Caption {
                message: format!("Ollama HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let ollama_resp: OllamaResponse =
            resp.json().await.map_err(|e| ProviderError::Caption {
                message: format!("Failed to parse Ollama response: {e}"),
                status_code: None,
            })?;

        let caption = first_line(&ollama_resp.response)
            .ok_or_else(|| ProviderError::Caption {
                message: "Ollama returned an empty caption".to_string(),
                status_code: None,
            })?
            .to_string();

        tracing::debug!(
            "Captioned with {} in {}ms: {:?}",
            self.model,
            start.elapsed().as_millis(),
            caption
        );
        Ok(caption)
    }
}
