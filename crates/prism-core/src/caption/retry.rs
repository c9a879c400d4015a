//! Retry utilities for transient captioning failures.
//!
//! Provides classification of retryable errors and exponential backoff.

use std::time::Duration;

use super::{Captioner, ImageInput};
use crate::config::CaptionConfig;
use crate::error::{ProviderError, ProviderResult};

/// Timeout and retry limits for one caption request.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries after the first attempt
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
}

impl From<&CaptionConfig> for RetryPolicy {
    fn from(config: &CaptionConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            retry_attempts: config.retry_attempts,
            retry_delay_ms: config.retry_delay_ms,
        }
    }
}

/// Determine whether a provider error is worth retrying.
///
/// Retryable errors: timeouts, rate limits (429), server errors (5xx).
/// Non-retryable: bad requests, missing models, empty captions.
pub fn is_retryable(error: &ProviderError) -> bool {
    match error {
        ProviderError::Timeout { .. } => true,
        ProviderError::Caption {
            status_code,
            message,
        } => {
            if let Some(code) = status_code {
                return *code == 429 || (500..=599).contains(code);
            }
            // Connection refused, DNS failure
            message.contains("timed out") || message.contains("connect")
        }
        _ => false,
    }
}

/// Calculate exponential backoff duration for a given attempt.
///
/// Uses `base_delay * 2^attempt` with a cap at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(30_000))
}

/// Caption `image`, retrying transient failures with exponential backoff.
///
/// Returns the last error once attempts are exhausted or a non-retryable
/// error occurs.
pub async fn caption_with_retry(
    captioner: &dyn Captioner,
    image: &ImageInput,
    policy: RetryPolicy,
) -> ProviderResult<String> {
    let mut last_error = None;
    for attempt in 0..=policy.retry_attempts {
        if attempt > 0 {
            let delay = backoff_duration(attempt - 1, policy.retry_delay_ms);
            tracing::debug!(
                "Caption retry {attempt}/{} with {} after {delay:?}",
                policy.retry_attempts,
                captioner.name()
            );
            tokio::time::sleep(delay).await;
        }

        match tokio::time::timeout(
            Duration::from_millis(policy.timeout_ms),
            captioner.caption(image),
        )
        .await
        {
            Ok(Ok(caption)) => return Ok(caption),
            Ok(Err(e)) => {
                let retryable = is_retryable(&e);
                tracing::warn!("Caption attempt {} failed: {e}", attempt + 1);
                last_error = Some(e);
                if !retryable {
                    break;
                }
            }
            Err(_) => {
                tracing::warn!(
                    "Caption attempt {} timed out after {}ms",
                    attempt + 1,
                    policy.timeout_ms
                );
                last_error = Some(ProviderError::Timeout {
                    stage: "caption".to_string(),
                    timeout_ms: policy.timeout_ms,
                });
            }
        }
    }

    Err(last_error.unwrap_or_else(|| ProviderError::Caption {
        message: "no caption attempts were made".to_string(),
        status_code: None,
    }))
}
