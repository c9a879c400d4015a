//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.clip.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "clip.model must not be empty".into(),
            ));
        }
        if self.clip.context_length < 2 {
            return Err(ConfigError::ValidationError(
                "clip.context_length must be > 1".into(),
            ));
        }
        if self.clip.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "clip.image_size must be > 0".into(),
            ));
        }
        if self.interrogator.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "interrogator.chunk_size must be > 0".into(),
            ));
        }
        if self.interrogator.flavor_intermediate_count == 0 {
            return Err(ConfigError::ValidationError(
                "interrogator.flavor_intermediate_count must be > 0".into(),
            ));
        }
        if self.caption.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "caption.timeout_ms must be > 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.caption.temperature) {
            return Err(ConfigError::ValidationError(
                "caption.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        Ok(())
    }
}
