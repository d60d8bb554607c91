//! Configuration validation rules, applied after loading.

use crate::config::ScoutConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl ScoutConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for the first out-of-range field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(invalid("max_attempts", "must be at least 1"));
        }
        if self.max_attempts > 10 {
            return Err(invalid("max_attempts", "must not exceed 10"));
        }

        if self.backoff_base_ms > self.backoff_cap_ms {
            return Err(invalid("backoff_base_ms", "must not exceed backoff_cap_ms"));
        }

        if self.max_navigation_steps == 0 {
            return Err(invalid("max_navigation_steps", "must be at least 1"));
        }

        if self.navigation_timeout_ms < 1_000 {
            return Err(invalid("navigation_timeout_ms", "must be at least 1000ms"));
        }
        if self.model_timeout_ms < 1_000 {
            return Err(invalid("model_timeout_ms", "must be at least 1000ms"));
        }
        if self.validation_timeout_ms < 1_000 {
            return Err(invalid("validation_timeout_ms", "must be at least 1000ms"));
        }

        if self.max_pages == 0 {
            return Err(invalid("max_pages", "must be at least 1"));
        }

        if !(self.duplicate_threshold > 0.0 && self.duplicate_threshold <= 1.0) {
            return Err(invalid("duplicate_threshold", "must be in (0, 1]"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.model_name.is_empty() {
            return Err(invalid("model_name", "must not be empty"));
        }
        if !self.model_base_url.starts_with("http://") && !self.model_base_url.starts_with("https://") {
            return Err(invalid("model_base_url", "must be an http(s) URL"));
        }

        if self.search_terms.is_empty() {
            tracing::warn!("search_terms is empty; job board discovery will not run any queries");
        }

        Ok(())
    }
}
