//! Application configuration with layered loading.
//!
//! Sources, highest precedence first:
//!
//! 1. Environment variables (SCOUT_*)
//! 2. TOML config file (if SCOUT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

mod validation;

pub use validation::ConfigError;

/// Runtime configuration for analysis and scraping runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutConfig {
    /// Bearer token for the OpenAI-compatible model endpoint.
    ///
    /// Set via SCOUT_MODEL_API_KEY. Required only when a model is called.
    #[serde(default)]
    pub model_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API (without `/chat/completions`).
    #[serde(default = "default_model_base_url")]
    pub model_base_url: String,

    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Per-call model timeout in milliseconds.
    #[serde(default = "default_model_timeout_ms")]
    pub model_timeout_ms: u64,

    /// Brave API subscription token, used for discovery and re-search.
    ///
    /// Set via SCOUT_BRAVE_API_KEY.
    #[serde(default)]
    pub brave_api_key: Option<String>,

    /// Path to the SQLite job store.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent presented by the controlled browser.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Schema inference/validation attempt budget.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// Upper bound on navigation controller steps per run.
    #[serde(default = "default_max_navigation_steps")]
    pub max_navigation_steps: u32,

    /// Upper bound on external re-search restarts per run.
    #[serde(default = "default_max_researches")]
    pub max_researches: u32,

    /// Re-asks allowed when a navigation decision does not parse.
    #[serde(default = "default_decision_retries")]
    pub decision_retries: u32,

    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Delay after load or interaction for client-side rendering to finish.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Bound on the validation extraction sub-step.
    #[serde(default = "default_validation_timeout_ms")]
    pub validation_timeout_ms: u64,

    /// Page budget for production scraping.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Duplicate fraction at or above which pagination stops.
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,

    /// Optional case-insensitive keyword filter applied to container text.
    #[serde(default)]
    pub text_filter_keywords: Vec<String>,

    /// Query suffixes used when discovering a company's job board.
    #[serde(default = "default_search_terms")]
    pub search_terms: Vec<String>,
}

fn default_model_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".into()
}

fn default_model_name() -> String {
    "gemini-2.5-flash".into()
}

fn default_model_timeout_ms() -> u64 {
    120_000
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./intern-scout.sqlite")
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .into()
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_cap_ms() -> u64 {
    30_000
}

fn default_max_navigation_steps() -> u32 {
    12
}

fn default_max_researches() -> u32 {
    2
}

fn default_decision_retries() -> u32 {
    3
}

fn default_navigation_timeout_ms() -> u64 {
    60_000
}

fn default_settle_ms() -> u64 {
    5_000
}

fn default_validation_timeout_ms() -> u64 {
    120_000
}

fn default_max_pages() -> u32 {
    999
}

fn default_duplicate_threshold() -> f64 {
    0.5
}

fn default_search_terms() -> Vec<String> {
    vec!["student summer internship".into(), "careers".into(), "jobs".into()]
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            model_api_key: None,
            model_base_url: default_model_base_url(),
            model_name: default_model_name(),
            model_timeout_ms: default_model_timeout_ms(),
            brave_api_key: None,
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            headless: true,
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            max_navigation_steps: default_max_navigation_steps(),
            max_researches: default_max_researches(),
            decision_retries: default_decision_retries(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            settle_ms: default_settle_ms(),
            validation_timeout_ms: default_validation_timeout_ms(),
            max_pages: default_max_pages(),
            duplicate_threshold: default_duplicate_threshold(),
            text_filter_keywords: Vec::new(),
            search_terms: default_search_terms(),
        }
    }
}

impl ScoutConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SCOUT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SCOUT_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }

    /// Retry policy for the inference/validation loop.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_cap_ms),
        )
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the model API key is not set.
    pub fn require_model_api_key(&self) -> Result<&str, ConfigError> {
        self.model_api_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "model_api_key".into(),
            hint: "Set SCOUT_MODEL_API_KEY environment variable".into(),
        })
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the Brave API key is not set.
    pub fn require_brave_api_key(&self) -> Result<&str, ConfigError> {
        self.brave_api_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "brave_api_key".into(),
            hint: "Set SCOUT_BRAVE_API_KEY environment variable".into(),
        })
    }
}
