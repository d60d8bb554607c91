//! Generative model client.
//!
//! Engine code talks to a [`LanguageModel`], never to HTTP directly. The
//! production implementation is [`ChatClient`], which speaks the
//! OpenAI-compatible `chat/completions` protocol (Gemini and DeepSeek both
//! expose one).
//!
//! ### Response modes
//! - [`ResponseFormat::Text`]: free text.
//! - [`ResponseFormat::Json`]: a JSON object, shape described in the prompt.
//! - [`ResponseFormat::Schema`]: strict JSON-schema output generated from a Rust type.

mod error;
mod schema;

pub use error::LlmError;
pub use schema::StructuredOutput;

use std::time::{Duration, Instant};

use scout_core::ScoutConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// How the model is asked to shape its answer.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    Text,
    Json,
    Schema { name: String, schema: serde_json::Value },
}

/// One model request: optional system instruction plus the user message.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
    pub format: ResponseFormat,
}

impl Prompt {
    pub fn text(user: impl Into<String>) -> Self {
        Self { system: None, user: user.into(), format: ResponseFormat::Text }
    }

    pub fn json(user: impl Into<String>) -> Self {
        Self { system: None, user: user.into(), format: ResponseFormat::Json }
    }

    /// Request output conforming to `T`'s strict schema.
    pub fn structured<T: StructuredOutput>(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
            format: ResponseFormat::Schema { name: T::output_name(), schema: T::strict_schema() },
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// A fallible text generator.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Raw answer text. Implementations must fail rather than return a blank answer.
    async fn generate(&self, prompt: Prompt) -> Result<String, LlmError>;
}

/// Ask for free text, trimmed.
pub async fn ask_text(model: &dyn LanguageModel, prompt: Prompt) -> Result<String, LlmError> {
    Ok(model.generate(prompt).await?.trim().to_string())
}

/// Ask for a JSON object and decode it into `T`.
pub async fn ask_json<T: DeserializeOwned>(model: &dyn LanguageModel, user: impl Into<String>) -> Result<T, LlmError> {
    let raw = model.generate(Prompt::json(user)).await?;
    decode_json(&raw)
}

/// Decode a JSON answer, tolerating surrounding code fences.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    serde_json::from_str(strip_code_fences(raw)).map_err(|e| LlmError::Parse(format!("{e}: {}", preview(raw))))
}

/// Strip a leading ```` ``` ```` / ```` ```json ```` fence and its closing fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn preview(raw: &str) -> String {
    raw.chars().take(200).collect()
}

/// OpenAI-compatible chat completion client.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatClient {
    /// # Errors
    ///
    /// Returns `LlmError::Config` if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".into(),
            model: model.into(),
        })
    }

    /// Build a client from the `model_*` configuration fields.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Config` if no API key is configured.
    pub fn from_config(config: &ScoutConfig) -> Result<Self, LlmError> {
        let api_key = config.require_model_api_key().map_err(|e| LlmError::Config(e.to_string()))?;
        Ok(Self::new(api_key, &config.model_name, config.model_timeout())?.with_base_url(&config.model_base_url))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body<'a>(&'a self, prompt: &'a Prompt) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &prompt.system {
            messages.push(Message { role: "system", content: system });
        }
        messages.push(Message { role: "user", content: &prompt.user });

        let response_format = match &prompt.format {
            ResponseFormat::Text => None,
            ResponseFormat::Json => Some(WireFormat::JsonObject),
            ResponseFormat::Schema { name, schema } => {
                Some(WireFormat::JsonSchema { json_schema: JsonSchemaSpec { name, strict: true, schema } })
            }
        };

        ChatRequest { model: &self.model, messages, response_format }
    }
}

#[async_trait::async_trait]
impl LanguageModel for ChatClient {
    async fn generate(&self, prompt: Prompt) -> Result<String, LlmError> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&prompt))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "model request failed");
                LlmError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, error = %message, "model API error");
            return Err(LlmError::Api { status: status.as_u16(), message });
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        tracing::debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            chars = content.len(),
            "model completion"
        );

        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireFormat<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireFormat<'a> {
    JsonObject,
    JsonSchema { json_schema: JsonSchemaSpec<'a> },
}

#[derive(Debug, Serialize)]
struct JsonSchemaSpec<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
