//! Schema inference: one model call per attempt.

use scout_client::llm::{self, Prompt};
use scout_client::{LanguageModel, LlmError};
use scout_core::{SelectorSet, ValidationFeedback};

use crate::prompts;

/// Ask the model for a selector proposal for `markup`.
///
/// With `feedback`, the retry prompt carries the previous proposal and the
/// validation findings so the model moves away from what failed. Selectors
/// are returned unchecked; validation finds out whether they work.
pub async fn infer_schema(
    model: &dyn LanguageModel, url: &str, markup: &str, feedback: Option<&ValidationFeedback>,
) -> Result<SelectorSet, LlmError> {
    let user = match feedback {
        Some(feedback) => {
            tracing::info!(url, attempt = feedback.attempt_number, issues = feedback.issues.len(), "re-inferring schema with feedback");
            prompts::inference_retry(url, markup, feedback)
        }
        None => prompts::inference_first(url, markup),
    };

    let prompt = Prompt::structured::<SelectorSet>(user).with_system(prompts::inference_system());
    let raw = model.generate(prompt).await?;
    let selectors: SelectorSet = llm::decode_json(&raw)?;

    tracing::debug!(
        url,
        container = %selectors.job_container_selector,
        title = %selectors.title_selector,
        link = %selectors.url_selector,
        dynamic = selectors.has_dynamic_loading,
        "schema proposed"
    );
    Ok(selectors)
}
