//! Search interaction handler.
//!
//! Some boards only show a search form or category filters until the visitor
//! interacts. The model classifies the page, the handler replays the proposed
//! interaction, and a second yes/no question confirms listings appeared.
//! Every failure degrades to "no search performed".

use std::sync::Arc;

use scout_client::llm::{self, Prompt};
use scout_client::markup::PageSnapshot;
use scout_client::{BrowserError, LanguageModel};
use scout_core::SearchInteraction;
use serde::Deserialize;

use crate::prompts;
use crate::session::SessionPage;

/// Classification answer for the search-need question.
#[derive(Debug, Clone, Default, Deserialize)]
struct SearchNeed {
    #[serde(default)]
    needs_search: bool,
    #[serde(default)]
    search_query: String,
    #[serde(default)]
    search_input_selector: String,
    #[serde(default)]
    search_submit_selector: String,
    #[serde(default)]
    reasoning: String,
}

/// A verified interaction plus the page state it produced.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub interaction: SearchInteraction,
    /// Snapshot after the interaction; the URL may be unchanged when the site updated in place.
    pub snapshot: Arc<PageSnapshot>,
}

/// Replay `interaction` on the live page. Does not settle.
///
/// Button mode clicks through a script so overlays cannot intercept it. Query
/// mode fills the input, then clicks the submit control or presses Enter.
/// Cached snapshots are dropped afterwards, even when the interaction failed
/// part way.
pub async fn perform_interaction(page: &SessionPage, interaction: &SearchInteraction) -> Result<(), BrowserError> {
    let result = interact(page, interaction).await;
    page.invalidate().await;
    result
}

async fn interact(page: &SessionPage, interaction: &SearchInteraction) -> Result<(), BrowserError> {
    match interaction {
        SearchInteraction::Button { submit_selector } => {
            tracing::info!(selector = %submit_selector, "clicking filter control");
            page.page().click(submit_selector).await
        }
        SearchInteraction::Query { input_selector, query, submit_selector } => {
            tracing::info!(input = %input_selector, query = %query, "filling search input");
            page.page().fill(input_selector, query).await?;
            match submit_selector {
                Some(submit) => page.page().click(submit).await,
                None => page.page().press_enter(input_selector).await,
            }
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    answer
        .trim()
        .trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_ascii_uppercase()
        .starts_with("YES")
}

/// Decide whether `snapshot` needs a search interaction and, if so, perform
/// and verify it. Returns `None` whenever no verified search happened.
pub async fn maybe_search(
    page: &SessionPage, snapshot: &PageSnapshot, model: &dyn LanguageModel,
) -> Option<SearchOutcome> {
    let url = snapshot.url.as_str();
    let prompt = prompts::search_need(url, &snapshot.visible_text, &snapshot.reduced_markup);

    let need: SearchNeed = match llm::ask_json(model, prompt).await {
        Ok(need) => need,
        Err(e) => {
            tracing::warn!(url, error = %e, "search classification failed, treating page as listing view");
            return None;
        }
    };

    if !need.needs_search {
        tracing::debug!(url, reasoning = %need.reasoning, "no search interaction needed");
        return None;
    }

    let Some(interaction) =
        SearchInteraction::from_parts(&need.search_input_selector, &need.search_query, &need.search_submit_selector)
    else {
        tracing::warn!(url, "search needed but no usable selectors were proposed");
        return None;
    };

    tracing::info!(url, ?interaction, reasoning = %need.reasoning, "performing search interaction");
    if let Err(e) = perform_interaction(page, &interaction).await {
        tracing::warn!(url, error = %e, "search interaction failed");
        return None;
    }
    page.settle().await;

    let after = match page.snapshot().await {
        Ok(after) => after,
        Err(e) => {
            tracing::warn!(url, error = %e, "could not read page after search");
            return None;
        }
    };

    let verification = prompts::search_verification(after.url.as_str(), &after.visible_text);
    match llm::ask_text(model, Prompt::text(verification)).await {
        Ok(answer) if is_affirmative(&answer) => {
            tracing::info!(url = %after.url, "search verified, listings visible");
            Some(SearchOutcome { interaction, snapshot: after })
        }
        Ok(answer) => {
            tracing::info!(url = %after.url, answer = %answer, "search did not surface listings");
            None
        }
        Err(e) => {
            tracing::warn!(url = %after.url, error = %e, "search verification failed");
            None
        }
    }
}
