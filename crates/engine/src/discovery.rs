//! Job board URL discovery over web search.
//!
//! Search results are ranked by the model, which answers with a 1-based
//! index. `0` means "none of these"; anything unparseable falls back to the
//! top result for [`Discovery::discover`].

use std::sync::{Arc, LazyLock};

use regex::Regex;
use scout_client::llm::{self, Prompt};
use scout_client::{LanguageModel, SearchRequest, SearchResult, WebSearch, canonicalize};
use scout_core::ScoutConfig;
use url::Url;

use crate::error::DiscoveryError;
use crate::navigate::Rejection;
use crate::prompts;

static INDEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\b").expect("index pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pick {
    Index(usize),
    NoneSuitable,
    Unusable,
}

/// Parse a 1-based selection answer against `count` results.
fn parse_pick(answer: &str, count: usize) -> Pick {
    let Some(n) = INDEX.captures(answer).and_then(|c| c[1].parse::<usize>().ok()) else {
        return Pick::Unusable;
    };
    match n {
        0 => Pick::NoneSuitable,
        n if n <= count => Pick::Index(n - 1),
        _ => Pick::Unusable,
    }
}

fn same_page(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// Finds seed and replacement URLs via web search plus a model pick.
pub struct Discovery {
    search: Arc<dyn WebSearch>,
    model: Arc<dyn LanguageModel>,
    search_terms: Vec<String>,
}

impl Discovery {
    pub fn new(search: Arc<dyn WebSearch>, model: Arc<dyn LanguageModel>) -> Self {
        Self { search, model, search_terms: ScoutConfig::default().search_terms }
    }

    pub fn with_search_terms(mut self, terms: Vec<String>) -> Self {
        if !terms.is_empty() {
            self.search_terms = terms;
        }
        self
    }

    async fn pick(&self, subject: &str, results: &[SearchResult], rejected: &[Rejection]) -> Pick {
        let prompt =
            Prompt::text(prompts::discovery(subject, results, rejected)).with_system(prompts::discovery_system(subject));
        match llm::ask_text(self.model.as_ref(), prompt).await {
            Ok(answer) => {
                let pick = parse_pick(&answer, results.len());
                tracing::debug!(answer = %answer, ?pick, "model picked search result");
                pick
            }
            Err(e) => {
                tracing::warn!(error = %e, "result selection failed");
                Pick::Unusable
            }
        }
    }

    /// Find the job board of `company`, trying each search term in order.
    ///
    /// # Errors
    ///
    /// `EmptyCompany` for a blank name, or the last search error when every
    /// search failed.
    pub async fn discover(&self, company: &str) -> Result<Option<Url>, DiscoveryError> {
        let company = company.trim();
        if company.is_empty() {
            return Err(DiscoveryError::EmptyCompany);
        }

        let mut last_error = None;
        let mut searched = false;

        for term in &self.search_terms {
            let query = format!("{company} {}", term.trim());
            tracing::info!(query = %query, "searching for job board");

            let results = match self.search.search(SearchRequest::new(&query)).await {
                Ok(results) => {
                    searched = true;
                    results
                }
                Err(e) => {
                    tracing::warn!(query = %query, error = %e, "search failed, trying next term");
                    last_error = Some(e);
                    continue;
                }
            };
            if results.is_empty() {
                continue;
            }

            let chosen = match self.pick(company, &results, &[]).await {
                Pick::Index(idx) => &results[idx],
                Pick::NoneSuitable | Pick::Unusable => &results[0],
            };
            match canonicalize(&chosen.url) {
                Ok(url) => {
                    tracing::info!(company, url = %url, "job board discovered");
                    return Ok(Some(url));
                }
                Err(e) => tracing::warn!(url = %chosen.url, error = %e, "search result url unusable"),
            }
        }

        match last_error {
            Some(e) if !searched => Err(e.into()),
            _ => Ok(None),
        }
    }

    /// Search `query` for a page not yet rejected.
    ///
    /// Rejected URLs are excluded before the model sees the results; `0` from
    /// the model means no replacement.
    pub async fn find_replacement(&self, query: &str, rejected: &[Rejection]) -> Result<Option<Url>, DiscoveryError> {
        let results: Vec<SearchResult> = self
            .search
            .search(SearchRequest::new(query))
            .await?
            .into_iter()
            .filter(|r| !rejected.iter().any(|rej| same_page(&rej.url, &r.url)))
            .collect();

        if results.is_empty() {
            tracing::info!(query, "re-search found no unvisited candidates");
            return Ok(None);
        }

        let chosen = match self.pick(query, &results, rejected).await {
            Pick::Index(idx) => &results[idx],
            Pick::Unusable => &results[0],
            Pick::NoneSuitable => return Ok(None),
        };

        match canonicalize(&chosen.url) {
            Ok(url) => Ok(Some(url)),
            Err(e) => {
                tracing::warn!(url = %chosen.url, error = %e, "replacement url unusable");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSearch, ScriptedModel};

    const PICK: &str = "Select the best URL for finding";

    fn discovery(search: FakeSearch, model: ScriptedModel) -> (Arc<FakeSearch>, Arc<ScriptedModel>, Discovery) {
        let search = Arc::new(search);
        let model = Arc::new(model);
        let discovery = Discovery::new(search.clone(), model.clone());
        (search, model, discovery)
    }

    #[test]
    fn test_parse_pick() {
        assert_eq!(parse_pick("2", 3), Pick::Index(1));
        assert_eq!(parse_pick("The best is 1.", 3), Pick::Index(0));
        assert_eq!(parse_pick("0", 3), Pick::NoneSuitable);
        assert_eq!(parse_pick("7", 3), Pick::Unusable);
        assert_eq!(parse_pick("none", 3), Pick::Unusable);
    }

    #[tokio::test]
    async fn test_discover_uses_model_pick() {
        let search = FakeSearch::new().results(
            "Acme student summer internship",
            &["https://www.linkedin.com/company/acme/jobs", "https://careers.acme.test/students"],
        );
        let (search, _, discovery) = discovery(search, ScriptedModel::new().reply(PICK, "2"));

        let url = discovery.discover("Acme").await.unwrap().unwrap();
        assert_eq!(url.as_str(), "https://careers.acme.test/students");
        assert_eq!(search.queries(), ["Acme student summer internship"]);
    }

    #[tokio::test]
    async fn test_discover_falls_back_to_first_result() {
        let search = FakeSearch::new().results("Acme careers", &["https://acme.test/careers", "https://acme.test/blog"]);
        let (search, _, discovery) = discovery(search, ScriptedModel::new().reply(PICK, "I cannot decide"));

        let url = discovery.discover("Acme").await.unwrap().unwrap();
        assert_eq!(url.as_str(), "https://acme.test/careers");
        assert_eq!(search.queries(), ["Acme student summer internship", "Acme careers"]);
    }

    #[tokio::test]
    async fn test_discover_nothing_found() {
        let (search, model, discovery) = discovery(FakeSearch::new(), ScriptedModel::new());
        assert!(discovery.discover("Acme").await.unwrap().is_none());
        assert_eq!(search.queries().len(), 3);
        assert_eq!(model.calls(PICK), 0);

        assert!(matches!(discovery.discover("  ").await, Err(DiscoveryError::EmptyCompany)));
    }

    #[tokio::test]
    async fn test_replacement_skips_rejected_pages() {
        let search = FakeSearch::new().results(
            "acme internships",
            &["https://acme.test/blog/", "https://acme.test/students/openings"],
        );
        let (_, model, discovery) = discovery(search, ScriptedModel::new().reply(PICK, "1"));
        let rejected = vec![Rejection { url: "https://acme.test/blog".into(), reason: "a blog".into() }];

        let url = discovery.find_replacement("acme internships", &rejected).await.unwrap().unwrap();
        assert_eq!(url.as_str(), "https://acme.test/students/openings");
        let prompt = model.prompts().pop().unwrap();
        assert!(prompt.user.contains("a blog"));
        assert!(!prompt.user.contains("1. URL: https://acme.test/blog"));
    }

    #[tokio::test]
    async fn test_replacement_zero_means_none() {
        let search = FakeSearch::new().results("acme internships", &["https://acme.test/press"]);
        let (_, _, discovery) = discovery(search, ScriptedModel::new().reply(PICK, "0"));
        assert!(discovery.find_replacement("acme internships", &[]).await.unwrap().is_none());
    }
}
