//! Shared data model.
//!
//! The [`ExtractionSchema`] is the durable artifact of an analysis run: the
//! selectors a model proposed plus the interaction metadata needed to reach the
//! listing view again. Selector strings are opaque here; only the extraction
//! engine interprets them.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Selector proposal in the fixed shape the model is asked to return.
///
/// Empty strings mean "not available on this page"; only the container, title
/// and url selectors are critical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectorSet {
    /// Selector matching each repeating job listing element.
    pub job_container_selector: String,
    /// Title selector, relative to the container.
    pub title_selector: String,
    /// Link selector, relative to the container. Empty when the container itself carries the href.
    pub url_selector: String,
    /// Description selector, relative to the container.
    pub description_selector: String,
    /// Location selector, relative to the container.
    pub location_selector: String,
    /// Page-level selector for the next-page control.
    pub pagination_selector: String,
    /// Whether listings are rendered client-side after load.
    pub has_dynamic_loading: bool,
}

impl SelectorSet {
    /// All selector fields with their canonical names, in a stable order.
    pub fn labelled(&self) -> [(&'static str, &str); 6] {
        [
            ("job_container_selector", self.job_container_selector.as_str()),
            ("title_selector", self.title_selector.as_str()),
            ("url_selector", self.url_selector.as_str()),
            ("description_selector", self.description_selector.as_str()),
            ("location_selector", self.location_selector.as_str()),
            ("pagination_selector", self.pagination_selector.as_str()),
        ]
    }

    /// Selector fields that are actually set (whitespace-only counts as empty).
    pub fn non_empty(&self) -> Vec<(&'static str, &str)> {
        self.labelled()
            .into_iter()
            .filter(|(_, selector)| !selector.trim().is_empty())
            .collect()
    }

    /// The pagination selector, if one was proposed.
    pub fn pagination(&self) -> Option<&str> {
        Some(self.pagination_selector.trim()).filter(|s| !s.is_empty())
    }
}

/// A persisted in-page interaction that reveals the listing view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SearchInteraction {
    /// Click a filter/category control directly, without typing.
    Button { submit_selector: String },

    /// Fill an input with a query, then click the submit control or press Enter.
    Query { input_selector: String, query: String, submit_selector: Option<String> },
}

impl SearchInteraction {
    /// Build an interaction from the loosely-shaped fields a model returns.
    ///
    /// An input selector plus query yields [`SearchInteraction::Query`]; a lone
    /// submit selector yields [`SearchInteraction::Button`]; anything else is
    /// not an executable interaction.
    pub fn from_parts(input_selector: &str, query: &str, submit_selector: &str) -> Option<Self> {
        let input_selector = input_selector.trim();
        let query = query.trim();
        let submit_selector = submit_selector.trim();

        if !input_selector.is_empty() && !query.is_empty() {
            return Some(Self::Query {
                input_selector: input_selector.to_string(),
                query: query.to_string(),
                submit_selector: Some(submit_selector.to_string()).filter(|s| !s.is_empty()),
            });
        }

        if input_selector.is_empty() && query.is_empty() && !submit_selector.is_empty() {
            return Some(Self::Button { submit_selector: submit_selector.to_string() });
        }

        None
    }
}

/// Finalized extraction configuration for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionSchema {
    #[serde(flatten)]
    pub selectors: SelectorSet,

    /// Requirements selector, relative to the container. Never proposed by the
    /// model; may be filled in by an operator.
    #[serde(default)]
    pub requirements_selector: String,

    /// Interaction to replay before extraction, when the listing view is behind a search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchInteraction>,

    /// The page the selectors were validated against.
    pub final_url: String,
}

impl ExtractionSchema {
    pub fn new(selectors: SelectorSet, final_url: impl Into<String>) -> Self {
        Self { selectors, requirements_selector: String::new(), search: None, final_url: final_url.into() }
    }

    pub fn with_search(mut self, search: Option<SearchInteraction>) -> Self {
        self.search = search;
        self
    }

    pub fn search_required(&self) -> bool {
        self.search.is_some()
    }
}

/// Structured failure feedback carried from one inference attempt to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFeedback {
    pub previous_schema: SelectorSet,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub attempt_number: u32,
}

/// One extracted job posting. `url` is the deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub requirements: String,
    pub scraped_at: DateTime<Utc>,
}

impl JobRecord {
    /// A record is only usable when both title and url are present.
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_selectors() -> SelectorSet {
        SelectorSet {
            job_container_selector: ".job-card".into(),
            title_selector: ".job-title".into(),
            url_selector: "a".into(),
            description_selector: String::new(),
            location_selector: "  ".into(),
            pagination_selector: ".next".into(),
            has_dynamic_loading: false,
        }
    }

    #[test]
    fn test_non_empty_strips_blank_selectors() {
        let selectors = sample_selectors();
        let names: Vec<_> = selectors.non_empty().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["job_container_selector", "title_selector", "url_selector", "pagination_selector"]);
    }

    #[test]
    fn test_pagination_accessor() {
        let mut selectors = sample_selectors();
        assert_eq!(selectors.pagination(), Some(".next"));
        selectors.pagination_selector = " ".into();
        assert_eq!(selectors.pagination(), None);
    }

    #[test]
    fn test_search_interaction_query_mode() {
        let interaction = SearchInteraction::from_parts("#q", "intern", "").unwrap();
        assert_eq!(
            interaction,
            SearchInteraction::Query { input_selector: "#q".into(), query: "intern".into(), submit_selector: None }
        );
    }

    #[test]
    fn test_search_interaction_button_mode() {
        let interaction = SearchInteraction::from_parts("", "", "button.internships").unwrap();
        assert_eq!(interaction, SearchInteraction::Button { submit_selector: "button.internships".into() });
    }

    #[test]
    fn test_search_interaction_insufficient_parts() {
        assert!(SearchInteraction::from_parts("#q", "", "").is_none());
        assert!(SearchInteraction::from_parts("", "intern", "").is_none());
        assert!(SearchInteraction::from_parts("", "", "").is_none());
    }

    #[test]
    fn test_schema_serializes_flat() {
        let schema = ExtractionSchema::new(sample_selectors(), "https://example.com/jobs");
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["job_container_selector"], ".job-card");
        assert_eq!(value["final_url"], "https://example.com/jobs");
        assert!(value.get("search").is_none());
        assert!(!schema.search_required());

        let back: ExtractionSchema = serde_json::from_value(value).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_job_record_completeness() {
        let mut job = JobRecord {
            title: "Software Intern".into(),
            url: "https://example.com/jobs/1".into(),
            description: String::new(),
            location: String::new(),
            requirements: String::new(),
            scraped_at: Utc::now(),
        };
        assert!(job.is_complete());
        job.url.clear();
        assert!(!job.is_complete());
    }
}
