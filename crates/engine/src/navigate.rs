//! Navigation controller.
//!
//! Walks from a seed page toward the page that actually lists internships.
//! Each step shows the model the page text plus a numbered list of candidate
//! links and accepts one of four answers:
//!
//! | Answer | Effect |
//! |--------|--------|
//! | `STAY` | done, at the current page |
//! | `1..=N` | follow link N, then decide again on the new page |
//! | `0` | no viable link, done at the current page |
//! | `BACK` | reject this page and use browser history; at the first page, re-search |
//!
//! Termination is guaranteed by a step bound and a re-search bound. Running
//! out of either ends at the current page rather than failing.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use scout_client::llm::{self, Prompt};
use scout_client::markup::{Link, PageSnapshot};
use scout_client::{LanguageModel, LlmError};
use scout_core::{RetryPolicy, ScoutConfig};
use url::Url;

use crate::discovery::Discovery;
use crate::error::AnalysisError;
use crate::prompts;
use crate::session::SessionPage;

/// Link text/URL fragments that mark a link as job related.
const LINK_KEYWORDS: &[&str] = &["job", "intern", "oppor", "career"];

const REASON_CHARS: usize = 200;

static DECISION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\W*(STAY|BACK|\d+)\W*$").expect("decision pattern is valid"));

/// A page the controller left, with the model's explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub url: String,
    pub reason: String,
}

/// History stack and rejection memory of one navigation run.
#[derive(Debug, Default)]
pub struct NavigationState {
    history: Vec<String>,
    rejected: Vec<Rejection>,
}

impl NavigationState {
    pub fn push(&mut self, url: impl Into<String>) {
        self.history.push(url.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.history.pop()
    }

    pub fn depth(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Record a rejection; a repeated URL keeps its latest reason.
    pub fn reject(&mut self, url: impl Into<String>, reason: impl Into<String>) {
        let url = url.into();
        let reason = reason.into();
        match self.rejected.iter_mut().find(|r| r.url == url) {
            Some(existing) => existing.reason = reason,
            None => self.rejected.push(Rejection { url, reason }),
        }
    }

    pub fn rejected(&self) -> &[Rejection] {
        &self.rejected
    }
}

/// A parsed navigation answer. `Follow` holds a zero-based link index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Stay,
    Back,
    Follow(usize),
    NoViableLink,
}

/// Parse a model answer against `link_count` candidates. Only a bare token
/// (optionally quoted or punctuated) is accepted; prose and out-of-range
/// indices count as malformed.
pub fn parse_decision(answer: &str, link_count: usize) -> Option<Decision> {
    let token = DECISION.captures(answer.trim())?.get(1)?.as_str().to_ascii_uppercase();
    match token.as_str() {
        "STAY" => Some(Decision::Stay),
        "BACK" => Some(Decision::Back),
        digits => match digits.parse::<usize>().ok()? {
            0 => Some(Decision::NoViableLink),
            n if n <= link_count => Some(Decision::Follow(n - 1)),
            _ => None,
        },
    }
}

/// Job-related links, or every link when none match.
pub fn candidate_links(links: &[Link]) -> Vec<Link> {
    let relevant: Vec<Link> = links
        .iter()
        .filter(|link| {
            let text = link.text.to_lowercase();
            let url = link.url.to_lowercase();
            LINK_KEYWORDS.iter().any(|k| text.contains(k) || url.contains(k))
        })
        .cloned()
        .collect();

    if relevant.is_empty() { links.to_vec() } else { relevant }
}

/// Query used for re-search: the company name when known, else the seed's
/// registrable-looking host label.
pub fn research_query(seed: &Url, company: Option<&str>) -> String {
    let subject = company
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let host = seed.host_str().unwrap_or_default();
            let host = host.strip_prefix("www.").unwrap_or(host);
            host.split('.').next().unwrap_or(host).to_string()
        });
    format!("{subject} internships")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationOptions {
    pub max_steps: u32,
    pub max_researches: u32,
    pub decision_retries: u32,
}

impl NavigationOptions {
    pub fn from_config(config: &ScoutConfig) -> Self {
        Self {
            max_steps: config.max_navigation_steps,
            max_researches: config.max_researches,
            decision_retries: config.decision_retries,
        }
    }
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self::from_config(&ScoutConfig::default())
    }
}

/// Where navigation ended.
#[derive(Debug, Clone)]
pub struct NavigationOutcome {
    pub snapshot: Arc<PageSnapshot>,
    pub steps: u32,
    pub researches: u32,
}

impl NavigationOutcome {
    pub fn url(&self) -> &Url {
        &self.snapshot.url
    }
}

/// Drives one tab through the decision loop.
pub struct Navigator<'a> {
    page: &'a SessionPage,
    model: &'a dyn LanguageModel,
    discovery: Option<&'a Discovery>,
    options: NavigationOptions,
}

impl<'a> Navigator<'a> {
    pub fn new(
        page: &'a SessionPage, model: &'a dyn LanguageModel, discovery: Option<&'a Discovery>, options: NavigationOptions,
    ) -> Self {
        Self { page, model, discovery, options }
    }

    /// Navigate from `seed` to the listing page.
    ///
    /// # Errors
    ///
    /// `AnalysisError::Navigation` when the seed itself cannot be loaded,
    /// `AnalysisError::Browser` when the page cannot be read afterwards.
    pub async fn find_listing_page(&self, seed: &Url, research_query: &str) -> Result<NavigationOutcome, AnalysisError> {
        self.page
            .navigate(seed.as_str())
            .await
            .map_err(|e| AnalysisError::Navigation(format!("could not load {seed}: {e}")))?;

        let mut state = NavigationState::default();
        state.push(seed.as_str());
        let mut all_rejected: Vec<Rejection> = Vec::new();
        let mut steps = 0;
        let mut researches = 0;

        loop {
            let snapshot = self.page.snapshot().await?;

            if steps >= self.options.max_steps {
                tracing::warn!(url = %snapshot.url, steps, "navigation step bound reached, using current page");
                return Ok(NavigationOutcome { snapshot, steps, researches });
            }
            steps += 1;

            let links = candidate_links(&snapshot.links);
            if links.is_empty() {
                tracing::info!(url = %snapshot.url, "page has no outbound links, using it");
                return Ok(NavigationOutcome { snapshot, steps, researches });
            }

            let decision = self.decide(&snapshot, &links, state.rejected()).await;
            tracing::info!(url = %snapshot.url, step = steps, ?decision, depth = state.depth(), "navigation decision");

            match decision {
                Decision::Stay | Decision::NoViableLink => {
                    return Ok(NavigationOutcome { snapshot, steps, researches });
                }
                Decision::Follow(idx) => {
                    let target = &links[idx];
                    match self.page.navigate(&target.url).await {
                        Ok(()) => {
                            let landed = self.page.current_url().await.map(String::from).unwrap_or_else(|_| target.url.clone());
                            state.push(landed);
                        }
                        Err(e) => {
                            tracing::warn!(url = %target.url, error = %e, "could not follow link");
                            state.reject(&target.url, format!("failed to load: {e}"));
                            self.restore(&snapshot.url).await?;
                        }
                    }
                }
                Decision::Back if state.depth() > 1 => {
                    let reason = self.rejection_reason(&snapshot).await;
                    tracing::info!(url = %snapshot.url, reason = %reason, "backing out of page");
                    state.reject(snapshot.url.as_str(), reason);
                    state.pop();

                    if let Err(e) = self.page.go_back().await {
                        tracing::warn!(error = %e, "browser back failed, reloading previous page");
                        let previous = state.history().last().cloned().unwrap_or_else(|| seed.to_string());
                        self.page.navigate(&previous).await?;
                    }
                }
                Decision::Back => {
                    let reason = self.rejection_reason(&snapshot).await;
                    state.reject(snapshot.url.as_str(), reason.clone());
                    all_rejected.push(Rejection { url: snapshot.url.to_string(), reason });

                    let replacement = if researches < self.options.max_researches {
                        self.research(research_query, &all_rejected).await
                    } else {
                        tracing::info!(researches, "re-search bound reached");
                        None
                    };

                    match replacement {
                        Some(url) => {
                            researches += 1;
                            tracing::info!(url = %url, researches, "restarting navigation from re-search result");
                            if let Err(e) = self.page.navigate(url.as_str()).await {
                                tracing::warn!(url = %url, error = %e, "re-search result failed to load");
                                all_rejected.push(Rejection { url: url.to_string(), reason: format!("failed to load: {e}") });
                                self.restore(&snapshot.url).await?;
                                continue;
                            }
                            state = NavigationState::default();
                            state.push(url.as_str());
                        }
                        None => {
                            tracing::info!(seed = %seed, "no replacement page, settling on the seed");
                            if snapshot.url.as_str() != seed.as_str() {
                                self.restore(seed).await?;
                            }
                            let snapshot = self.page.snapshot().await?;
                            return Ok(NavigationOutcome { snapshot, steps, researches });
                        }
                    }
                }
            }
        }
    }

    async fn restore(&self, url: &Url) -> Result<(), AnalysisError> {
        self.page.navigate(url.as_str()).await.map_err(AnalysisError::from)
    }

    async fn research(&self, query: &str, rejected: &[Rejection]) -> Option<Url> {
        let discovery = self.discovery?;
        match discovery.find_replacement(query, rejected).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(query, error = %e, "re-search failed");
                None
            }
        }
    }

    /// Ask for a decision, re-asking on malformed answers, then staying.
    async fn decide(&self, snapshot: &PageSnapshot, links: &[Link], rejected: &[Rejection]) -> Decision {
        let user = prompts::navigation(snapshot.url.as_str(), &snapshot.visible_text, links, rejected);
        let link_count = links.len();
        let model = self.model;
        let policy = RetryPolicy::immediate(self.options.decision_retries.saturating_add(1));

        let answer = policy
            .retry(
                |attempt| {
                    let prompt = Prompt::text(user.clone()).with_system(prompts::navigation_system());
                    async move {
                        let answer = llm::ask_text(model, prompt).await?;
                        parse_decision(&answer, link_count).ok_or_else(|| {
                            tracing::warn!(attempt, answer = %answer, "unparseable navigation decision");
                            LlmError::Parse(format!("unrecognized navigation decision {answer:?}"))
                        })
                    }
                },
                |_| true,
            )
            .await;

        answer.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "no usable navigation decision, staying");
            Decision::Stay
        })
    }

    async fn rejection_reason(&self, snapshot: &PageSnapshot) -> String {
        let prompt = Prompt::text(prompts::rejection_reason(snapshot.url.as_str(), &snapshot.visible_text));
        match llm::ask_text(self.model, prompt).await {
            Ok(reason) if !reason.is_empty() => prompts::truncate_chars(&reason, REASON_CHARS).to_string(),
            Ok(_) | Err(_) => "no relevant internship content".to_string(),
        }
    }
}
