//! Extraction engine.
//!
//! ### Flow
//! 1. Navigate, settle, dismiss overlays, replay the schema's search interaction.
//! 2. Reduce the live markup and inject it back into the page, so every later
//!    selector query sees the same cleaned structure validation tested.
//! 3. Extract records from the reduced markup.
//! 4. Follow the pagination control until it disappears, is inactive, yields
//!    an empty page, yields mostly known URLs, or the page budget runs out.
//!
//! ### Record acceptance
//! A record is kept only if both title and URL are non-empty. All other fields
//! may be empty. URLs are the deduplication key.

use std::collections::HashSet;

use chrono::Utc;
use scout_client::markup::{self, collapse_whitespace};
use scout_client::urls::resolve_href;
use scout_core::{ExtractionSchema, JobRecord, ScoutConfig};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

use crate::error::ExtractError;
use crate::search::perform_interaction;
use crate::session::SessionPage;

/// Number of sample texts reported per selector test.
const SAMPLE_TEXTS: usize = 3;
const SAMPLE_TEXT_CHARS: usize = 100;

/// Tunables for one extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub max_pages: u32,
    /// Duplicate fraction at or above which pagination stops.
    pub duplicate_threshold: f64,
    /// Case-insensitive container text filter; empty disables filtering.
    pub keywords: Vec<String>,
}

impl ExtractOptions {
    pub fn from_config(config: &ScoutConfig) -> Self {
        Self {
            max_pages: config.max_pages.max(1),
            duplicate_threshold: config.duplicate_threshold,
            keywords: config
                .text_filter_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// First page only, as used by validation.
    pub fn single_page(mut self) -> Self {
        self.max_pages = 1;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::from_config(&ScoutConfig::default())
    }
}

/// Why pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No pagination selector configured.
    NoPagination,
    PageBudget,
    ControlMissing,
    /// Control present but disabled or hidden.
    ControlInactive,
    ClickFailed,
    EmptyPage,
    Duplicates,
}

/// Outcome of [`extract`].
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Unique records in first-seen order.
    pub jobs: Vec<JobRecord>,
    /// Every URL observed on any visited page, including duplicates of known records.
    pub listed_urls: HashSet<String>,
    /// Reduced markup of the first page.
    pub reduced_markup: String,
    /// Page URL after any interaction.
    pub final_url: Url,
    pub pages: u32,
    pub stop: StopReason,
}

/// Per-page duplicate accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct PageAssessment {
    /// Records whose URL was not known, deduplicated.
    pub fresh: Vec<JobRecord>,
    /// Distinct URLs on the page.
    pub distinct: usize,
    /// Distinct URLs already known.
    pub duplicates: usize,
    pub stop: bool,
}

impl PageAssessment {
    pub fn duplicate_fraction(&self) -> f64 {
        if self.distinct == 0 { 0.0 } else { self.duplicates as f64 / self.distinct as f64 }
    }
}

/// Classify one paginated page against the known URL set.
///
/// Stops when the page is empty, or when it has duplicates and either the
/// duplicate fraction reaches `threshold` or every URL is a duplicate.
pub fn assess_page(records: Vec<JobRecord>, known: &HashSet<String>, threshold: f64) -> PageAssessment {
    let distinct_urls: HashSet<&str> = records.iter().map(|r| r.url.as_str()).collect();
    let distinct = distinct_urls.len();
    let duplicates = distinct_urls.iter().filter(|url| known.contains(**url)).count();

    let mut taken = HashSet::new();
    let fresh: Vec<JobRecord> = records
        .into_iter()
        .filter(|r| !known.contains(&r.url) && taken.insert(r.url.clone()))
        .collect();

    let mut assessment = PageAssessment { fresh, distinct, duplicates, stop: false };
    assessment.stop = distinct == 0
        || (duplicates > 0 && (assessment.duplicate_fraction() >= threshold || duplicates == distinct));
    assessment
}

fn compile(field: &str, selector: &str) -> Option<Selector> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(field, selector, error = ?e, "unparseable selector, field will be empty");
            None
        }
    }
}

fn first_text(container: ElementRef<'_>, selector: Option<&Selector>) -> String {
    selector
        .and_then(|s| container.select(s).next())
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

fn element_href(element: ElementRef<'_>) -> Option<&str> {
    element.value().attr("href").map(str::trim).filter(|href| !href.is_empty())
}

/// Container href, then the url selector's first match (or its first linked
/// descendant), then the nearest enclosing anchor.
fn job_href<'a>(container: ElementRef<'a>, url_selector: Option<&Selector>) -> Option<&'a str> {
    if let Some(href) = element_href(container) {
        return Some(href);
    }

    if let Some(selector) = url_selector
        && let Some(target) = container.select(selector).next()
    {
        if let Some(href) = element_href(target) {
            return Some(href);
        }
        if let Some(href) = target.descendants().filter_map(ElementRef::wrap).find_map(element_href) {
            return Some(href);
        }
    }

    container
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "a")
        .and_then(element_href)
}

fn matches_keywords(container: ElementRef<'_>, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let text = container.text().collect::<String>().to_lowercase();
    keywords.iter().any(|k| text.contains(k.as_str()))
}

/// Extract job records from (reduced) markup.
///
/// # Errors
///
/// Returns `ExtractError::ContainerSelector` when the container selector is
/// empty or does not parse. Field selectors never fail the extraction.
pub fn extract_jobs(
    markup: &str, base: &Url, schema: &ExtractionSchema, keywords: &[String],
) -> Result<Vec<JobRecord>, ExtractError> {
    let selectors = &schema.selectors;
    let container_selector = selectors.job_container_selector.trim();
    let container = Selector::parse(container_selector).map_err(|e| ExtractError::ContainerSelector {
        selector: container_selector.to_string(),
        reason: if container_selector.is_empty() { "empty selector".into() } else { format!("{e:?}") },
    })?;

    let title = compile("title_selector", &selectors.title_selector);
    let url = compile("url_selector", &selectors.url_selector);
    let description = compile("description_selector", &selectors.description_selector);
    let location = compile("location_selector", &selectors.location_selector);
    let requirements = compile("requirements_selector", &schema.requirements_selector);

    let document = Html::parse_document(markup);
    let scraped_at = Utc::now();
    let mut jobs = Vec::new();
    let mut matched = 0usize;

    for (idx, element) in document.select(&container).enumerate() {
        matched += 1;
        if !matches_keywords(element, keywords) {
            continue;
        }

        let record = JobRecord {
            title: first_text(element, title.as_ref()),
            url: job_href(element, url.as_ref())
                .and_then(|href| resolve_href(base, href))
                .unwrap_or_default(),
            description: first_text(element, description.as_ref()),
            location: first_text(element, location.as_ref()),
            requirements: first_text(element, requirements.as_ref()),
            scraped_at,
        };

        if record.is_complete() {
            jobs.push(record);
        } else if record.title.is_empty() {
            tracing::warn!(container = idx + 1, url = %record.url, "job rejected, no title extracted");
        } else {
            tracing::warn!(container = idx + 1, title = %record.title, "job rejected, no url extracted");
        }
    }

    tracing::debug!(containers = matched, jobs = jobs.len(), "extracted jobs from page");
    Ok(jobs)
}

/// Structural result of testing one selector against a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorTest {
    pub name: &'static str,
    pub selector: String,
    pub elements_found: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample_texts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Test every non-empty selector of `schema` against the whole document.
pub fn test_selectors(markup: &str, schema: &ExtractionSchema) -> Vec<SelectorTest> {
    let document = Html::parse_document(markup);

    schema
        .selectors
        .non_empty()
        .into_iter()
        .map(|(name, selector)| {
            let selector = selector.trim().to_string();
            let parsed = Selector::parse(&selector).map_err(|e| format!("{e:?}"));
            match parsed {
                Ok(parsed) => {
                    let elements: Vec<ElementRef<'_>> = document.select(&parsed).collect();
                    let sample_texts = elements
                        .iter()
                        .take(SAMPLE_TEXTS)
                        .map(|el| el.text().collect::<String>().trim().chars().take(SAMPLE_TEXT_CHARS).collect())
                        .filter(|text: &String| !text.is_empty())
                        .collect();
                    SelectorTest {
                        name,
                        selector,
                        elements_found: elements.len(),
                        success: !elements.is_empty(),
                        sample_texts,
                        error: None,
                    }
                }
                Err(e) => SelectorTest {
                    name,
                    selector,
                    elements_found: 0,
                    success: false,
                    sample_texts: Vec::new(),
                    error: Some(e),
                },
            }
        })
        .collect()
}

async fn reduce_in_place(page: &SessionPage) -> Result<(String, Url), ExtractError> {
    let raw = page.page().content().await?;
    let reduced = markup::reduce(&raw);
    if let Err(e) = page.page().set_content(&reduced).await {
        tracing::warn!(error = %e, "could not inject reduced markup, live queries see the raw page");
    }
    page.invalidate().await;
    Ok((reduced, page.current_url().await?))
}

/// Run the schema against `url` on `page`.
///
/// `known_urls` are URLs already stored for the company; they count as
/// duplicates for pagination termination.
///
/// # Errors
///
/// Navigation failure, an unusable container selector, or a browser failure
/// while reading the first page.
pub async fn extract(
    page: &SessionPage, url: &str, schema: &ExtractionSchema, options: &ExtractOptions, known_urls: &HashSet<String>,
) -> Result<Extraction, ExtractError> {
    page.navigate(url).await?;

    if let Err(e) = page.page().dismiss_overlays().await {
        tracing::debug!(error = %e, "overlay removal failed");
    }

    if let Some(interaction) = &schema.search {
        match perform_interaction(page, interaction).await {
            Ok(()) => page.settle().await,
            Err(e) => tracing::warn!(error = %e, "search interaction failed, extracting the page as loaded"),
        }
    }

    let (reduced_markup, final_url) = reduce_in_place(page).await?;
    let first = extract_jobs(&reduced_markup, &final_url, schema, &options.keywords)?;

    let mut listed_urls = HashSet::new();
    let mut jobs = Vec::new();
    for record in first {
        if listed_urls.insert(record.url.clone()) {
            jobs.push(record);
        }
    }
    let mut known: HashSet<String> = known_urls.union(&listed_urls).cloned().collect();

    let mut pages = 1;
    let stop = match schema.selectors.pagination() {
        None => StopReason::NoPagination,
        Some(selector) => loop {
            if pages >= options.max_pages {
                break StopReason::PageBudget;
            }
            match next_page(page, selector).await {
                Ok(()) => {}
                Err(reason) => break reason,
            }
            pages += 1;

            let records = match reduce_in_place(page).await {
                Ok((reduced, base)) => extract_jobs(&reduced, &base, schema, &options.keywords)?,
                Err(e) => {
                    tracing::warn!(page = pages, error = %e, "could not read paginated page");
                    break StopReason::EmptyPage;
                }
            };
            listed_urls.extend(records.iter().map(|r| r.url.clone()));

            let assessment = assess_page(records, &known, options.duplicate_threshold);
            tracing::info!(
                page = pages,
                distinct = assessment.distinct,
                duplicates = assessment.duplicates,
                fresh = assessment.fresh.len(),
                "paginated page extracted"
            );

            known.extend(assessment.fresh.iter().map(|r| r.url.clone()));
            let empty = assessment.distinct == 0;
            let stop = assessment.stop;
            jobs.extend(assessment.fresh);

            if empty {
                break StopReason::EmptyPage;
            }
            if stop {
                break StopReason::Duplicates;
            }
        },
    };

    tracing::info!(url, jobs = jobs.len(), pages, stop = ?stop, "extraction complete");
    Ok(Extraction { jobs, listed_urls, reduced_markup, final_url, pages, stop })
}

/// Click the next-page control if it is present and active.
async fn next_page(page: &SessionPage, selector: &str) -> Result<(), StopReason> {
    if let Err(e) = page.page().dismiss_overlays().await {
        tracing::debug!(error = %e, "overlay removal failed");
    }

    match page.page().control_state(selector).await {
        Ok(Some(state)) if state.is_actionable() => {}
        Ok(Some(state)) => {
            tracing::info!(selector, ?state, "next page control inactive, pagination complete");
            return Err(StopReason::ControlInactive);
        }
        Ok(None) => {
            tracing::info!(selector, "no next page control, pagination complete");
            return Err(StopReason::ControlMissing);
        }
        Err(e) => {
            tracing::warn!(selector, error = %e, "could not inspect next page control");
            return Err(StopReason::ControlMissing);
        }
    }

    if let Err(e) = page.page().click(selector).await {
        tracing::warn!(selector, error = %e, "failed to click next page control");
        return Err(StopReason::ClickFailed);
    }
    page.settle().await;
    Ok(())
}
