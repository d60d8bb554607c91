//! Validation and evaluation of a candidate schema.
//!
//! ### Two tiers
//! 1. Structural: run a single-page extraction in a fresh tab, test every set
//!    selector against the reduced markup and check the pagination control.
//! 2. Adjudication: the model grades the results against a rubric where only
//!    the container, title and url selectors are critical.
//!
//! An unreadable verdict is always a failure with a retry recommendation. A
//! success verdict is downgraded when no complete record was extracted.

use std::collections::HashSet;
use std::time::Duration;

use schemars::JsonSchema;
use scout_client::llm::{self, Prompt};
use scout_client::LanguageModel;
use scout_core::{ExtractionSchema, JobRecord};
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::extract::{self, ExtractOptions, Extraction, SelectorTest};
use crate::prompts;
use crate::session::{AnalysisSession, SessionPage};

/// Records shown to the model as a sample.
const JOB_SAMPLE: usize = 3;

/// The model's structured judgement of a candidate schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationVerdict {
    /// Whether the configuration works well enough to use.
    pub success: bool,
    /// Specific problems found with critical selectors.
    pub issues: Vec<String>,
    /// Concrete improvements for the next attempt.
    pub suggestions: Vec<String>,
    /// Whether another inference attempt is worthwhile.
    pub retry_recommended: bool,
}

impl ValidationVerdict {
    fn failure(issues: Vec<String>, suggestions: Vec<String>) -> Self {
        Self { success: false, issues, suggestions, retry_recommended: true }
    }

    /// Conservative verdict used when the model's answer cannot be obtained.
    pub fn evaluation_failed() -> Self {
        Self::failure(vec!["LLM evaluation failed".into()], vec!["Retry analysis".into()])
    }
}

/// Everything validation learned about one candidate.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub verdict: ValidationVerdict,
    pub selector_tests: Vec<SelectorTest>,
    pub jobs_found: usize,
    /// Live match count of the pagination selector, when one was proposed.
    pub pagination_matches: Option<usize>,
}

impl ValidationReport {
    fn structural_failure(issue: String, suggestion: &str) -> Self {
        Self {
            verdict: ValidationVerdict::failure(vec![issue], vec![suggestion.to_string()]),
            selector_tests: Vec::new(),
            jobs_found: 0,
            pagination_matches: None,
        }
    }
}

#[derive(Serialize)]
struct JobSample<'a> {
    title: &'a str,
    url: &'a str,
    description: &'a str,
    location: &'a str,
}

fn job_sample(jobs: &[JobRecord]) -> String {
    let sample: Vec<JobSample<'_>> = jobs
        .iter()
        .take(JOB_SAMPLE)
        .map(|j| JobSample { title: &j.title, url: &j.url, description: &j.description, location: &j.location })
        .collect();
    serde_json::to_string_pretty(&sample).unwrap_or_default()
}

async fn check_pagination(page: &SessionPage, schema: &ExtractionSchema) -> (Option<usize>, String) {
    let Some(selector) = schema.selectors.pagination() else {
        return (None, "No pagination selector provided".into());
    };
    match page.page().count(selector).await {
        Ok(n) => (Some(n), format!("Pagination selector '{selector}' matched {n} element(s) on the live page")),
        Err(e) => (Some(0), format!("Pagination selector '{selector}' could not be evaluated: {e}")),
    }
}

async fn run_extraction(
    page: &SessionPage, schema: &ExtractionSchema, options: &ExtractOptions, timeout: Duration,
) -> Result<Extraction, ExtractError> {
    let single = options.clone().single_page();
    let known = HashSet::new();
    match tokio::time::timeout(timeout, extract::extract(page, &schema.final_url, schema, &single, &known)).await {
        Ok(result) => result,
        Err(_) => Err(ExtractError::Timeout(timeout.as_millis() as u64)),
    }
}

async fn evaluate(
    model: &dyn LanguageModel, schema: &ExtractionSchema, tests: &[SelectorTest], extraction: &Extraction,
    pagination_test: &str,
) -> ValidationVerdict {
    let selector_tests = serde_json::to_string_pretty(tests).unwrap_or_default();
    let user = prompts::evaluation(
        &schema.final_url,
        &schema.selectors,
        &selector_tests,
        extraction.jobs.len(),
        &job_sample(&extraction.jobs),
        pagination_test,
        &extraction.reduced_markup,
    );
    let prompt = Prompt::structured::<ValidationVerdict>(user).with_system(prompts::evaluation_system());

    let verdict = match model.generate(prompt).await {
        Ok(raw) => llm::decode_json::<ValidationVerdict>(&raw),
        Err(e) => Err(e),
    };
    verdict.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "evaluation call failed, treating candidate as failed");
        ValidationVerdict::evaluation_failed()
    })
}

/// Validate `schema` against its `final_url` in a new tab of `session`.
///
/// Never fails: browser, extraction and model problems all become a failed
/// verdict that recommends a retry.
pub async fn validate(
    session: &AnalysisSession, model: &dyn LanguageModel, schema: &ExtractionSchema, options: &ExtractOptions,
    timeout: Duration,
) -> ValidationReport {
    let page = match session.open_page().await {
        Ok(page) => page,
        Err(e) => {
            return ValidationReport::structural_failure(
                format!("could not open a validation tab: {e}"),
                "Retry analysis",
            );
        }
    };

    let extraction = match run_extraction(&page, schema, options, timeout).await {
        Ok(extraction) => extraction,
        Err(e) => {
            tracing::warn!(url = %schema.final_url, error = %e, "validation extraction failed");
            page.close().await;
            let suggestion = match &e {
                ExtractError::ContainerSelector { .. } => {
                    "Use a plain CSS2/CSS3 container selector that matches each repeating job listing"
                }
                _ => "Retry analysis",
            };
            return ValidationReport::structural_failure(format!("extraction failed: {e}"), suggestion);
        }
    };

    let tests = extract::test_selectors(&extraction.reduced_markup, schema);
    let (pagination_matches, pagination_test) = check_pagination(&page, schema).await;
    page.close().await;

    tracing::info!(
        url = %schema.final_url,
        jobs = extraction.jobs.len(),
        selectors_ok = tests.iter().filter(|t| t.success).count(),
        selectors = tests.len(),
        "structural validation complete"
    );

    let mut verdict = evaluate(model, schema, &tests, &extraction, &pagination_test).await;
    if verdict.success && !extraction.jobs.iter().any(JobRecord::is_complete) {
        tracing::warn!(url = %schema.final_url, "model accepted a schema that extracted no complete job");
        verdict.success = false;
        verdict.retry_recommended = true;
        verdict.issues.push("No job with both a title and a URL was extracted".into());
    }

    ValidationReport { verdict, selector_tests: tests, jobs_found: extraction.jobs.len(), pagination_matches }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSite, ScriptedModel};
    use scout_core::SelectorSet;

    const EVALUATE: &str = "Evaluate this job scraper configuration";

    const BOARD: &str = r#"<main>
        <a href="/jobs/1"><div class="job-card"><span class="job-title">Software Intern</span></div></a>
        <a href="/jobs/2"><div class="job-card"><span class="job-title">Data Intern</span></div></a>
        <a class="next" href="/jobs?page=2">Next</a>
    </main>"#;

    fn schema(container: &str) -> ExtractionSchema {
        ExtractionSchema::new(
            SelectorSet {
                job_container_selector: container.into(),
                title_selector: ".job-title".into(),
                pagination_selector: "a.next".into(),
                ..Default::default()
            },
            "https://acme.test/jobs",
        )
    }

    async fn run(model: &ScriptedModel, schema: &ExtractionSchema) -> ValidationReport {
        let site = FakeSite::new().page("https://acme.test/jobs", BOARD);
        let session = AnalysisSession::launch(&site.launcher(), Duration::ZERO).await.unwrap();
        let report = validate(&session, model, schema, &ExtractOptions::default(), Duration::from_secs(5)).await;
        session.close().await;
        report
    }

    #[tokio::test]
    async fn test_accepting_verdict() {
        let model = ScriptedModel::new()
            .reply(EVALUATE, r#"{"success": true, "issues": [], "suggestions": [], "retry_recommended": false}"#);
        let report = run(&model, &schema(".job-card")).await;

        assert!(report.verdict.success);
        assert_eq!(report.jobs_found, 2);
        assert_eq!(report.pagination_matches, Some(1));

        let prompt = &model.prompts()[0];
        assert!(prompt.user.contains("JOBS EXTRACTED (2 total)"));
        assert!(prompt.user.contains("https://acme.test/jobs/1"));
        assert!(prompt.user.contains("matched 1 element(s)"));
        assert!(prompt.system.as_deref().unwrap_or_default().contains("OPTIONAL ELEMENTS"));
    }

    #[tokio::test]
    async fn test_success_without_complete_jobs_is_downgraded() {
        let model = ScriptedModel::new()
            .reply(EVALUATE, r#"{"success": true, "issues": [], "suggestions": [], "retry_recommended": false}"#);
        let report = run(&model, &schema(".no-such-card")).await;

        assert!(!report.verdict.success);
        assert!(report.verdict.retry_recommended);
        assert_eq!(report.jobs_found, 0);
        assert!(report.verdict.issues.iter().any(|i| i.contains("title and a URL")));
    }

    #[tokio::test]
    async fn test_unreadable_verdict_is_failure() {
        let garbled = ScriptedModel::new().reply(EVALUATE, "Looks good to me!");
        let report = run(&garbled, &schema(".job-card")).await;
        assert_eq!(report.verdict, ValidationVerdict::evaluation_failed());

        let offline = ScriptedModel::new().fail(EVALUATE, "timeout");
        let report = run(&offline, &schema(".job-card")).await;
        assert!(!report.verdict.success);
        assert!(report.verdict.retry_recommended);
    }

    #[tokio::test]
    async fn test_invalid_container_fails_without_model_call() {
        let model = ScriptedModel::new();
        let report = run(&model, &schema("div[")).await;
        assert!(!report.verdict.success);
        assert!(report.verdict.issues[0].contains("invalid container selector"));
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_rejecting_verdict_passes_through() {
        let model = ScriptedModel::new().reply(
            EVALUATE,
            r#"{"success": false, "issues": ["container matches the pager"], "suggestions": ["use .job-card"], "retry_recommended": true}"#,
        );
        let report = run(&model, &schema(".job-card")).await;
        assert!(!report.verdict.success);
        assert_eq!(report.verdict.issues, ["container matches the pager"]);
        assert_eq!(report.verdict.suggestions, ["use .job-card"]);
    }
}
