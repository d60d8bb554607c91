//! The `analyze_job_board` orchestrator and the production scrape run.
//!
//! ### Analysis
//! navigation → optional search interaction → inference/validation loop.
//! One browser session is held for the whole run and closed on every exit
//! path. The loop makes at most `max_attempts` attempts, backing off between
//! them, and ends with one validated schema or a phase-labelled error.

use std::sync::Arc;

use scout_client::{BraveClient, BrowserLauncher, ChatClient, LanguageModel, PageSnapshot, WebSearch, canonicalize};
use scout_core::{ExtractionSchema, JobStore, ScoutConfig, SearchInteraction, ValidationFeedback};
use serde::Serialize;
use url::Url;

use crate::discovery::Discovery;
use crate::error::{AnalysisError, ScrapeError};
use crate::extract::{self, ExtractOptions, StopReason};
use crate::infer::infer_schema;
use crate::navigate::{NavigationOptions, Navigator, research_query};
use crate::search::maybe_search;
use crate::session::AnalysisSession;
use crate::validate::validate;

/// Last failure seen by the attempt loop.
enum AttemptFailure {
    Inference(String),
    Validation(String),
}

/// Result of [`Analyzer::scrape`].
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeSummary {
    pub company_id: i64,
    pub jobs: Vec<scout_core::JobRecord>,
    /// Distinct job URLs listed on the site during this run.
    pub listed: usize,
    pub added: usize,
    pub duplicates: usize,
    pub removed: usize,
    pub remaining: usize,
    pub pages: u32,
    pub stop: StopReason,
}

/// Runs analyses and scrapes with shared collaborators.
pub struct Analyzer {
    model: Arc<dyn LanguageModel>,
    launcher: Arc<dyn BrowserLauncher>,
    discovery: Option<Discovery>,
    config: ScoutConfig,
}

impl Analyzer {
    pub fn new(model: Arc<dyn LanguageModel>, launcher: Arc<dyn BrowserLauncher>, config: ScoutConfig) -> Self {
        Self { model, launcher, discovery: None, config }
    }

    /// Enable discovery and re-search through `search`.
    pub fn with_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.discovery =
            Some(Discovery::new(search, Arc::clone(&self.model)).with_search_terms(self.config.search_terms.clone()));
        self
    }

    /// Build the production collaborators described by `config`.
    ///
    /// Web search is enabled only when a Brave key is configured.
    ///
    /// # Errors
    ///
    /// `AnalysisError::Config` when the model client cannot be built.
    pub fn from_config(config: ScoutConfig) -> Result<Self, AnalysisError> {
        let model = ChatClient::from_config(&config).map_err(|e| AnalysisError::Config(e.to_string()))?;
        let launcher = default_launcher(&config);
        let search = match config.brave_api_key.as_deref() {
            Some(_) => Some(BraveClient::from_config(&config).map_err(|e| AnalysisError::Config(e.to_string()))?),
            None => {
                tracing::info!("no Brave API key configured, discovery and re-search disabled");
                None
            }
        };

        let analyzer = Self::new(Arc::new(model), launcher, config);
        Ok(match search {
            Some(search) => analyzer.with_search(Arc::new(search)),
            None => analyzer,
        })
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    pub fn discovery(&self) -> Option<&Discovery> {
        self.discovery.as_ref()
    }

    /// Find the listing page reachable from `seed` and return a validated
    /// extraction schema for it.
    ///
    /// # Errors
    ///
    /// An `AnalysisError` whose message names the failing phase.
    pub async fn analyze_job_board(&self, seed: &str) -> Result<ExtractionSchema, AnalysisError> {
        self.analyze(seed, None).await
    }

    /// As [`Analyzer::analyze_job_board`], with the company name steering re-search.
    pub async fn analyze_company_board(&self, company: &str, seed: &str) -> Result<ExtractionSchema, AnalysisError> {
        self.analyze(seed, Some(company)).await
    }

    async fn analyze(&self, seed: &str, company: Option<&str>) -> Result<ExtractionSchema, AnalysisError> {
        let seed = canonicalize(seed)?;
        tracing::info!(seed = %seed, "analysis started");

        let session = AnalysisSession::launch(self.launcher.as_ref(), self.config.settle()).await?;
        let result = self.run(&session, &seed, company).await;
        session.close().await;

        match &result {
            Ok(schema) => tracing::info!(url = %schema.final_url, search = schema.search_required(), "analysis succeeded"),
            Err(e) => tracing::error!(seed = %seed, phase = ?e.phase(), error = %e, "analysis failed"),
        }
        result
    }

    async fn run(
        &self, session: &AnalysisSession, seed: &Url, company: Option<&str>,
    ) -> Result<ExtractionSchema, AnalysisError> {
        let page = session.open_page().await?;
        let navigator = Navigator::new(
            &page,
            self.model.as_ref(),
            self.discovery.as_ref(),
            NavigationOptions::from_config(&self.config),
        );

        let found = match navigator.find_listing_page(seed, &research_query(seed, company)).await {
            Ok(found) => found,
            Err(e) => {
                page.close().await;
                return Err(e);
            }
        };
        tracing::info!(url = %found.url(), steps = found.steps, researches = found.researches, "listing page found");

        let (snapshot, search) = match maybe_search(&page, &found.snapshot, self.model.as_ref()).await {
            Some(outcome) => (outcome.snapshot, Some(outcome.interaction)),
            None => (found.snapshot, None),
        };
        page.close().await;

        self.infer_and_validate(session, &snapshot, search).await
    }

    async fn infer_and_validate(
        &self, session: &AnalysisSession, snapshot: &PageSnapshot, search: Option<SearchInteraction>,
    ) -> Result<ExtractionSchema, AnalysisError> {
        let policy = self.config.retry_policy();
        let options = ExtractOptions::from_config(&self.config);
        let url = snapshot.url.as_str();
        let mut feedback: Option<ValidationFeedback> = None;
        let mut last_failure = AttemptFailure::Inference("no attempt was made".into());

        for attempt in 0..policy.max_attempts() {
            if attempt > 0 {
                policy.backoff(attempt).await;
            }
            tracing::info!(url, attempt = attempt + 1, max = policy.max_attempts(), "schema attempt");

            let selectors =
                match infer_schema(self.model.as_ref(), url, &snapshot.reduced_markup, feedback.as_ref()).await {
                    Ok(selectors) => selectors,
                    Err(e) => {
                        tracing::warn!(attempt = attempt + 1, error = %e, "schema inference failed");
                        last_failure = AttemptFailure::Inference(e.to_string());
                        continue;
                    }
                };

            let candidate = ExtractionSchema::new(selectors, url).with_search(search.clone());
            let report =
                validate(session, self.model.as_ref(), &candidate, &options, self.config.validation_timeout()).await;

            if report.verdict.success {
                tracing::info!(attempt = attempt + 1, jobs = report.jobs_found, "schema validated");
                return Ok(candidate);
            }

            tracing::warn!(
                attempt = attempt + 1,
                jobs = report.jobs_found,
                issues = ?report.verdict.issues,
                retry_recommended = report.verdict.retry_recommended,
                "schema rejected by validation"
            );
            last_failure = AttemptFailure::Validation(if report.verdict.issues.is_empty() {
                "validation rejected the schema".into()
            } else {
                report.verdict.issues.join("; ")
            });
            feedback = Some(ValidationFeedback {
                previous_schema: candidate.selectors,
                issues: report.verdict.issues,
                suggestions: report.verdict.suggestions,
                attempt_number: attempt + 1,
            });
        }

        let attempts = policy.max_attempts();
        Err(match last_failure {
            AttemptFailure::Inference(last) => AnalysisError::Inference { attempts, last },
            AttemptFailure::Validation(last) => AnalysisError::Validation { attempts, last },
        })
    }

    /// Production scrape of `company` with `schema`, or its stored schema.
    ///
    /// Known URLs from the store feed duplicate detection. New jobs are
    /// inserted, jobs no longer listed are removed, and the run is logged as
    /// successful when at least one job was listed.
    ///
    /// # Errors
    ///
    /// Store failures, a missing schema, or an extraction failure (which is
    /// also logged against the company).
    pub async fn scrape(
        &self, store: &JobStore, company: &str, schema: Option<ExtractionSchema>,
    ) -> Result<ScrapeSummary, ScrapeError> {
        let company_id = store
            .upsert_company(company, schema.as_ref().map(|s| s.final_url.as_str()))
            .await?;
        let schema = match schema {
            Some(schema) => {
                store.save_schema(company_id, &schema).await?;
                schema
            }
            None => store
                .latest_schema(company_id)
                .await?
                .ok_or_else(|| ScrapeError::NoSchema(company.to_string()))?,
        };

        let known = store.known_job_urls(company_id).await?;
        tracing::info!(company, url = %schema.final_url, known = known.len(), "scrape started");

        let options = ExtractOptions::from_config(&self.config);
        let session = AnalysisSession::launch(self.launcher.as_ref(), self.config.settle()).await?;
        let extraction = match session.open_page().await {
            Ok(page) => {
                let result = extract::extract(&page, &schema.final_url, &schema, &options, &known).await;
                page.close().await;
                result
            }
            Err(e) => Err(e.into()),
        };
        session.close().await;

        let extraction = match extraction {
            Ok(extraction) => extraction,
            Err(e) => {
                store.log_execution(company_id, 0, false, Some(&e.to_string())).await?;
                return Err(e.into());
            }
        };

        let batch = store.add_jobs_batch(company_id, &extraction.jobs).await?;
        let listed = extraction.listed_urls.len();
        let stale = if listed > 0 {
            store.remove_stale_jobs(company_id, &extraction.listed_urls).await?
        } else {
            tracing::warn!(company, "no jobs listed, keeping stored jobs");
            Default::default()
        };

        let error = (listed == 0).then_some("no jobs extracted");
        store.log_execution(company_id, listed, listed > 0, error).await?;

        tracing::info!(
            company,
            listed,
            added = batch.added,
            removed = stale.removed,
            pages = extraction.pages,
            stop = ?extraction.stop,
            "scrape complete"
        );

        Ok(ScrapeSummary {
            company_id,
            jobs: extraction.jobs,
            listed,
            added: batch.added,
            duplicates: batch.duplicates,
            removed: stale.removed,
            remaining: stale.remaining,
            pages: extraction.pages,
            stop: extraction.stop,
        })
    }
}

#[cfg(feature = "render")]
fn default_launcher(config: &ScoutConfig) -> Arc<dyn BrowserLauncher> {
    Arc::new(scout_client::ChromiumLauncher::new(scout_client::LaunchOptions::from(config)))
}

#[cfg(not(feature = "render"))]
fn default_launcher(_config: &ScoutConfig) -> Arc<dyn BrowserLauncher> {
    tracing::warn!("built without the render feature, browser sessions are disabled");
    Arc::new(scout_client::DisabledLauncher)
}
