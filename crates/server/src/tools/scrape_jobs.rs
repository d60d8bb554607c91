//! scrape_jobs tool implementation.
//!
//! Production scrape of one company with a given or stored schema. New jobs
//! are stored, jobs no longer listed are removed and the run is logged.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use scout_core::{ExtractionSchema, JobRecord, JobStore};
use scout_engine::{Analyzer, StopReason};
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Input parameters for scrape_jobs tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScrapeJobsParams {
    /// Company name the jobs are stored under.
    pub company: String,

    /// Schema to scrape with. Defaults to the latest schema stored for the company;
    /// a provided schema is stored as the new latest.
    #[serde(default)]
    pub schema: Option<ExtractionSchema>,
}

/// Output structure for scrape_jobs tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ScrapeJobsOutput {
    pub company_id: i64,
    /// Jobs extracted in this run.
    pub jobs: Vec<JobOutput>,
    pub store: StoreSummary,
    pub pages: u32,
    /// Why pagination ended.
    pub stop: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct JobOutput {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,
}

impl From<JobRecord> for JobOutput {
    fn from(job: JobRecord) -> Self {
        Self { title: job.title, url: job.url, description: job.description, location: job.location }
    }
}

/// Effect of the run on the job store.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct StoreSummary {
    /// Distinct job URLs listed on the site.
    pub listed: usize,
    pub added: usize,
    pub duplicates: usize,
    pub removed: usize,
    pub remaining: usize,
}

fn stop_label(stop: StopReason) -> String {
    serde_json::to_value(stop)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{stop:?}"))
}

/// Implementation of the scrape_jobs tool.
pub async fn scrape_impl(
    analyzer: &Analyzer, store: &JobStore, params: ScrapeJobsParams,
) -> Result<CallToolResult, McpError> {
    let company = params.company.trim();
    if company.is_empty() {
        return Err(ToolError::InvalidInput("company cannot be empty".into()).into());
    }
    if let Some(schema) = &params.schema
        && schema.selectors.job_container_selector.trim().is_empty()
    {
        return Err(ToolError::InvalidInput("schema.job_container_selector cannot be empty".into()).into());
    }

    let summary = analyzer.scrape(store, company, params.schema).await.map_err(ToolError::from)?;

    let output = ScrapeJobsOutput {
        company_id: summary.company_id,
        jobs: summary.jobs.into_iter().map(JobOutput::from).collect(),
        store: StoreSummary {
            listed: summary.listed,
            added: summary.added,
            duplicates: summary.duplicates,
            removed: summary.removed,
            remaining: summary.remaining,
        },
        pages: summary.pages,
        stop: stop_label(summary.stop),
    };
    super::json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::offline_analyzer;
    use scout_core::SelectorSet;

    #[tokio::test]
    async fn test_scrape_empty_company() {
        let store = JobStore::open_in_memory().await.unwrap();
        let params = ScrapeJobsParams { company: " ".into(), schema: None };
        let err = scrape_impl(&offline_analyzer(), &store, params).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32602));
    }

    #[tokio::test]
    async fn test_scrape_without_stored_schema() {
        let store = JobStore::open_in_memory().await.unwrap();
        let params = ScrapeJobsParams { company: "Acme".into(), schema: None };
        let err = scrape_impl(&offline_analyzer(), &store, params).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32004));
    }

    #[tokio::test]
    async fn test_scrape_rejects_schema_without_container() {
        let store = JobStore::open_in_memory().await.unwrap();
        let schema = ExtractionSchema::new(SelectorSet::default(), "https://acme.test/jobs");
        let params = ScrapeJobsParams { company: "Acme".into(), schema: Some(schema) };
        let err = scrape_impl(&offline_analyzer(), &store, params).await.unwrap_err();
        assert!(err.message.contains("job_container_selector"));
    }

    #[test]
    fn test_stop_label() {
        assert_eq!(stop_label(StopReason::NoPagination), "no_pagination");
        assert_eq!(stop_label(StopReason::Duplicates), "duplicates");
    }
}
