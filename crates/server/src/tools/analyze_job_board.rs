//! analyze_job_board tool implementation.
//!
//! Runs a full analysis from a seed URL and returns the validated schema.
//! When a company is named the schema is persisted for later scrapes.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use scout_core::{ExtractionSchema, JobStore};
use scout_engine::Analyzer;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Input parameters for analyze_job_board tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeJobBoardParams {
    /// Careers page or company homepage to start from. The scheme defaults to https.
    pub seed_url: String,

    /// Company name. Steers re-search and, when set, the schema is stored under it.
    #[serde(default)]
    pub company: Option<String>,
}

/// Output structure for analyze_job_board tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeJobBoardOutput {
    pub schema: ExtractionSchema,
    /// Store id of the company, when one was named.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
}

/// Implementation of the analyze_job_board tool.
pub async fn analyze_impl(
    analyzer: &Analyzer, store: &JobStore, params: AnalyzeJobBoardParams,
) -> Result<CallToolResult, McpError> {
    if params.seed_url.trim().is_empty() {
        return Err(ToolError::InvalidInput("seed_url cannot be empty".into()).into());
    }
    let company = params.company.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let schema = match company {
        Some(company) => analyzer.analyze_company_board(company, &params.seed_url).await,
        None => analyzer.analyze_job_board(&params.seed_url).await,
    }
    .map_err(ToolError::from)?;

    let company_id = match company {
        Some(company) => {
            let id = store
                .upsert_company(company, Some(&schema.final_url))
                .await
                .map_err(ToolError::from)?;
            store.save_schema(id, &schema).await.map_err(ToolError::from)?;
            tracing::info!(company, company_id = id, "schema stored");
            Some(id)
        }
        None => None,
    };

    super::json_result(&AnalyzeJobBoardOutput { schema, company_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::offline_analyzer;

    #[tokio::test]
    async fn test_analyze_empty_seed() {
        let store = JobStore::open_in_memory().await.unwrap();
        let params = AnalyzeJobBoardParams { seed_url: "  ".into(), ..Default::default() };

        let err = analyze_impl(&offline_analyzer(), &store, params).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32602));
    }

    #[tokio::test]
    async fn test_analyze_unsupported_scheme() {
        let store = JobStore::open_in_memory().await.unwrap();
        let params = AnalyzeJobBoardParams { seed_url: "mailto:jobs@acme.test".into(), company: None };

        let err = analyze_impl(&offline_analyzer(), &store, params).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32602));
        assert!(err.message.contains("invalid seed url"));
    }

    #[tokio::test]
    async fn test_analyze_without_browser_reports_phase() {
        let store = JobStore::open_in_memory().await.unwrap();
        let params = AnalyzeJobBoardParams { seed_url: "acme.test/careers".into(), company: Some("Acme".into()) };

        let err = analyze_impl(&offline_analyzer(), &store, params).await.unwrap_err();
        assert!(err.message.starts_with("ANALYSIS_FAILED: browser:"));
        assert!(store.company_by_name("Acme").await.unwrap().is_none());
    }

    #[test]
    fn test_params_company_optional() {
        let params: AnalyzeJobBoardParams = serde_json::from_str(r#"{"seed_url": "acme.test"}"#).unwrap();
        assert!(params.company.is_none());
    }
}
