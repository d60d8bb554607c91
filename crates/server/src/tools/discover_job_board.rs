//! discover_job_board tool implementation.
//!
//! Finds a company's internship job board via Brave Search and a model pick.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use scout_engine::Analyzer;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Input parameters for discover_job_board tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DiscoverJobBoardParams {
    /// Company name to search for.
    pub company: String,
}

/// Output structure for discover_job_board tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiscoverJobBoardOutput {
    pub company: String,
    /// Discovered job board URL, absent when nothing suitable was found.
    pub url: Option<String>,
}

/// Implementation of the discover_job_board tool.
pub async fn discover_impl(analyzer: &Analyzer, params: DiscoverJobBoardParams) -> Result<CallToolResult, McpError> {
    let company = params.company.trim();
    if company.is_empty() {
        return Err(ToolError::InvalidInput("company cannot be empty".into()).into());
    }
    let Some(discovery) = analyzer.discovery() else {
        return Err(ToolError::NotConfigured("discovery requires SCOUT_BRAVE_API_KEY".into()).into());
    };

    let url = discovery.discover(company).await.map_err(ToolError::from)?;
    super::json_result(&DiscoverJobBoardOutput { company: company.to_string(), url: url.map(String::from) })
}
