//! Structured errors for the intern-scout server.
//!
//! Each variant carries a stable upper-case code and maps onto a JSON-RPC
//! error code when returned from a tool.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use scout_engine::{AnalysisError, DiscoveryError, ScrapeError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., empty company name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The server was started without a collaborator the tool needs.
    #[error("NOT_CONFIGURED: {0}")]
    NotConfigured(String),

    #[error("ANALYSIS_FAILED: {0}")]
    AnalysisFailed(String),

    #[error("DISCOVERY_FAILED: {0}")]
    DiscoveryFailed(String),

    #[error("SCRAPE_FAILED: {0}")]
    ScrapeFailed(String),

    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    #[error("STORE_ERROR: {0}")]
    Store(String),
}

impl From<AnalysisError> for ToolError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidSeed(e) => Self::InvalidInput(format!("invalid seed url: {e}")),
            AnalysisError::Config(msg) => Self::NotConfigured(msg),
            other => Self::AnalysisFailed(other.to_string()),
        }
    }
}

impl From<DiscoveryError> for ToolError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::EmptyCompany => Self::InvalidInput(err.to_string()),
            DiscoveryError::Search(e) => Self::DiscoveryFailed(e.to_string()),
        }
    }
}

impl From<ScrapeError> for ToolError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::NoSchema(company) => {
                Self::NotFound(format!("no extraction schema for {company}; run analyze_job_board first"))
            }
            ScrapeError::Store(scout_core::Error::InvalidInput(msg)) => Self::InvalidInput(msg),
            ScrapeError::Store(e) => Self::Store(e.to_string()),
            other => Self::ScrapeFailed(other.to_string()),
        }
    }
}

impl From<scout_core::Error> for ToolError {
    fn from(err: scout_core::Error) -> Self {
        match err {
            scout_core::Error::InvalidInput(msg) => Self::InvalidInput(msg),
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidInput(_) => -32602,
            ToolError::NotConfigured(_) => -32002,
            ToolError::NotFound(_) => -32004,
            _ => -32000,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
