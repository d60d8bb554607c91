//! MCP tool implementations.
//!
//! Each tool is glue over one engine entrypoint; validation of the inputs
//! happens here, everything else in the engine.

pub mod analyze_job_board;
pub mod discover_job_board;
pub mod scrape_jobs;

pub use analyze_job_board::{AnalyzeJobBoardOutput, AnalyzeJobBoardParams};
pub use discover_job_board::{DiscoverJobBoardOutput, DiscoverJobBoardParams};
pub use scrape_jobs::{ScrapeJobsOutput, ScrapeJobsParams};

use rmcp::{ErrorData as McpError, model::*};
use serde::Serialize;

/// Serialize `output` as the single text content of a successful result.
fn json_result(output: &impl Serialize) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(output).unwrap_or_default(),
    )]))
}
