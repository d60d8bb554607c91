//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::analyze_job_board::{AnalyzeJobBoardParams, analyze_impl};
use crate::tools::discover_job_board::{DiscoverJobBoardParams, discover_impl};
use crate::tools::scrape_jobs::{ScrapeJobsParams, scrape_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use scout_core::JobStore;
use scout_engine::Analyzer;

/// The main MCP server handler for intern-scout.
#[derive(Clone)]
pub struct ScoutServer {
    tool_router: ToolRouter<Self>,
    analyzer: Arc<Analyzer>,
    store: JobStore,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ScoutServer {
    pub fn new(analyzer: Analyzer, store: JobStore) -> Self {
        Self { tool_router: Self::tool_router(), analyzer: Arc::new(analyzer), store }
    }

    /// Find the internship listing page reachable from a seed URL and derive a validated extraction schema.
    #[tool(
        description = "Analyze an internship job board. Navigates from seed_url to the listing page, performs any search needed, and returns a validated CSS extraction schema. With company set, the schema is stored for scrape_jobs."
    )]
    async fn analyze_job_board(&self, params: Parameters<AnalyzeJobBoardParams>) -> Result<CallToolResult, McpError> {
        analyze_impl(&self.analyzer, &self.store, params.0).await
    }

    #[tool(description = "Discover a company's internship job board URL via web search. Requires a Brave API key.")]
    async fn discover_job_board(&self, params: Parameters<DiscoverJobBoardParams>) -> Result<CallToolResult, McpError> {
        discover_impl(&self.analyzer, params.0).await
    }

    /// Scrape all listing pages with a schema and sync the job store.
    #[tool(
        description = "Scrape internship jobs for a company using the given or stored extraction schema. Stores new jobs, removes jobs no longer listed and returns the run summary."
    )]
    async fn scrape_jobs(&self, params: Parameters<ScrapeJobsParams>) -> Result<CallToolResult, McpError> {
        scrape_impl(&self.analyzer, &self.store, params.0).await
    }
}

impl ServerHandler for ScoutServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "intern-scout".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
