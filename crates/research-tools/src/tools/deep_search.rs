//! Deep Search Tool
//!
//! Multi-source search for complex or multi-hop research. Results come back
//! as numbered source blocks.

use async_trait::async_trait;
use std::sync::Arc;

use agent_core::{AgentError, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema};

use crate::search::{SearchClient, SearchRequest, format_sources};

pub const DEEP_SEARCH_TOOL: &str = "deep_search";

const DEFAULT_MAX_RESULTS: u64 = 15;

/// Tool for in-depth web research
pub struct DeepSearchTool {
    client: Arc<dyn SearchClient>,
}

impl DeepSearchTool {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client }
    }

    fn request(call: &ToolCall) -> CoreResult<SearchRequest> {
        let query = call.require_str("query")?;
        let max_results = call.u64_arg("max_results").unwrap_or(DEFAULT_MAX_RESULTS);
        if max_results == 0 {
            return Err(AgentError::ToolValidation("'max_results' must be at least 1".into()));
        }

        Ok(SearchRequest {
            query: query.to_string(),
            max_results: usize::try_from(max_results).unwrap_or(usize::MAX),
            include_raw_content: call.bool_arg("include_raw_content").unwrap_or(true),
            include_links: call.bool_arg("include_links").unwrap_or(true),
        })
    }
}

#[async_trait]
impl Tool for DeepSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: DEEP_SEARCH_TOOL.into(),
            description: "Perform an in-depth web search. Intended for complex or multi-hop research \
                such as market analysis, technical deep dives, or report generation."
                .into(),
            parameters: vec![
                ParameterSchema::required("query", "string", "The research query to search for"),
                ParameterSchema::optional(
                    "max_results",
                    "integer",
                    "Maximum number of search results to retrieve",
                    DEFAULT_MAX_RESULTS.into(),
                ),
                ParameterSchema::optional(
                    "include_raw_content",
                    "boolean",
                    "Whether to include raw page content",
                    true.into(),
                ),
                ParameterSchema::optional(
                    "include_links",
                    "boolean",
                    "Whether to include source links in the results",
                    true.into(),
                ),
            ],
            external: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let request = Self::request(call)?;

        let hits = self
            .client
            .search(&request)
            .await
            .map_err(|e| AgentError::tool(DEEP_SEARCH_TOOL, e))?;

        tracing::debug!(backend = self.client.name(), hits = hits.len(), "Deep search complete");
        let output = format_sources(&hits, request.include_raw_content, request.include_links);
        Ok(ToolResult::success(DEEP_SEARCH_TOOL, output))
    }
}
