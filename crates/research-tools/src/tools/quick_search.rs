//! Quick Search Tool
//!
//! Snippet search for simple, factual queries.

use async_trait::async_trait;
use std::sync::Arc;

use agent_core::{AgentError, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema};

use crate::search::{SearchClient, SearchRequest, format_snippets};

pub const QUICK_SEARCH_TOOL: &str = "quick_search";

/// Tool for quick web lookups
pub struct QuickSearchTool {
    client: Arc<dyn SearchClient>,
    max_results: usize,
}

impl QuickSearchTool {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client, max_results: 10 }
    }
}

#[async_trait]
impl Tool for QuickSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: QUICK_SEARCH_TOOL.into(),
            description: "Perform a quick web search. Useful for simple, factual queries or checking \
                current events where deep analysis is not required."
                .into(),
            parameters: vec![ParameterSchema::required("query", "string", "The search query string")],
            external: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let query = call.require_str("query")?;
        let request = SearchRequest {
            max_results: self.max_results,
            ..SearchRequest::new(query)
        };

        let hits = self
            .client
            .search(&request)
            .await
            .map_err(|e| AgentError::tool(QUICK_SEARCH_TOOL, e))?;

        tracing::debug!(backend = self.client.name(), hits = hits.len(), "Quick search complete");
        Ok(ToolResult::success(QUICK_SEARCH_TOOL, format_snippets(&hits)))
    }
}
