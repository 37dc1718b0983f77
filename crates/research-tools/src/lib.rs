//! # research-tools
//!
//! Web search and reflection tools for the research agent.
//!
//! ## Tool Set
//!
//! ```text
//! ┌────────────────┬──────────────────────┬──────────────────────────────┐
//! │ quick_search   │ SearchClient (DDG)   │ snippet blob, simple facts   │
//! │ deep_search    │ SearchClient (Tavily)│ numbered SOURCE blocks       │
//! │ think          │ none                 │ "Reflection recorded: ..."   │
//! └────────────────┴──────────────────────┴──────────────────────────────┘
//! ```
//!
//! Search backends sit behind [`search::SearchClient`], so tests and demos
//! run against [`search::MockSearchClient`].

pub mod error;
pub mod search;
pub mod tools;

use std::sync::Arc;

use agent_core::ToolRegistry;

pub use error::{Result, SearchError};
pub use search::{SearchClient, SearchHit, SearchRequest};
pub use tools::{DeepSearchTool, QuickSearchTool, ThinkTool};

/// System prompt for the research agent
pub const RESEARCH_AGENT_PROMPT: &str = r"You are a research assistant conducting research on the user's input topic.

## Task

Use the tools to gather information that answers the research brief. You can call tools in series or in parallel; your research runs in a tool-calling loop.

## Tools Available

- `quick_search` - Fast web search for simple facts and current events
- `deep_search` - In-depth multi-source search with full page content
- `think` - Reflect on what you have found and plan next steps

## How to Research

1. Read the question carefully. What specific information is needed?
2. Start with broader searches, then narrow down as gaps appear
3. After each search, use `think` to assess: what did I find, what is missing?
4. Stop when you can answer confidently

## Hard Limits

- Simple queries: 1-2 search calls at most
- Complex queries: up to 3 search calls
- Stop immediately if your last two searches returned similar information

When you have enough information, reply with your answer and do not call any tool.";

/// Registry with the three research tools
pub fn default_registry(quick: Arc<dyn SearchClient>, deep: Arc<dyn SearchClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(QuickSearchTool::new(quick));
    registry.register(DeepSearchTool::new(deep));
    registry.register(ThinkTool);
    registry
}
