//! Search Integration
//!
//! Abstractions and implementations for web search backends.

mod duckduckgo;
mod mock;
mod tavily;

pub use duckduckgo::DuckDuckGoClient;
pub use mock::MockSearchClient;
pub use tavily::{TavilyClient, TavilyConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::error::Result;

pub const NO_RESULTS_MESSAGE: &str =
    "No valid search results found. Please try different search queries or use a different search API.";

/// Search request options
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: usize,
    pub include_raw_content: bool,
    pub include_links: bool,
}

impl SearchRequest {
    /// Plain query with backend defaults
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: 5,
            include_raw_content: false,
            include_links: true,
        }
    }
}

/// One search result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            raw_content: None,
        }
    }

    #[must_use]
    pub fn with_raw_content(mut self, raw: impl Into<String>) -> Self {
        self.raw_content = Some(raw.into());
        self
    }
}

/// Search client trait (Strategy pattern)
///
/// Implement this for each backend: DuckDuckGo, Tavily, Brave, etc.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run a query
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Backend name
    fn name(&self) -> &str;
}

/// Snippets joined into a single blob
pub fn format_snippets(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_RESULTS_MESSAGE.to_string();
    }
    hits.iter()
        .map(|h| h.content.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Numbered source blocks
///
/// Hits without a URL are skipped; later duplicates of a URL are dropped.
pub fn format_sources(hits: &[SearchHit], include_raw_content: bool, include_links: bool) -> String {
    let mut seen = std::collections::HashSet::new();
    let unique: Vec<_> = hits
        .iter()
        .filter(|h| !h.url.is_empty() && seen.insert(h.url.as_str()))
        .collect();

    if unique.is_empty() {
        return NO_RESULTS_MESSAGE.to_string();
    }

    let mut out = String::from("Search results: \n\n");
    for (i, hit) in unique.iter().enumerate() {
        let body = match &hit.raw_content {
            Some(raw) if include_raw_content && !raw.trim().is_empty() => raw.as_str(),
            _ => hit.content.as_str(),
        };
        let _ = write!(out, "\n\n--- SOURCE {}: {} ---\n", i + 1, hit.title);
        if include_links {
            let _ = write!(out, "URL: {}\n\n", hit.url);
        }
        let _ = write!(out, "SUMMARY:\n{body}\n\n");
        out.push_str(&"-".repeat(80));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits() -> Vec<SearchHit> {
        vec![
            SearchHit::new("Jamf", "https://jamf.com", "Apple device management.")
                .with_raw_content("Jamf Pro manages Macs, iPads and iPhones."),
            SearchHit::new("Jamf again", "https://jamf.com", "duplicate"),
            SearchHit::new("No url", "", "dropped"),
            SearchHit::new("Wiki", "https://en.wikipedia.org/wiki/Jamf", "Founded in 2002."),
        ]
    }

    #[test]
    fn test_sources_numbered_and_deduplicated() {
        let out = format_sources(&hits(), false, true);
        assert!(out.starts_with("Search results:"));
        assert!(out.contains("--- SOURCE 1: Jamf ---\nURL: https://jamf.com\n\nSUMMARY:\nApple device management."));
        assert!(out.contains("--- SOURCE 2: Wiki ---"));
        assert!(!out.contains("SOURCE 3"));
        assert!(!out.contains("duplicate"));
    }

    #[test]
    fn test_sources_raw_content_and_links() {
        let out = format_sources(&hits(), true, false);
        assert!(out.contains("Jamf Pro manages Macs"));
        assert!(!out.contains("URL:"));
    }

    #[test]
    fn test_empty_results_message() {
        assert_eq!(format_sources(&[], true, true), NO_RESULTS_MESSAGE);
        assert_eq!(format_snippets(&[]), NO_RESULTS_MESSAGE);
    }

    #[test]
    fn test_snippets_joined() {
        assert_eq!(
            format_snippets(&hits()[..2]),
            "Apple device management. duplicate"
        );
    }
}
