//! Tavily Search Client
//!
//! In-depth web search through the Tavily REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{SearchClient, SearchHit, SearchRequest};
use crate::error::{Result, SearchError};

/// Tavily configuration
#[derive(Clone, Debug)]
pub struct TavilyConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl TavilyConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.tavily.com".into(),
            timeout_secs: 30,
        }
    }

    /// Read `TAVILY_API_KEY` (required, non-empty) and `TAVILY_BASE_URL`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("TAVILY_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SearchError::Config("TAVILY_API_KEY is not set".into()))?;
        let mut config = Self::new(api_key);
        if let Some(base_url) = lookup("TAVILY_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

pub struct TavilyClient {
    client: reqwest::Client,
    config: TavilyConfig,
}

impl TavilyClient {
    pub fn new(config: TavilyConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(SearchError::Config("Tavily API key is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    include_raw_content: bool,
    search_depth: &'static str,
}

impl<'a> TavilyRequest<'a> {
    fn from_request(request: &'a SearchRequest) -> Self {
        Self {
            query: &request.query,
            max_results: request.max_results,
            include_raw_content: request.include_raw_content,
            search_depth: "advanced",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    raw_content: Option<String>,
}

impl From<TavilyResult> for SearchHit {
    fn from(r: TavilyResult) -> Self {
        Self {
            title: r.title,
            url: r.url,
            content: r.content,
            raw_content: r.raw_content,
        }
    }
}

fn parse_response(body: &str) -> Result<Vec<SearchHit>> {
    let response: TavilyResponse =
        serde_json::from_str(body).map_err(|e| SearchError::Parse(e.to_string()))?;
    Ok(response.results.into_iter().map(SearchHit::from).collect())
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));
        tracing::debug!(query = %request.query, max_results = request.max_results, "Tavily search");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&TavilyRequest::from_request(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(%status, "Tavily returned error");
            return Err(SearchError::from_status(status.as_u16(), body));
        }
        parse_response(&body)
    }

    async fn health_check(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn name(&self) -> &str {
        "Tavily"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let mut request = SearchRequest::new("jamf market share");
        request.max_results = 15;
        request.include_raw_content = true;

        let json = serde_json::to_value(TavilyRequest::from_request(&request)).unwrap();
        assert_eq!(json["query"], "jamf market share");
        assert_eq!(json["max_results"], 15);
        assert_eq!(json["include_raw_content"], true);
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "query": "jamf",
            "results": [
                {"title": "Jamf", "url": "https://jamf.com", "content": "MDM vendor", "score": 0.9, "raw_content": null},
                {"title": "Wiki", "url": "https://en.wikipedia.org/wiki/Jamf", "content": "Founded 2002", "raw_content": "Long page"}
            ]
        }"#;

        let hits = parse_response(body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].raw_content, None);
        assert_eq!(hits[1].raw_content.as_deref(), Some("Long page"));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_response("<html>"), Err(SearchError::Parse(_))));
    }

    #[test]
    fn test_config_from_lookup() {
        let config = TavilyConfig::from_lookup(|key| match key {
            "TAVILY_API_KEY" => Some("tvly-test".into()),
            "TAVILY_BASE_URL" => Some("http://localhost:8080".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.api_key, "tvly-test");
        assert_eq!(config.base_url, "http://localhost:8080");

        let err = TavilyConfig::from_lookup(|key| (key == "TAVILY_API_KEY").then(String::new)).unwrap_err();
        assert!(matches!(err, SearchError::Config(msg) if msg.contains("TAVILY_API_KEY")));
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            TavilyClient::new(TavilyConfig::new("  ")),
            Err(SearchError::Config(_))
        ));
    }
}
