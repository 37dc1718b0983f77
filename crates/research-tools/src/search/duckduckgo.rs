//! DuckDuckGo Search Client
//!
//! Scrapes the HTML endpoint; no API key needed.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use super::{SearchClient, SearchHit, SearchRequest};
use crate::error::{Result, SearchError};

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

pub struct DuckDuckGoClient {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoClient {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; research-agent/0.1)")
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SearchClient for DuckDuckGoClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let url = format!("{}?q={}", self.endpoint, urlencoding::encode(&request.query));
        tracing::debug!(query = %request.query, "DuckDuckGo search");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::from_status(status.as_u16(), body));
        }

        let html = response.text().await?;
        Ok(extract_results(&html, request.max_results))
    }

    async fn health_check(&self) -> bool {
        self.client
            .head(&self.endpoint)
            .send()
            .await
            .is_ok_and(|r| !r.status().is_server_error())
    }

    fn name(&self) -> &str {
        "DuckDuckGo"
    }
}

/// Pull result blocks out of the result page
fn extract_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let (Some(body), Some(title), Some(snippet), Some(url)) = (
        selector(".result__body"),
        selector(".result__a"),
        selector(".result__snippet"),
        selector(".result__url"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&body)
        .filter_map(|result| {
            let title = text_of(result, &title)?;
            let snippet = text_of(result, &snippet).unwrap_or_default();
            let url = text_of(result, &url).unwrap_or_default();
            Some(SearchHit::new(title, url, snippet))
        })
        .take(limit)
        .collect()
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Whitespace-normalized text of the first element matching `selector`
fn text_of(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let text = element
        .select(selector)
        .next()?
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}
