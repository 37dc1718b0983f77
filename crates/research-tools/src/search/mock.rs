//! Mock Search Client
//!
//! For testing and demo purposes. Returns static results and records queries.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{SearchClient, SearchHit, SearchRequest};
use crate::error::{Result, SearchError};

/// Mock search client with canned hits
pub struct MockSearchClient {
    hits: Vec<SearchHit>,
    fail_with: Option<u16>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl Default for MockSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearchClient {
    pub fn new() -> Self {
        Self::with_hits(vec![
            SearchHit::new(
                "Jamf | Apple Enterprise Management",
                "https://www.jamf.com/",
                "Jamf helps organizations manage and secure Apple devices.",
            )
            .with_raw_content("Jamf is the standard in Apple enterprise management, used by schools and businesses."),
            SearchHit::new(
                "Jamf - Wikipedia",
                "https://en.wikipedia.org/wiki/Jamf",
                "Jamf is a software company founded in 2002 in Eau Claire, Wisconsin.",
            ),
        ])
    }

    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            fail_with: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every search fails with this HTTP status
    pub fn failing(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            ..Self::with_hits(Vec::new())
        }
    }

    /// Requests seen so far
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(status) = self.fail_with {
            return Err(SearchError::from_status(status, "mock failure".into()));
        }
        Ok(self.hits.iter().take(request.max_results).cloned().collect())
    }

    async fn health_check(&self) -> bool {
        self.fail_with.is_none()
    }

    fn name(&self) -> &str {
        "MockSearch"
    }
}
