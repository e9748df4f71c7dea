//! Tavily search client
//!
//! Sends `POST {base_url}/search` with a bearer token and maps the returned
//! `results` array onto [`SearchResult`]s.

use super::{WebSearch, host_of};
use crate::types::{AppError, Result, SearchResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    source: Option<String>,
}

impl From<RawResult> for SearchResult {
    fn from(raw: RawResult) -> Self {
        let source = raw
            .source
            .filter(|s| !s.trim().is_empty())
            .or_else(|| host_of(&raw.url))
            .unwrap_or_else(|| "Unknown".to_string());

        SearchResult {
            title: if raw.title.trim().is_empty() {
                "Untitled".to_string()
            } else {
                raw.title
            },
            url: raw.url,
            snippet: raw.content,
            source,
        }
    }
}

/// HTTP client for the Tavily search API
pub struct TavilyClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    search_depth: String,
}

impl TavilyClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            search_depth: "basic".to_string(),
        })
    }

    pub fn with_search_depth(mut self, depth: impl Into<String>) -> Self {
        self.search_depth = depth.into();
        self
    }
}

#[async_trait]
impl WebSearch for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput("Search query is empty".to_string()));
        }

        let body = SearchRequest {
            query,
            max_results,
            search_depth: &self.search_depth,
            include_answer: false,
        };

        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Search(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Search(format!(
                "Provider returned {}: {}",
                status,
                detail.trim()
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("Invalid response body: {}", e)))?;

        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .map(SearchResult::from)
            .collect())
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
