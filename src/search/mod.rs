//! Web Search Providers
//!
//! The research step retrieves external documents through the [`WebSearch`]
//! trait. The bundled implementation is [`tavily::TavilyClient`], an HTTP
//! client for the Tavily search API (or any service with the same contract).

/// Tavily search API client.
pub mod tavily;

pub use tavily::TavilyClient;

use crate::types::{Result, SearchResult};
use async_trait::async_trait;

/// A web search backend.
///
/// Results come back in the provider's relevance order and that order is
/// preserved through the rest of the run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Search the web for `query`, returning at most `max_results` results
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;

    /// Short provider name used in progress events
    fn name(&self) -> &str;
}

/// Host part of a URL, without a leading `www.`
pub fn host_of(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.trim_start_matches("www.").to_string())
}
