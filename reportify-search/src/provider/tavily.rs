//! Tavily web-search adapter

use super::{param_usize, ProviderParams, SearchProvider};
use async_trait::async_trait;
use reportify_core::{ReportError, ReportResult, SearchResponse, SearchResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const DEFAULT_MAX_RESULTS: usize = 5;

/// Tavily adapter. The whole batch is dispatched concurrently; Tavily has no
/// per-request pacing requirement.
pub struct TavilyProvider {
    client: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    include_raw_content: bool,
    topic: &'a str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Debug, Deserialize)]
struct TavilyHit {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f64,
    raw_content: Option<String>,
}

impl TavilyProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    /// Read the API key from `TAVILY_API_KEY`. The key is checked at search
    /// time so a gateway can be built without credentials for providers the
    /// run never uses.
    pub fn from_env(client: reqwest::Client) -> Self {
        Self::new(client, std::env::var("TAVILY_API_KEY").ok())
    }

    async fn search_one(
        &self,
        api_key: &str,
        query: &str,
        max_results: usize,
        topic: &str,
    ) -> ReportResult<Vec<SearchResult>> {
        let request = TavilyRequest {
            api_key,
            query,
            max_results,
            include_raw_content: true,
            topic,
        };

        debug!(query, "Dispatching Tavily search");

        let response = self
            .client
            .post(TAVILY_ENDPOINT)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReportError::search(format!("Tavily request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ReportError::search(format!(
                "Tavily returned HTTP {}",
                response.status()
            )));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ReportError::search(format!("Failed to parse Tavily response: {}", e)))?;

        Ok(body
            .results
            .into_iter()
            .map(|hit| SearchResult {
                title: hit.title,
                url: hit.url,
                snippet: hit.content,
                score: hit.score,
                full_content: hit.raw_content,
            })
            .collect())
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    async fn search(
        &self,
        queries: &[String],
        params: &ProviderParams,
    ) -> ReportResult<Vec<SearchResponse>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ReportError::config("TAVILY_API_KEY is not set"))?;

        let max_results = param_usize(params, "max_results", DEFAULT_MAX_RESULTS);
        let topic = params
            .get("search_topic")
            .and_then(|value| value.as_str())
            .unwrap_or("general")
            .to_string();

        let batch = queries.iter().map(|query| {
            let topic = topic.clone();
            async move {
                match self.search_one(api_key, query, max_results, &topic).await {
                    Ok(results) => SearchResponse::ok(query.clone(), results),
                    Err(e) => SearchResponse::failed(query.clone(), e.to_string()),
                }
            }
        });

        Ok(futures::future::join_all(batch).await)
    }
}
