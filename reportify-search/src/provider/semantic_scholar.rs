//! Semantic Scholar academic-paper adapter
//!
//! Unlike the other adapters this one issues its batch serially with a fixed
//! delay between requests: the public Graph API enforces a strict rate
//! limit, so batch latency grows linearly with batch size.

use super::{param_bool, param_usize, ProviderParams, SearchProvider};
use async_trait::async_trait;
use reportify_core::{ReportError, ReportResult, SearchResponse, SearchResult};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SEARCH_ENDPOINT: &str = "https://api.semanticscholar.org/graph/v1/paper/search";
const DEFAULT_MAX_RESULTS: usize = 5;

/// Pause between successive requests of one batch.
const INTER_REQUEST_DELAY: Duration = Duration::from_secs(3);

pub struct SemanticScholarProvider {
    client: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaperSearchResponse {
    #[serde(default)]
    data: Vec<Paper>,
}

#[derive(Debug, Deserialize)]
struct Paper {
    #[serde(default)]
    title: String,
    url: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    year: Option<i32>,
    venue: Option<String>,
    #[serde(default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    name: String,
}

impl SemanticScholarProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    /// Optional key from `SEMANTIC_SCHOLAR_API_KEY`; the API works without
    /// one at a lower rate limit.
    pub fn from_env(client: reqwest::Client) -> Self {
        Self::new(client, std::env::var("SEMANTIC_SCHOLAR_API_KEY").ok())
    }

    async fn search_one(
        &self,
        query: &str,
        max_results: usize,
        fetch_abstracts: bool,
    ) -> ReportResult<Vec<SearchResult>> {
        let fields = if fetch_abstracts {
            "title,abstract,url,year,venue,authors"
        } else {
            "title,url,year,venue,authors"
        };

        debug!(query, "Dispatching Semantic Scholar search");

        let mut request = self.client.get(SEARCH_ENDPOINT).query(&[
            ("query", query),
            ("limit", &max_results.to_string()),
            ("fields", fields),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ReportError::search(format!("Semantic Scholar request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ReportError::search(format!(
                "Semantic Scholar returned HTTP {}",
                response.status()
            )));
        }

        let body: PaperSearchResponse = response.json().await.map_err(|e| {
            ReportError::search(format!("Failed to parse Semantic Scholar response: {}", e))
        })?;

        // Approximate relevance from list position, as the API returns
        // ranked hits without a score.
        let count = body.data.len();
        let score_decrement = if count > 0 { 1.0 / (count as f64 + 1.0) } else { 0.0 };

        Ok(body
            .data
            .into_iter()
            .enumerate()
            .map(|(i, paper)| {
                let mut snippet_parts = Vec::new();
                if !paper.authors.is_empty() {
                    let names: Vec<&str> =
                        paper.authors.iter().map(|a| a.name.as_str()).collect();
                    snippet_parts.push(format!("Authors: {}", names.join(", ")));
                }
                if let Some(year) = paper.year {
                    snippet_parts.push(format!("Published: {}", year));
                }
                if let Some(venue) = &paper.venue {
                    if !venue.is_empty() {
                        snippet_parts.push(format!("Venue: {}", venue));
                    }
                }

                SearchResult {
                    title: paper.title,
                    url: paper.url.unwrap_or_default(),
                    snippet: snippet_parts.join("\n"),
                    score: 1.0 - (i as f64 * score_decrement),
                    full_content: paper.abstract_text,
                }
            })
            .collect())
    }
}

#[async_trait]
impl SearchProvider for SemanticScholarProvider {
    async fn search(
        &self,
        queries: &[String],
        params: &ProviderParams,
    ) -> ReportResult<Vec<SearchResponse>> {
        let max_results = param_usize(params, "max_results", DEFAULT_MAX_RESULTS);
        let fetch_abstracts = param_bool(params, "fetch_abstracts", true);

        // Serial on purpose: pace requests inside the batch.
        let mut responses = Vec::with_capacity(queries.len());
        for (i, query) in queries.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(INTER_REQUEST_DELAY).await;
            }
            let response = match self.search_one(query, max_results, fetch_abstracts).await {
                Ok(results) => SearchResponse::ok(query.clone(), results),
                Err(e) => SearchResponse::failed(query.clone(), e.to_string()),
            };
            responses.push(response);
        }

        Ok(responses)
    }
}
