//! DuckDuckGo metasearch adapter
//!
//! Uses the Instant Answer endpoint, which needs no API key. Hits are scored
//! positionally since the endpoint returns no relevance score.

use super::{param_usize, ProviderParams, SearchProvider};
use async_trait::async_trait;
use reportify_core::{ReportError, ReportResult, SearchResponse, SearchResult};
use serde::Deserialize;
use tracing::debug;

const SEARCH_ENDPOINT: &str = "https://api.duckduckgo.com/";
const DEFAULT_MAX_RESULTS: usize = 5;

pub struct DuckDuckGoProvider {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct InstantAnswerResponse {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

/// Related topics are either plain entries or named groups of entries. The
/// discriminating fields are required so the untagged variants stay disjoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<TopicEntry>,
    },
    Entry(TopicEntry),
}

#[derive(Debug, Deserialize)]
struct TopicEntry {
    #[serde(rename = "FirstURL")]
    first_url: String,
    #[serde(rename = "Text")]
    text: String,
}

impl DuckDuckGoProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn search_one(&self, query: &str, max_results: usize) -> ReportResult<Vec<SearchResult>> {
        debug!(query, "Dispatching DuckDuckGo search");

        let response = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("no_redirect", "1"),
            ])
            .send()
            .await
            .map_err(|e| ReportError::search(format!("DuckDuckGo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ReportError::search(format!(
                "DuckDuckGo returned HTTP {}",
                response.status()
            )));
        }

        let body: InstantAnswerResponse = response.json().await.map_err(|e| {
            ReportError::search(format!("Failed to parse DuckDuckGo response: {}", e))
        })?;

        let mut entries: Vec<(String, String)> = Vec::new();
        if !body.abstract_text.is_empty() && !body.abstract_url.is_empty() {
            entries.push((body.abstract_url, format!("{}: {}", body.heading, body.abstract_text)));
        }
        for topic in body.related_topics {
            match topic {
                RelatedTopic::Group { topics } => {
                    for entry in topics {
                        if !entry.first_url.is_empty() {
                            entries.push((entry.first_url, entry.text));
                        }
                    }
                }
                RelatedTopic::Entry(entry) => {
                    if !entry.first_url.is_empty() {
                        entries.push((entry.first_url, entry.text));
                    }
                }
            }
        }
        entries.truncate(max_results);

        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(i, (url, text))| SearchResult {
                title: text.chars().take(80).collect(),
                url,
                snippet: text.clone(),
                score: 1.0 - (i as f64 * 0.1),
                full_content: Some(text),
            })
            .collect())
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(
        &self,
        queries: &[String],
        params: &ProviderParams,
    ) -> ReportResult<Vec<SearchResponse>> {
        let max_results = param_usize(params, "max_results", DEFAULT_MAX_RESULTS);

        let batch = queries.iter().map(|query| async move {
            match self.search_one(query, max_results).await {
                Ok(results) => SearchResponse::ok(query.clone(), results),
                Err(e) => SearchResponse::failed(query.clone(), e.to_string()),
            }
        });

        Ok(futures::future::join_all(batch).await)
    }
}
