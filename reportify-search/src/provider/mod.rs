//! Search provider adapters
//!
//! One adapter per supported provider. Each adapter owns the normalization
//! from its provider's response shape into [`SearchResponse`]; adding a
//! provider means adding an adapter and a registry entry, nothing else.

use async_trait::async_trait;
use reportify_core::{ReportError, ReportResult, SearchProviderKind, SearchResponse};
use std::collections::HashMap;
use std::time::Duration;

pub mod duckduckgo;
pub mod semantic_scholar;
pub mod tavily;

pub use duckduckgo::DuckDuckGoProvider;
pub use semantic_scholar::SemanticScholarProvider;
pub use tavily::TavilyProvider;

/// Provider options after unknown-key filtering.
pub type ProviderParams = HashMap<String, serde_json::Value>;

/// Capability interface implemented by every search provider.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one batch of queries and return one response per query, in batch
    /// order. A failure affecting a single query is captured inside that
    /// query's response; `Err` is reserved for faults that sink the whole
    /// batch (e.g. a missing API key).
    async fn search(
        &self,
        queries: &[String],
        params: &ProviderParams,
    ) -> ReportResult<Vec<SearchResponse>>;
}

/// Option keys each provider accepts. Anything else in the run
/// configuration is silently dropped before dispatch.
pub fn accepted_params(kind: SearchProviderKind) -> &'static [&'static str] {
    match kind {
        SearchProviderKind::Tavily => &["max_results", "search_topic"],
        SearchProviderKind::SemanticScholar => &["max_results", "fetch_abstracts"],
        SearchProviderKind::DuckDuckGo => &["max_results"],
    }
}

/// Filter a raw provider configuration down to the keys `kind` accepts.
pub fn filter_params(
    kind: SearchProviderKind,
    config: &HashMap<String, serde_json::Value>,
) -> ProviderParams {
    let accepted = accepted_params(kind);
    config
        .iter()
        .filter(|(key, _)| accepted.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Shared HTTP client used by the built-in adapters.
pub fn create_http_client() -> ReportResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("reportify/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| ReportError::search(format!("Failed to build HTTP client: {}", e)))
}

pub(crate) fn param_usize(params: &ProviderParams, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|value| value.as_u64())
        .map(|value| value as usize)
        .unwrap_or(default)
}

pub(crate) fn param_bool(params: &ProviderParams, key: &str, default: bool) -> bool {
    params
        .get(key)
        .and_then(|value| value.as_bool())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_keys_are_dropped_accepted_keys_forwarded() {
        let mut config = HashMap::new();
        config.insert("max_results".to_string(), json!(3));
        config.insert("search_topic".to_string(), json!("news"));
        config.insert("frobnicate".to_string(), json!(true));

        let params = filter_params(SearchProviderKind::Tavily, &config);
        assert_eq!(params.len(), 2);
        assert_eq!(param_usize(&params, "max_results", 5), 3);
        assert!(!params.contains_key("frobnicate"));

        // The same key set filters differently for another provider
        let params = filter_params(SearchProviderKind::DuckDuckGo, &config);
        assert_eq!(params.len(), 1);
        assert!(params.contains_key("max_results"));
    }

    #[test]
    fn missing_params_fall_back_to_defaults() {
        let params = ProviderParams::new();
        assert_eq!(param_usize(&params, "max_results", 5), 5);
        assert!(param_bool(&params, "fetch_abstracts", true));
    }
}
