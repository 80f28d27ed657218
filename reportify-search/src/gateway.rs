//! Search gateway
//!
//! Validates a query batch, filters provider options, dispatches to the
//! selected provider and renders the result digest.

use crate::digest::{format_digest, DEFAULT_TOKENS_PER_SOURCE};
use crate::provider::{
    create_http_client, filter_params, DuckDuckGoProvider, SearchProvider,
    SemanticScholarProvider, TavilyProvider,
};
use reportify_core::{ReportError, ReportResult, SearchProviderKind, SearchQuery};
use std::collections::HashMap;
use tracing::{debug, warn};

pub struct SearchGateway {
    providers: HashMap<SearchProviderKind, Box<dyn SearchProvider>>,
    tokens_per_source: usize,
}

impl SearchGateway {
    /// Gateway with every built-in provider registered. API keys are read
    /// from the environment and only required once a keyed provider is used.
    pub fn new() -> ReportResult<Self> {
        let client = create_http_client()?;
        let mut gateway = Self::empty();
        gateway.register(
            SearchProviderKind::Tavily,
            Box::new(TavilyProvider::from_env(client.clone())),
        );
        gateway.register(
            SearchProviderKind::SemanticScholar,
            Box::new(SemanticScholarProvider::from_env(client.clone())),
        );
        gateway.register(
            SearchProviderKind::DuckDuckGo,
            Box::new(DuckDuckGoProvider::new(client)),
        );
        Ok(gateway)
    }

    /// Gateway with no providers registered; combine with
    /// [`SearchGateway::register`] to swap in custom implementations.
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
            tokens_per_source: DEFAULT_TOKENS_PER_SOURCE,
        }
    }

    pub fn register(&mut self, kind: SearchProviderKind, provider: Box<dyn SearchProvider>) {
        self.providers.insert(kind, provider);
    }

    pub fn with_provider(
        mut self,
        kind: SearchProviderKind,
        provider: Box<dyn SearchProvider>,
    ) -> Self {
        self.register(kind, provider);
        self
    }

    pub fn with_tokens_per_source(mut self, tokens_per_source: usize) -> Self {
        self.tokens_per_source = tokens_per_source;
        self
    }

    /// Run one batch of queries against `kind` and return the rendered
    /// digest. Per-query provider failures are logged and surface as missing
    /// sources, never as an error for the batch.
    pub async fn search(
        &self,
        kind: SearchProviderKind,
        queries: &[SearchQuery],
        provider_config: &HashMap<String, serde_json::Value>,
    ) -> ReportResult<String> {
        if queries.is_empty() {
            return Err(ReportError::validation("Query batch must not be empty"));
        }
        if queries.iter().any(|q| q.query.trim().is_empty()) {
            return Err(ReportError::validation(
                "Query batch must not contain empty queries",
            ));
        }

        let provider = self.providers.get(&kind).ok_or_else(|| {
            ReportError::UnsupportedProvider {
                provider: kind.to_string(),
            }
        })?;

        let params = filter_params(kind, provider_config);
        let query_strings: Vec<String> = queries.iter().map(|q| q.query.clone()).collect();

        debug!(
            provider = %kind,
            batch_size = query_strings.len(),
            "Dispatching search batch"
        );

        let responses = provider.search(&query_strings, &params).await?;

        for response in &responses {
            if let Some(error) = &response.error {
                warn!(query = %response.query, error = %error, "Search query failed");
            }
        }

        Ok(format_digest(
            &responses,
            self.tokens_per_source,
            include_full_content(kind),
        ))
    }
}

/// Whether a provider's digest carries the full source content. Tavily
/// snippets are already distilled, so its digest stays snippet-only.
fn include_full_content(kind: SearchProviderKind) -> bool {
    !matches!(kind, SearchProviderKind::Tavily)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderParams;
    use async_trait::async_trait;
    use reportify_core::{SearchResponse, SearchResult};

    struct StubProvider;

    #[async_trait]
    impl SearchProvider for StubProvider {
        async fn search(
            &self,
            queries: &[String],
            _params: &ProviderParams,
        ) -> ReportResult<Vec<SearchResponse>> {
            Ok(queries
                .iter()
                .map(|query| {
                    SearchResponse::ok(
                        query.clone(),
                        vec![SearchResult {
                            title: format!("Result for {}", query),
                            url: format!("https://example.com/{}", query),
                            snippet: "snippet".to_string(),
                            score: 1.0,
                            full_content: Some("full content".to_string()),
                        }],
                    )
                })
                .collect())
        }
    }

    fn queries(texts: &[&str]) -> Vec<SearchQuery> {
        texts.iter().map(|t| SearchQuery::new(*t)).collect()
    }

    #[tokio::test]
    async fn unregistered_provider_is_unsupported() {
        let gateway = SearchGateway::empty();
        let err = gateway
            .search(
                SearchProviderKind::Tavily,
                &queries(&["anything"]),
                &HashMap::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedProvider { .. }));
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let gateway = SearchGateway::empty()
            .with_provider(SearchProviderKind::DuckDuckGo, Box::new(StubProvider));
        let err = gateway
            .search(SearchProviderKind::DuckDuckGo, &[], &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Validation { .. }));

        let err = gateway
            .search(
                SearchProviderKind::DuckDuckGo,
                &queries(&["ok", "  "]),
                &HashMap::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Validation { .. }));
    }

    #[tokio::test]
    async fn digest_covers_every_query_of_the_batch() {
        let gateway = SearchGateway::empty()
            .with_provider(SearchProviderKind::DuckDuckGo, Box::new(StubProvider));
        let digest = gateway
            .search(
                SearchProviderKind::DuckDuckGo,
                &queries(&["alpha", "beta"]),
                &HashMap::new(),
            )
            .await
            .unwrap();
        assert!(digest.contains("https://example.com/alpha"));
        assert!(digest.contains("https://example.com/beta"));
    }
}
