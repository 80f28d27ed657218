//! Reportify Search - uniform gateway over web/academic/metasearch providers
//!
//! A batch of query strings goes in, a deduplicated bounded text digest
//! comes out. Provider responses are normalized into one record shape and a
//! failure for one query never aborts the rest of the batch.

pub mod digest;
pub mod gateway;
pub mod provider;

pub use digest::{format_digest, DEFAULT_TOKENS_PER_SOURCE, TRUNCATION_MARKER};
pub use gateway::SearchGateway;
pub use provider::{
    DuckDuckGoProvider, ProviderParams, SearchProvider, SemanticScholarProvider, TavilyProvider,
};
