//! Digest rendering
//!
//! Turns a batch of normalized search responses into the bounded text block
//! handed to the LLM: one block per unique URL, with full content capped per
//! source.

use reportify_core::{SearchResponse, SearchResult};
use std::collections::HashMap;
use tracing::warn;

pub const DEFAULT_TOKENS_PER_SOURCE: usize = 4000;
pub const TRUNCATION_MARKER: &str = "... [truncated]";
pub const EMPTY_CONTENT_MARKER: &str = "[no content extracted]";

/// Merge results across the whole batch, deduplicating by URL. A duplicate
/// keeps the position of its first occurrence but the content of the last.
pub fn dedupe_results(responses: &[SearchResponse]) -> Vec<SearchResult> {
    let mut ordered: Vec<SearchResult> = Vec::new();
    let mut index_by_url: HashMap<String, usize> = HashMap::new();

    for response in responses {
        for result in &response.results {
            match index_by_url.get(&result.url) {
                Some(&i) => ordered[i] = result.clone(),
                None => {
                    index_by_url.insert(result.url.clone(), ordered.len());
                    ordered.push(result.clone());
                }
            }
        }
    }

    ordered
}

/// Cap `content` at `max_chars` characters, appending the truncation marker
/// when something was cut.
fn bounded_content(content: &str, max_chars: usize) -> String {
    if content.chars().count() > max_chars {
        let mut cut: String = content.chars().take(max_chars).collect();
        cut.push_str(TRUNCATION_MARKER);
        cut
    } else {
        content.to_string()
    }
}

/// Render the deduplicated batch as a structured text digest.
///
/// `max_chars_per_source` is `tokens_per_source * 4` (rough estimate of 4
/// characters per token). Sources without extracted content still get a
/// block, with an explicit empty-content marker.
pub fn format_digest(
    responses: &[SearchResponse],
    tokens_per_source: usize,
    include_full_content: bool,
) -> String {
    let max_chars_per_source = tokens_per_source * 4;
    let sources = dedupe_results(responses);

    let mut digest = String::from("Content from sources:\n");
    for source in &sources {
        let title = if source.title.is_empty() {
            "Untitled"
        } else {
            source.title.as_str()
        };

        digest.push_str(&"=".repeat(80));
        digest.push('\n');
        digest.push_str(&format!("Source: {}\n", title));
        digest.push_str(&"-".repeat(80));
        digest.push('\n');
        digest.push_str(&format!("URL: {}\n===\n", source.url));
        digest.push_str(&format!(
            "Most relevant content from source: {}\n===\n",
            source.snippet
        ));

        if include_full_content {
            let content = match source.full_content.as_deref() {
                Some(full) if !full.is_empty() => bounded_content(full, max_chars_per_source),
                _ => {
                    warn!(url = %source.url, "No full content extracted for source");
                    EMPTY_CONTENT_MARKER.to_string()
                }
            };
            digest.push_str(&format!(
                "Full source content limited to {} tokens: {}\n\n",
                tokens_per_source, content
            ));
        }

        digest.push_str(&"=".repeat(80));
        digest.push_str("\n\n");
    }

    digest.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(url: &str, title: &str, snippet: &str, full: Option<&str>) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            url: url.to_string(),
            snippet: snippet.to_string(),
            score: 0.5,
            full_content: full.map(|s| s.to_string()),
        }
    }

    #[test]
    fn duplicate_urls_collapse_to_one_block_last_write_wins() {
        let responses = vec![
            SearchResponse::ok(
                "q1",
                vec![
                    result("https://a.example", "First title", "first snippet", None),
                    result("https://b.example", "Other", "other snippet", None),
                ],
            ),
            SearchResponse::ok(
                "q2",
                vec![result(
                    "https://a.example",
                    "Second title",
                    "second snippet",
                    None,
                )],
            ),
        ];

        let deduped = dedupe_results(&responses);
        assert_eq!(deduped.len(), 2);
        // First-seen position, last-seen content
        assert_eq!(deduped[0].url, "https://a.example");
        assert_eq!(deduped[0].title, "Second title");
        assert_eq!(deduped[0].snippet, "second snippet");

        let digest = format_digest(&responses, 100, false);
        assert_eq!(digest.matches("URL: https://a.example").count(), 1);
        assert!(digest.contains("Source: Second title"));
        assert!(!digest.contains("first snippet"));
    }

    #[test]
    fn over_limit_content_is_cut_to_exactly_the_cap_plus_marker() {
        let tokens = 2; // 8-character cap
        let max_chars = tokens * 4;
        let long = "abcdefghij"; // 10 chars
        let responses = vec![SearchResponse::ok(
            "q",
            vec![result("https://a.example", "T", "s", Some(long))],
        )];

        let digest = format_digest(&responses, tokens, true);
        let expected: String = long.chars().take(max_chars).collect();
        assert!(digest.contains(&format!("{}{}", expected, TRUNCATION_MARKER)));
        assert!(!digest.contains(long));
    }

    #[test]
    fn at_or_under_limit_content_is_unmodified() {
        let tokens = 3; // 12-character cap
        let exact = "0123456789ab"; // exactly 12 chars
        let responses = vec![SearchResponse::ok(
            "q",
            vec![result("https://a.example", "T", "s", Some(exact))],
        )];

        let digest = format_digest(&responses, tokens, true);
        assert!(digest.contains(exact));
        assert!(!digest.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn sources_without_content_get_the_empty_marker() {
        let responses = vec![SearchResponse::ok(
            "q",
            vec![result("https://a.example", "T", "s", None)],
        )];

        let digest = format_digest(&responses, 10, true);
        assert!(digest.contains(EMPTY_CONTENT_MARKER));
    }

    #[test]
    fn failed_queries_contribute_no_blocks_but_do_not_poison_the_batch() {
        let responses = vec![
            SearchResponse::failed("q1", "HTTP 500"),
            SearchResponse::ok(
                "q2",
                vec![result("https://b.example", "Alive", "ok", None)],
            ),
        ];

        let digest = format_digest(&responses, 10, false);
        assert!(digest.contains("https://b.example"));
        assert_eq!(digest.matches("URL:").count(), 1);
    }
}
