//! Shared data model for report generation

use serde::{Deserialize, Serialize};

/// One planned unit of the report.
///
/// Created by the planner with empty `content`; written once by the section
/// researcher (research sections) or the compiler (synthesis sections). A
/// failing grade triggers an explicit re-research pass that rewrites the
/// draft, never a silent overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Name for this section of the report, unique within a plan
    pub name: String,
    /// Brief overview of the main topics covered by this section
    pub description: String,
    /// Whether web research is needed for this section
    pub research: bool,
    /// The written content of the section, empty until drafted
    #[serde(default)]
    pub content: String,
}

impl Section {
    pub fn is_written(&self) -> bool {
        !self.content.is_empty()
    }
}

/// A single query string wrapped for batching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

impl SearchQuery {
    pub fn new<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
        }
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.query)
    }
}

/// Normalized search record, one shape for every provider.
///
/// `score` is provider-relative relevance and is not comparable across
/// providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    /// Deduplication key
    pub url: String,
    /// Short relevance excerpt
    pub snippet: String,
    pub score: f64,
    /// Full page/document content when the provider returns it
    pub full_content: Option<String>,
}

/// Provider response for one query of a batch.
///
/// A provider-level failure for a single query is captured in `error` with
/// empty `results`; the rest of the batch is unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn ok<S: Into<String>>(query: S, results: Vec<SearchResult>) -> Self {
        Self {
            query: query.into(),
            results,
            error: None,
        }
    }

    pub fn failed<S: Into<String>, E: Into<String>>(query: S, error: E) -> Self {
        Self {
            query: query.into(),
            results: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Grading outcome for one section draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Pass,
    Fail,
}

/// Grader verdict plus the follow-up queries to run when the draft fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub grade: Grade,
    #[serde(default)]
    pub follow_up_queries: Vec<SearchQuery>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_written_state_follows_content() {
        let mut section = Section {
            name: "Background".to_string(),
            description: "Context for the topic".to_string(),
            research: true,
            content: String::new(),
        };
        assert!(!section.is_written());
        section.content = "## Background\n...".to_string();
        assert!(section.is_written());
    }

    #[test]
    fn feedback_deserializes_with_lowercase_grade() {
        let feedback: Feedback = serde_json::from_str(
            r#"{"grade": "fail", "follow_up_queries": [{"query": "rust async runtimes"}]}"#,
        )
        .unwrap();
        assert_eq!(feedback.grade, Grade::Fail);
        assert_eq!(feedback.follow_up_queries.len(), 1);
    }

    #[test]
    fn feedback_follow_ups_default_to_empty() {
        let feedback: Feedback = serde_json::from_str(r#"{"grade": "pass"}"#).unwrap();
        assert_eq!(feedback.grade, Grade::Pass);
        assert!(feedback.follow_up_queries.is_empty());
    }
}
