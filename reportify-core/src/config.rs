//! Run configuration
//!
//! Precedence for every recognized option: explicit per-run override >
//! process environment (`REPORTIFY_*`) > built-in default.

use crate::error::{ReportError, ReportResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Built-in report organization used when no template is configured.
pub const DEFAULT_REPORT_STRUCTURE: &str = "\
Use this structure to create a report on the user-provided topic:

1. Introduction (no research needed)
   - Brief overview of the topic area

2. Main Body Sections:
   - Each section should focus on a sub-topic of the user-provided topic

3. Conclusion
   - Aim for 1 structural element (either a list or table) that distills the main body sections
   - Provide a concise summary of the report";

/// Closed set of supported search providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchProviderKind {
    /// Web search
    Tavily,
    /// Academic-paper search
    SemanticScholar,
    /// Metasearch
    DuckDuckGo,
}

impl SearchProviderKind {
    pub const ALL: [SearchProviderKind; 3] = [
        SearchProviderKind::Tavily,
        SearchProviderKind::SemanticScholar,
        SearchProviderKind::DuckDuckGo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchProviderKind::Tavily => "tavily",
            SearchProviderKind::SemanticScholar => "semantic-scholar",
            SearchProviderKind::DuckDuckGo => "duckduckgo",
        }
    }
}

impl std::fmt::Display for SearchProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SearchProviderKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tavily" => Ok(SearchProviderKind::Tavily),
            "semantic-scholar" | "semantic_scholar" | "semanticscholar" => {
                Ok(SearchProviderKind::SemanticScholar)
            }
            "duckduckgo" => Ok(SearchProviderKind::DuckDuckGo),
            other => Err(ReportError::UnsupportedProvider {
                provider: other.to_string(),
            }),
        }
    }
}

/// Reference to an LLM backend as `provider/model`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    pub fn new<P: Into<String>, M: Into<String>>(provider: P, model: M) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

impl FromStr for ModelRef {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
                Ok(Self::new(provider, model))
            }
            _ => Err(ReportError::config(format!(
                "Invalid model reference '{}', expected 'provider/model'",
                s
            ))),
        }
    }
}

/// Configuration for one report run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Report organization template handed to the planner
    pub report_structure: String,
    /// Iteration ceiling for the per-section research loop
    pub max_search_depth: usize,
    /// Queries generated per planning/research pass
    pub number_of_queries: usize,
    /// Model used for planning and grading
    pub planner_model: ModelRef,
    /// Model used for drafting section content
    pub writer_model: ModelRef,
    pub search_provider: SearchProviderKind,
    /// Provider-specific options; unknown keys are dropped at dispatch
    #[serde(default)]
    pub search_provider_config: HashMap<String, serde_json::Value>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            report_structure: DEFAULT_REPORT_STRUCTURE.to_string(),
            max_search_depth: 2,
            number_of_queries: 2,
            planner_model: ModelRef::new("openai", "gpt-4o-mini"),
            writer_model: ModelRef::new("openai", "gpt-4o-mini"),
            search_provider: SearchProviderKind::Tavily,
            search_provider_config: HashMap::new(),
        }
    }
}

/// Per-run overrides; `None` fields fall through to environment/defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOverrides {
    pub report_structure: Option<String>,
    pub max_search_depth: Option<usize>,
    pub number_of_queries: Option<usize>,
    pub planner_model: Option<ModelRef>,
    pub writer_model: Option<ModelRef>,
    pub search_provider: Option<SearchProviderKind>,
    pub search_provider_config: Option<HashMap<String, serde_json::Value>>,
}

impl RunConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ReportResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReportError::config(format!("Failed to read config file: {}", e)))?;

        let config: RunConfig = toml::from_str(&content)
            .map_err(|e| ReportError::config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ReportResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReportError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ReportError::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Overlay `REPORTIFY_*` environment variables onto this configuration.
    pub fn apply_env(&mut self) -> ReportResult<()> {
        if let Ok(value) = std::env::var("REPORTIFY_REPORT_STRUCTURE") {
            self.report_structure = value;
        }
        if let Ok(value) = std::env::var("REPORTIFY_MAX_SEARCH_DEPTH") {
            self.max_search_depth = value.parse().map_err(|_| {
                ReportError::config(format!("Invalid REPORTIFY_MAX_SEARCH_DEPTH: {}", value))
            })?;
        }
        if let Ok(value) = std::env::var("REPORTIFY_NUMBER_OF_QUERIES") {
            self.number_of_queries = value.parse().map_err(|_| {
                ReportError::config(format!("Invalid REPORTIFY_NUMBER_OF_QUERIES: {}", value))
            })?;
        }
        if let Ok(value) = std::env::var("REPORTIFY_PLANNER_MODEL") {
            self.planner_model = value.parse()?;
        }
        if let Ok(value) = std::env::var("REPORTIFY_WRITER_MODEL") {
            self.writer_model = value.parse()?;
        }
        if let Ok(value) = std::env::var("REPORTIFY_SEARCH_PROVIDER") {
            self.search_provider = value.parse()?;
        }
        Ok(())
    }

    /// Apply explicit per-run overrides on top of this configuration.
    pub fn apply_overrides(&mut self, overrides: &RunOverrides) {
        if let Some(value) = &overrides.report_structure {
            self.report_structure = value.clone();
        }
        if let Some(value) = overrides.max_search_depth {
            self.max_search_depth = value;
        }
        if let Some(value) = overrides.number_of_queries {
            self.number_of_queries = value;
        }
        if let Some(value) = &overrides.planner_model {
            self.planner_model = value.clone();
        }
        if let Some(value) = &overrides.writer_model {
            self.writer_model = value.clone();
        }
        if let Some(value) = overrides.search_provider {
            self.search_provider = value;
        }
        if let Some(value) = &overrides.search_provider_config {
            self.search_provider_config = value.clone();
        }
    }

    /// Resolve the effective configuration: defaults (or a file), then the
    /// environment, then explicit overrides, validated.
    pub fn layered<P: AsRef<Path>>(
        file: Option<P>,
        overrides: &RunOverrides,
    ) -> ReportResult<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ReportResult<()> {
        if self.max_search_depth == 0 {
            return Err(ReportError::config(
                "max_search_depth must be greater than 0",
            ));
        }
        if self.number_of_queries == 0 {
            return Err(ReportError::config(
                "number_of_queries must be greater than 0",
            ));
        }
        if self.report_structure.trim().is_empty() {
            return Err(ReportError::config("report_structure must not be empty"));
        }
        Ok(())
    }
}
