//! LLM backend seam
//!
//! The workflow talks to language models through [`LanguageModel`], a single
//! system+user completion call. [`SiumaiModel`] implements it over the siumai
//! multi-provider client; tests substitute scripted implementations.
//!
//! Structured outputs (section lists, query lists, grading feedback) are
//! requested as JSON in the prompt and validated here; output that fails
//! schema validation surfaces as [`ReportError::MalformedOutput`]. The core
//! never retries an LLM call - retry policy belongs to the caller.

use async_trait::async_trait;
use reportify_core::{Feedback, ModelRef, ReportError, ReportResult, SearchQuery, Section};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use siumai::prelude::*;
use std::collections::HashSet;
use tracing::debug;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion with a system prompt and a user message, returning
    /// the model's text output.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> ReportResult<String>;
}

/// siumai-backed model selected by a `provider/model` reference.
pub struct SiumaiModel {
    client: Box<dyn LlmClient>,
    model: ModelRef,
}

impl SiumaiModel {
    /// Build a client for the referenced backend. API keys come from the
    /// environment (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `GROQ_API_KEY`);
    /// Ollama needs none.
    pub async fn connect(model: ModelRef) -> ReportResult<Self> {
        let client = Self::build_client(&model).await?;
        debug!(model = %model, "Created LLM client");
        Ok(Self { client, model })
    }

    async fn build_client(model: &ModelRef) -> ReportResult<Box<dyn LlmClient>> {
        match model.provider.as_str() {
            "openai" => {
                let api_key = std::env::var("OPENAI_API_KEY")
                    .map_err(|_| ReportError::config("OPENAI_API_KEY is not set"))?;

                let client = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&model.model)
                    .build()
                    .await
                    .map_err(|e| {
                        ReportError::llm_for(
                            format!("Failed to build OpenAI client: {}", e),
                            &model.provider,
                            &model.model,
                        )
                    })?;

                Ok(Box::new(client))
            }
            "anthropic" => {
                let api_key = std::env::var("ANTHROPIC_API_KEY")
                    .map_err(|_| ReportError::config("ANTHROPIC_API_KEY is not set"))?;

                let client = LlmBuilder::new()
                    .anthropic()
                    .api_key(&api_key)
                    .model(&model.model)
                    .build()
                    .await
                    .map_err(|e| {
                        ReportError::llm_for(
                            format!("Failed to build Anthropic client: {}", e),
                            &model.provider,
                            &model.model,
                        )
                    })?;

                Ok(Box::new(client))
            }
            "ollama" => {
                let base_url = std::env::var("OLLAMA_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:11434".to_string());

                let client = LlmBuilder::new()
                    .ollama()
                    .model(&model.model)
                    .base_url(&base_url)
                    .build()
                    .await
                    .map_err(|e| {
                        ReportError::llm_for(
                            format!("Failed to build Ollama client: {}", e),
                            &model.provider,
                            &model.model,
                        )
                    })?;

                Ok(Box::new(client))
            }
            "groq" => {
                let api_key = std::env::var("GROQ_API_KEY")
                    .map_err(|_| ReportError::config("GROQ_API_KEY is not set"))?;

                let client = LlmBuilder::new()
                    .groq()
                    .api_key(&api_key)
                    .model(&model.model)
                    .build()
                    .await
                    .map_err(|e| {
                        ReportError::llm_for(
                            format!("Failed to build Groq client: {}", e),
                            &model.provider,
                            &model.model,
                        )
                    })?;

                Ok(Box::new(client))
            }
            provider => Err(ReportError::config(format!(
                "Unsupported LLM provider: {}",
                provider
            ))),
        }
    }
}

#[async_trait]
impl LanguageModel for SiumaiModel {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> ReportResult<String> {
        let messages = vec![system!(system_prompt), user!(user_prompt)];

        let response = self.client.chat(messages).await.map_err(|e| {
            ReportError::llm_for(
                format!("LLM generation failed: {}", e),
                &self.model.provider,
                &self.model.model,
            )
        })?;

        match response.content_text() {
            Some(content) => Ok(content.to_string()),
            None => Err(ReportError::llm_for(
                "No text content in LLM response",
                &self.model.provider,
                &self.model.model,
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SectionsEnvelope {
    sections: Vec<Section>,
}

#[derive(Debug, Deserialize)]
struct QueriesEnvelope {
    queries: Vec<SearchQuery>,
}

/// Ask the model for a section plan and validate it: non-empty, with names
/// unique within the report.
pub async fn generate_sections(
    model: &dyn LanguageModel,
    system_prompt: &str,
    user_prompt: &str,
) -> ReportResult<Vec<Section>> {
    let raw = model.complete(system_prompt, user_prompt).await?;
    let envelope: SectionsEnvelope = parse_structured(&raw, "sections")?;

    if envelope.sections.is_empty() {
        return Err(ReportError::malformed_output(
            "Planner returned an empty section list",
        ));
    }

    let mut seen = HashSet::new();
    for section in &envelope.sections {
        if !seen.insert(section.name.as_str()) {
            return Err(ReportError::malformed_output(format!(
                "Duplicate section name in plan: {}",
                section.name
            )));
        }
    }

    Ok(envelope.sections)
}

/// Ask the model for a non-empty search-query batch.
pub async fn generate_queries(
    model: &dyn LanguageModel,
    system_prompt: &str,
    user_prompt: &str,
) -> ReportResult<Vec<SearchQuery>> {
    let raw = model.complete(system_prompt, user_prompt).await?;
    let envelope: QueriesEnvelope = parse_structured(&raw, "queries")?;

    if envelope.queries.is_empty() {
        return Err(ReportError::malformed_output(
            "Query writer returned an empty query list",
        ));
    }

    Ok(envelope.queries)
}

/// Ask the model to grade a section draft.
pub async fn grade_section(
    model: &dyn LanguageModel,
    system_prompt: &str,
    user_prompt: &str,
) -> ReportResult<Feedback> {
    let raw = model.complete(system_prompt, user_prompt).await?;
    parse_structured(&raw, "feedback")
}

/// Deserialize the JSON block inside a completion, tolerating surrounding
/// prose.
fn parse_structured<T: DeserializeOwned>(raw: &str, expected: &str) -> ReportResult<T> {
    let json = extract_json_block(raw).ok_or_else(|| {
        ReportError::malformed_output(format!("No JSON {} object found in LLM response", expected))
    })?;

    serde_json::from_str(json)
        .map_err(|e| ReportError::malformed_output(format!("Failed to parse {}: {}", expected, e)))
}

/// Slice out the outermost JSON value of a completion that may carry prose
/// around it.
fn extract_json_block(response: &str) -> Option<&str> {
    let start = response.find(['{', '['])?;
    let close = if response.as_bytes()[start] == b'{' {
        '}'
    } else {
        ']'
    };
    let end = response.rfind(close)?;
    if end > start {
        Some(&response[start..=end])
    } else {
        None
    }
}
