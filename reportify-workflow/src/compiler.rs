//! Final report compilation
//!
//! Writes the synthesis sections (introduction, conclusion, ...) against the
//! completed research content, then merges every section back into plan
//! order.

use crate::llm::LanguageModel;
use crate::prompts;
use crate::state::ReportState;
use reportify_core::{ReportError, ReportResult, Section};
use std::sync::Arc;
use tracing::info;

pub struct ReportCompiler {
    model: Arc<dyn LanguageModel>,
}

impl ReportCompiler {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Write one synthesis section (research = false) using the completed
    /// research sections as context.
    pub async fn write_synthesis_section(
        &self,
        topic: &str,
        section: &Section,
        research_digest: &str,
    ) -> ReportResult<Section> {
        info!(section = %section.name, "Writing synthesis section");

        let instructions = prompts::final_section_writer_instructions(
            topic,
            &section.name,
            &section.description,
            research_digest,
        );
        let content = self
            .model
            .complete(&instructions, prompts::WRITE_SECTION_TASK)
            .await?;

        let mut written = section.clone();
        written.content = content;
        Ok(written)
    }

    /// Concatenate all completed sections in plan order into the final
    /// report text.
    pub fn compile(&self, state: &ReportState) -> ReportResult<String> {
        if !state.all_sections_written() {
            return Err(ReportError::internal(
                "Cannot compile: not every planned section has content",
            ));
        }

        Ok(state
            .sections_in_plan_order()
            .iter()
            .map(|section| section.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
