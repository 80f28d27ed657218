//! Report planning
//!
//! Turns a topic into an ordered section list: a preliminary search pass
//! gathers context, then a structured planning call produces the sections.
//! Reviewer feedback from the approval checkpoint re-enters here.

use crate::llm::{generate_queries, generate_sections, LanguageModel};
use crate::prompts;
use reportify_core::{ReportResult, RunConfig, Section};
use reportify_search::SearchGateway;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ReportPlanner {
    model: Arc<dyn LanguageModel>,
    gateway: Arc<SearchGateway>,
    config: RunConfig,
}

impl ReportPlanner {
    pub fn new(model: Arc<dyn LanguageModel>, gateway: Arc<SearchGateway>, config: RunConfig) -> Self {
        Self {
            model,
            gateway,
            config,
        }
    }

    /// Produce the proposed section list for `topic`. `prior_feedback`
    /// carries the reviewer's revision text when re-planning.
    pub async fn plan(
        &self,
        topic: &str,
        prior_feedback: Option<&str>,
    ) -> ReportResult<Vec<Section>> {
        info!(topic, revising = prior_feedback.is_some(), "Planning report sections");

        // Context pass: look at the web before committing to a structure
        let instructions = prompts::plan_query_writer_instructions(
            topic,
            &self.config.report_structure,
            self.config.number_of_queries,
        );
        let queries = generate_queries(
            self.model.as_ref(),
            &instructions,
            prompts::GENERATE_QUERIES_TASK,
        )
        .await?;

        let context = self
            .gateway
            .search(
                self.config.search_provider,
                &queries,
                &self.config.search_provider_config,
            )
            .await?;

        let instructions = prompts::report_planner_instructions(
            topic,
            &self.config.report_structure,
            &context,
            prior_feedback.unwrap_or(""),
        );
        let mut sections = generate_sections(
            self.model.as_ref(),
            &instructions,
            prompts::GENERATE_SECTIONS_TASK,
        )
        .await?;

        // Planned sections always start unwritten, whatever the model said
        for section in &mut sections {
            section.content.clear();
        }

        debug!(count = sections.len(), "Planner proposed sections");
        Ok(sections)
    }
}
