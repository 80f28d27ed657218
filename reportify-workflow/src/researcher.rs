//! Per-section research loop
//!
//! One state machine per research-flagged section:
//! query generation -> search -> draft -> grade, looping on a failing grade
//! until the draft passes or `max_search_depth` search passes have run. A
//! run that exhausts its budget keeps the last draft - best effort, not an
//! error.

use crate::llm::{generate_queries, grade_section, LanguageModel};
use crate::prompts;
use crate::state::{RunEvent, SectionState};
use reportify_core::{Grade, ReportResult, RunConfig};
use reportify_search::SearchGateway;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub struct SectionResearcher {
    model: Arc<dyn LanguageModel>,
    gateway: Arc<SearchGateway>,
    config: RunConfig,
}

impl SectionResearcher {
    pub fn new(model: Arc<dyn LanguageModel>, gateway: Arc<SearchGateway>, config: RunConfig) -> Self {
        Self {
            model,
            gateway,
            config,
        }
    }

    /// Drive one section to completion. The state is exclusively owned by
    /// this call; the finished section comes back in `state.completed`.
    pub async fn research(
        &self,
        mut state: SectionState,
        events: mpsc::Sender<RunEvent>,
    ) -> ReportResult<SectionState> {
        info!(section = %state.section.name, "Researching section");

        let instructions = prompts::section_query_writer_instructions(
            &state.topic,
            &state.section.description,
            self.config.number_of_queries,
        );
        state.search_queries = generate_queries(
            self.model.as_ref(),
            &instructions,
            prompts::GENERATE_QUERIES_TASK,
        )
        .await?;

        loop {
            let _ = events
                .send(RunEvent::SectionSearch {
                    section: state.section.name.clone(),
                    iteration: state.search_iterations + 1,
                    queries: state.search_queries.clone(),
                })
                .await;

            // Each retry re-researches: the digest is replaced, not extended
            state.source_digest = self
                .gateway
                .search(
                    self.config.search_provider,
                    &state.search_queries,
                    &self.config.search_provider_config,
                )
                .await?;
            state.search_iterations += 1;

            let instructions = prompts::section_writer_instructions(
                &state.topic,
                &state.section.name,
                &state.section.description,
                &state.section.content,
                &state.source_digest,
            );
            state.section.content = self
                .model
                .complete(&instructions, prompts::WRITE_SECTION_TASK)
                .await?;

            let _ = events
                .send(RunEvent::SectionDrafted {
                    section: state.section.name.clone(),
                })
                .await;

            let instructions = prompts::section_grader_instructions(
                &state.topic,
                &state.section.description,
                &state.section.content,
                self.config.number_of_queries,
            );
            let feedback = grade_section(
                self.model.as_ref(),
                &instructions,
                prompts::GRADE_SECTION_TASK,
            )
            .await?;

            let _ = events
                .send(RunEvent::SectionGraded {
                    section: state.section.name.clone(),
                    grade: feedback.grade,
                })
                .await;

            if feedback.grade == Grade::Pass {
                debug!(
                    section = %state.section.name,
                    iterations = state.search_iterations,
                    "Section passed grading"
                );
                break;
            }

            if state.search_iterations >= self.config.max_search_depth {
                // Budget exhausted: accept the last draft as-is
                debug!(
                    section = %state.section.name,
                    iterations = state.search_iterations,
                    "Search budget exhausted, accepting draft"
                );
                break;
            }

            state.search_queries = if feedback.follow_up_queries.is_empty() {
                // Grader gave no follow-ups; regenerate from the description
                generate_queries(
                    self.model.as_ref(),
                    &prompts::section_query_writer_instructions(
                        &state.topic,
                        &state.section.description,
                        self.config.number_of_queries,
                    ),
                    prompts::GENERATE_QUERIES_TASK,
                )
                .await?
            } else {
                feedback.follow_up_queries
            };
        }

        state.completed = Some(state.section.clone());

        let _ = events
            .send(RunEvent::SectionCompleted {
                section: state.section.name.clone(),
            })
            .await;

        Ok(state)
    }
}
