//! Workflow orchestration engine
//!
//! Owns the run lifecycle: plan -> suspend for approval -> fan out one
//! research task per research section -> join -> write synthesis sections ->
//! compile. The engine is the only writer of report-scope state; completed
//! sections are merged at its join boundary, never from inside tasks. Every
//! node transition is persisted, so a run suspended at the checkpoint can be
//! resumed after arbitrary delay or a process restart.

use crate::checkpoint::CheckpointStore;
use crate::compiler::ReportCompiler;
use crate::llm::{LanguageModel, SiumaiModel};
use crate::planner::ReportPlanner;
use crate::researcher::SectionResearcher;
use crate::state::{
    format_sections, ResumeInput, RunEvent, RunRecord, RunStatus, SectionState,
};
use reportify_core::{process_concurrently, ReportError, ReportResult, RunConfig, Section};
use reportify_search::SearchGateway;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const MAX_CONCURRENT_SECTIONS: usize = 8;

#[derive(Clone)]
pub struct ReportEngine {
    planner_model: Arc<dyn LanguageModel>,
    writer_model: Arc<dyn LanguageModel>,
    gateway: Arc<SearchGateway>,
    store: Arc<dyn CheckpointStore>,
    /// Driver tasks for in-flight resumes, keyed by run id
    tasks: Arc<RwLock<HashMap<String, tokio::task::JoinHandle<()>>>>,
}

impl ReportEngine {
    pub fn new(
        planner_model: Arc<dyn LanguageModel>,
        writer_model: Arc<dyn LanguageModel>,
        gateway: Arc<SearchGateway>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            planner_model,
            writer_model,
            gateway,
            store,
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Engine with siumai-backed models and the built-in provider gateway,
    /// wired from the run configuration.
    pub async fn connect(config: &RunConfig, store: Arc<dyn CheckpointStore>) -> ReportResult<Self> {
        let planner_model: Arc<dyn LanguageModel> =
            Arc::new(SiumaiModel::connect(config.planner_model.clone()).await?);
        let writer_model: Arc<dyn LanguageModel> =
            Arc::new(SiumaiModel::connect(config.writer_model.clone()).await?);
        let gateway = Arc::new(SearchGateway::new()?);
        Ok(Self::new(planner_model, writer_model, gateway, store))
    }

    /// Plan the report for `topic` and suspend at the approval checkpoint.
    /// Returns the run id; the proposed plan is readable via [`Self::get_run`].
    pub async fn start_run(&self, topic: &str, config: RunConfig) -> ReportResult<String> {
        config.validate()?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let mut record = RunRecord::new(run_id.clone(), config.clone(), topic);
        self.store.save(&record).await?;

        info!(run_id = %run_id, topic, "Starting report run");

        let planner = ReportPlanner::new(
            self.planner_model.clone(),
            self.gateway.clone(),
            config,
        );
        match planner.plan(topic, None).await {
            Ok(sections) => {
                record.state.sections = sections;
                record.status = RunStatus::AwaitingApproval;
                record.touch();
                self.store.save(&record).await?;
                info!(
                    run_id = %run_id,
                    sections = record.state.sections.len(),
                    "Run suspended for plan approval"
                );
                Ok(run_id)
            }
            Err(e) => {
                self.fail_run(&mut record, &e).await;
                Err(e)
            }
        }
    }

    pub async fn get_run(&self, run_id: &str) -> ReportResult<RunRecord> {
        self.store
            .load(run_id)
            .await?
            .ok_or_else(|| ReportError::not_found(format!("run {}", run_id)))
    }

    /// Resume a run held at the approval checkpoint.
    ///
    /// `Revise` re-enters planning with the text as reviewer feedback and
    /// suspends again; `Approve` runs research and compilation to the end.
    /// Events stream out until the run suspends, completes or fails.
    pub async fn resume(
        &self,
        run_id: &str,
        input: ResumeInput,
    ) -> ReportResult<mpsc::Receiver<RunEvent>> {
        let record = self.get_run(run_id).await?;
        match record.status {
            RunStatus::AwaitingApproval => {}
            RunStatus::Abandoned => {
                return Err(ReportError::validation(format!(
                    "Run {} was abandoned",
                    run_id
                )))
            }
            ref status => {
                return Err(ReportError::validation(format!(
                    "Run {} is not awaiting approval (status: {})",
                    run_id, status
                )))
            }
        }

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let engine = self.clone();
        let task_run_id = run_id.to_string();

        let handle = tokio::spawn(async move {
            let result = match input {
                ResumeInput::Revise(feedback) => {
                    engine.revise_plan(record, feedback, &events_tx).await
                }
                ResumeInput::Approve => engine.execute_approved(record, &events_tx).await,
            };

            if let Err(e) = result {
                error!(run_id = %task_run_id, error = %e, "Run failed");
                let _ = events_tx
                    .send(RunEvent::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    })
                    .await;
            }

            engine.tasks.write().await.remove(&task_run_id);
        });

        self.tasks.write().await.insert(run_id.to_string(), handle);
        Ok(events_rx)
    }

    /// Abandon a run without corrupting its persisted state. The record
    /// stays in the store for inspection; it just cannot be resumed.
    pub async fn abandon_run(&self, run_id: &str) -> ReportResult<()> {
        let mut record = self.get_run(run_id).await?;
        if record.status == RunStatus::Completed {
            return Err(ReportError::validation(format!(
                "Run {} already completed",
                run_id
            )));
        }

        if let Some(handle) = self.tasks.write().await.remove(run_id) {
            handle.abort();
        }

        record.status = RunStatus::Abandoned;
        record.touch();
        self.store.save(&record).await?;
        info!(run_id, "Run abandoned");
        Ok(())
    }

    async fn revise_plan(
        &self,
        mut record: RunRecord,
        feedback: String,
        events: &mpsc::Sender<RunEvent>,
    ) -> ReportResult<()> {
        info!(run_id = %record.run_id, "Re-planning with reviewer feedback");

        record.status = RunStatus::Planning;
        record.state.feedback_on_plan = Some(feedback.clone());
        record.touch();
        self.store.save(&record).await?;

        let planner = ReportPlanner::new(
            self.planner_model.clone(),
            self.gateway.clone(),
            record.config.clone(),
        );
        match planner.plan(&record.state.topic, Some(&feedback)).await {
            Ok(sections) => {
                record.state.sections = sections;
                record.status = RunStatus::AwaitingApproval;
                record.touch();
                self.store.save(&record).await?;

                let _ = events
                    .send(RunEvent::PlanProposed {
                        sections: record.state.sections.clone(),
                    })
                    .await;
                let _ = events.send(RunEvent::AwaitingApproval).await;
                Ok(())
            }
            Err(e) => {
                self.fail_run(&mut record, &e).await;
                Err(e)
            }
        }
    }

    async fn execute_approved(
        &self,
        mut record: RunRecord,
        events: &mpsc::Sender<RunEvent>,
    ) -> ReportResult<()> {
        match self.research_and_compile(&mut record, events).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.fail_run(&mut record, &e).await;
                Err(e)
            }
        }
    }

    async fn research_and_compile(
        &self,
        record: &mut RunRecord,
        events: &mpsc::Sender<RunEvent>,
    ) -> ReportResult<()> {
        record.status = RunStatus::Researching;
        record.touch();
        self.store.save(record).await?;

        // Sections already completed (e.g. by an earlier resume) are not
        // re-researched.
        let research_sections: Vec<Section> = record
            .state
            .sections
            .iter()
            .filter(|s| s.research && !record.state.completed_sections.contains_key(&s.name))
            .cloned()
            .collect();

        let _ = events
            .send(RunEvent::ResearchStarted {
                sections: research_sections.iter().map(|s| s.name.clone()).collect(),
            })
            .await;

        let researcher = Arc::new(SectionResearcher::new(
            self.writer_model.clone(),
            self.gateway.clone(),
            record.config.clone(),
        ));
        let topic = record.state.topic.clone();
        let context_digest = record.state.report_sections_digest.clone();
        let task_events = events.clone();

        let results = process_concurrently(
            research_sections,
            MAX_CONCURRENT_SECTIONS,
            move |section| {
                let researcher = researcher.clone();
                let events = task_events.clone();
                let state = SectionState::new(topic.clone(), section, context_digest.clone());
                async move { researcher.research(state, events).await }
            },
        )
        .await;

        // Join boundary: the single place completed sections are merged back
        // into report-scope state, in whatever order tasks finished.
        for result in results {
            let section_state = result?;
            record
                .section_states
                .insert(section_state.section.name.clone(), section_state.clone());
            if let Some(section) = section_state.completed {
                record.state.merge_completed([section]);
            }
        }
        record.touch();
        self.store.save(record).await?;

        // Research content, in plan order, becomes context for synthesis
        let research_completed: Vec<Section> = record
            .state
            .sections
            .iter()
            .filter(|s| s.research)
            .filter_map(|s| record.state.completed_sections.get(&s.name).cloned())
            .collect();
        record.state.report_sections_digest = format_sections(&research_completed);

        record.status = RunStatus::Compiling;
        record.touch();
        self.store.save(record).await?;
        let _ = events.send(RunEvent::Compiling).await;

        let synthesis_sections: Vec<Section> = record
            .state
            .sections
            .iter()
            .filter(|s| !s.research && !record.state.completed_sections.contains_key(&s.name))
            .cloned()
            .collect();

        let compiler = Arc::new(ReportCompiler::new(self.writer_model.clone()));
        let topic = record.state.topic.clone();
        let research_digest = record.state.report_sections_digest.clone();
        let task_compiler = compiler.clone();

        let results = process_concurrently(
            synthesis_sections,
            MAX_CONCURRENT_SECTIONS,
            move |section| {
                let compiler = task_compiler.clone();
                let topic = topic.clone();
                let digest = research_digest.clone();
                async move {
                    compiler
                        .write_synthesis_section(&topic, &section, &digest)
                        .await
                }
            },
        )
        .await;

        for result in results {
            let section = result?;
            let _ = events
                .send(RunEvent::SectionCompleted {
                    section: section.name.clone(),
                })
                .await;
            record.state.merge_completed([section]);
        }

        let final_report = compiler.compile(&record.state)?;
        record.state.final_report = Some(final_report.clone());
        record.status = RunStatus::Completed;
        record.touch();
        self.store.save(record).await?;

        info!(run_id = %record.run_id, "Report run completed");
        let _ = events.send(RunEvent::Completed { final_report }).await;
        Ok(())
    }

    async fn fail_run(&self, record: &mut RunRecord, error: &ReportError) {
        record.status = RunStatus::Failed { kind: error.kind() };
        record.touch();
        // The last successfully persisted state stays intact for inspection
        // and manual resume; only the status changes.
        if let Err(save_err) = self.store.save(record).await {
            error!(
                run_id = %record.run_id,
                error = %save_err,
                "Failed to persist failure status"
            );
        }
    }
}
