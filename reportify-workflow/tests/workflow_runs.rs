//! End-to-end workflow tests with scripted model and provider doubles

use async_trait::async_trait;
use reportify_core::{
    ErrorKind, Grade, ReportError, ReportResult, RunConfig, SearchProviderKind, SearchResponse,
    SearchResult, Section,
};
use reportify_search::{provider::ProviderParams, SearchGateway, SearchProvider};
use reportify_workflow::{
    MemoryCheckpointStore, ReportEngine, ResumeInput, RunEvent, RunStatus,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Pull the value out of a `<Tag>\nvalue\n</Tag>` block in a prompt.
fn tag_value(prompt: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let start = prompt.find(&open)? + open.len();
    let rest = prompt[start..].trim_start();
    Some(rest.lines().next()?.trim().to_string())
}

fn section(name: &str, research: bool) -> Section {
    Section {
        name: name.to_string(),
        description: format!("{} of the report", name),
        research,
        content: String::new(),
    }
}

fn sections_json(sections: &[Section]) -> String {
    serde_json::to_string(&serde_json::json!({ "sections": sections })).unwrap()
}

/// Scripted language model: branches on the instruction template it was
/// handed and keeps counters for assertions.
struct ScriptedModel {
    plan: Vec<Section>,
    /// Plan returned instead when the planner prompt carries this feedback
    revised: Option<(String, Vec<Section>)>,
    grade: Grade,
    fail_drafting: bool,
    draft_calls: AtomicUsize,
    synthesis_saw_research: AtomicBool,
}

impl ScriptedModel {
    fn new(plan: Vec<Section>, grade: Grade) -> Self {
        Self {
            plan,
            revised: None,
            grade,
            fail_drafting: false,
            draft_calls: AtomicUsize::new(0),
            synthesis_saw_research: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl reportify_workflow::LanguageModel for ScriptedModel {
    async fn complete(&self, system_prompt: &str, _user_prompt: &str) -> ReportResult<String> {
        if system_prompt.contains("clear, concise plan") {
            // Report planner
            if let Some((feedback, revised)) = &self.revised {
                if system_prompt.contains(feedback.as_str()) {
                    return Ok(sections_json(revised));
                }
            }
            return Ok(sections_json(&self.plan));
        }

        if system_prompt.contains("web search queries") {
            // Plan-level and section-level query writers share the shape
            return Ok(r#"{"queries": [{"query": "first angle"}, {"query": "second angle"}]}"#
                .to_string());
        }

        if system_prompt.contains("grading one section") {
            return Ok(match self.grade {
                Grade::Pass => r#"{"grade": "pass", "follow_up_queries": []}"#.to_string(),
                Grade::Fail => {
                    r#"{"grade": "fail", "follow_up_queries": [{"query": "dig deeper"}]}"#
                        .to_string()
                }
            });
        }

        if system_prompt.contains("crafting one section of a research report") {
            if self.fail_drafting {
                return Err(ReportError::llm("backend unavailable"));
            }
            let name = tag_value(system_prompt, "Section Name").unwrap_or_default();
            let pass = self.draft_calls.fetch_add(1, Ordering::SeqCst) + 1;
            return Ok(format!(
                "## {name}\n\nResearched content for {name} (draft {pass}).\n\n### Sources\n[1] Example: https://example.com/{pass}",
            ));
        }

        if system_prompt.contains("synthesizes information") {
            if system_prompt.contains("Researched content for") {
                self.synthesis_saw_research.store(true, Ordering::SeqCst);
            }
            let name = tag_value(system_prompt, "Section Name").unwrap_or_default();
            return Ok(format!("# {name}\n\nSynthesized content for {name}."));
        }

        Err(ReportError::internal(format!(
            "Unexpected prompt: {}",
            system_prompt.chars().take(60).collect::<String>()
        )))
    }
}

/// Provider double returning two results per query and counting batches.
struct CountingProvider {
    batches: Arc<AtomicUsize>,
}

#[async_trait]
impl SearchProvider for CountingProvider {
    async fn search(
        &self,
        queries: &[String],
        _params: &ProviderParams,
    ) -> ReportResult<Vec<SearchResponse>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(queries
            .iter()
            .map(|query| {
                SearchResponse::ok(
                    query.clone(),
                    (0..2)
                        .map(|i| SearchResult {
                            title: format!("{} hit {}", query, i),
                            url: format!("https://example.com/{}/{}", query.replace(' ', "-"), i),
                            snippet: "relevant excerpt".to_string(),
                            score: 1.0 - i as f64 * 0.1,
                            full_content: Some("full text".to_string()),
                        })
                        .collect(),
                )
            })
            .collect())
    }
}

struct Harness {
    engine: ReportEngine,
    model: Arc<ScriptedModel>,
    search_batches: Arc<AtomicUsize>,
}

fn harness(model: ScriptedModel) -> Harness {
    let model = Arc::new(model);
    let search_batches = Arc::new(AtomicUsize::new(0));
    let gateway = SearchGateway::empty().with_provider(
        SearchProviderKind::DuckDuckGo,
        Box::new(CountingProvider {
            batches: search_batches.clone(),
        }),
    );
    let engine = ReportEngine::new(
        model.clone(),
        model.clone(),
        Arc::new(gateway),
        Arc::new(MemoryCheckpointStore::new()),
    );
    Harness {
        engine,
        model,
        search_batches,
    }
}

fn test_config(max_search_depth: usize) -> RunConfig {
    let mut config = RunConfig::default();
    config.max_search_depth = max_search_depth;
    config.search_provider = SearchProviderKind::DuckDuckGo;
    config
}

async fn drain(mut events: mpsc::Receiver<RunEvent>) -> Vec<RunEvent> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    collected
}

#[tokio::test]
async fn end_to_end_three_section_report() {
    let h = harness(ScriptedModel::new(
        vec![
            section("Introduction", false),
            section("Body", true),
            section("Conclusion", false),
        ],
        Grade::Fail, // budget of 1 accepts the draft regardless of grade
    ));

    let run_id = h.engine.start_run("X", test_config(1)).await.unwrap();

    // Suspended at the human checkpoint with the three-section proposal
    let record = h.engine.get_run(&run_id).await.unwrap();
    assert_eq!(record.status, RunStatus::AwaitingApproval);
    let names: Vec<&str> = record.state.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Introduction", "Body", "Conclusion"]);
    assert!(record.state.sections.iter().all(|s| s.content.is_empty()));

    let events = drain(
        h.engine
            .resume(&run_id, ResumeInput::Approve)
            .await
            .unwrap(),
    )
    .await;

    // Only the body section ran the research loop, exactly once
    let searches: Vec<(&String, usize)> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::SectionSearch {
                section, iteration, ..
            } => Some((section, *iteration)),
            _ => None,
        })
        .collect();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0], (&"Body".to_string(), 1));

    // Synthesis sections saw the body's research digest as context
    assert!(h.model.synthesis_saw_research.load(Ordering::SeqCst));

    let record = h.engine.get_run(&run_id).await.unwrap();
    assert_eq!(record.status, RunStatus::Completed);
    assert!(record
        .state
        .completed_sections
        .values()
        .all(|s| s.is_written()));

    let report = record.state.final_report.expect("final report set");
    assert!(events
        .iter()
        .any(|e| matches!(e, RunEvent::Completed { final_report } if *final_report == report)));

    // Plan order survives out-of-order completion
    let intro = report.find("Synthesized content for Introduction").unwrap();
    let body = report.find("Researched content for Body").unwrap();
    let conclusion = report.find("Synthesized content for Conclusion").unwrap();
    assert!(intro < body && body < conclusion);
}

#[tokio::test]
async fn failing_grades_stop_at_the_iteration_budget() {
    let h = harness(ScriptedModel::new(
        vec![section("Deep Dive", true)],
        Grade::Fail,
    ));

    let run_id = h.engine.start_run("topic", test_config(2)).await.unwrap();
    let plan_batches = h.search_batches.load(Ordering::SeqCst);

    let events = drain(
        h.engine
            .resume(&run_id, ResumeInput::Approve)
            .await
            .unwrap(),
    )
    .await;

    // Exactly two search iterations, never a third
    let iterations: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::SectionSearch { iteration, .. } => Some(*iteration),
            _ => None,
        })
        .collect();
    assert_eq!(iterations, vec![1, 2]);
    assert_eq!(h.search_batches.load(Ordering::SeqCst) - plan_batches, 2);

    // Both drafts were graded fail, yet the section completed with content
    let fails = events
        .iter()
        .filter(|e| matches!(e, RunEvent::SectionGraded { grade: Grade::Fail, .. }))
        .count();
    assert_eq!(fails, 2);

    let record = h.engine.get_run(&run_id).await.unwrap();
    assert_eq!(record.status, RunStatus::Completed);
    let completed = record.state.completed_sections.get("Deep Dive").unwrap();
    assert!(completed.is_written());
}

#[tokio::test]
async fn revision_replans_without_running_research() {
    let mut model = ScriptedModel::new(
        vec![
            section("Introduction", false),
            section("Market Overview", true),
            section("Conclusion", false),
        ],
        Grade::Pass,
    );
    model.revised = Some((
        "add a cost section".to_string(),
        vec![
            section("Introduction", false),
            section("Market Overview", true),
            section("Cost Analysis", true),
            section("Conclusion", false),
        ],
    ));
    let h = harness(model);

    let run_id = h.engine.start_run("X", test_config(1)).await.unwrap();

    let events = drain(
        h.engine
            .resume(&run_id, ResumeInput::Revise("add a cost section".to_string()))
            .await
            .unwrap(),
    )
    .await;

    // Re-planned and suspended again; no research was started
    assert!(events
        .iter()
        .any(|e| matches!(e, RunEvent::PlanProposed { sections } if sections.len() == 4)));
    assert!(events.iter().any(|e| matches!(e, RunEvent::AwaitingApproval)));
    assert!(!events
        .iter()
        .any(|e| matches!(e, RunEvent::SectionSearch { .. })));

    let record = h.engine.get_run(&run_id).await.unwrap();
    assert_eq!(record.status, RunStatus::AwaitingApproval);
    assert_eq!(
        record.state.feedback_on_plan.as_deref(),
        Some("add a cost section")
    );
    assert!(record
        .state
        .sections
        .iter()
        .any(|s| s.name == "Cost Analysis"));
    assert!(record.state.completed_sections.is_empty());

    // Approving after the revision runs the full pipeline
    let events = drain(
        h.engine
            .resume(&run_id, ResumeInput::Approve)
            .await
            .unwrap(),
    )
    .await;
    assert!(events
        .iter()
        .any(|e| matches!(e, RunEvent::Completed { .. })));

    let record = h.engine.get_run(&run_id).await.unwrap();
    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(record.state.sections_in_plan_order().len(), 4);
}

#[tokio::test]
async fn node_failure_marks_the_run_failed_and_keeps_state() {
    let mut model = ScriptedModel::new(vec![section("Body", true)], Grade::Pass);
    model.fail_drafting = true;
    let h = harness(model);

    let run_id = h.engine.start_run("topic", test_config(1)).await.unwrap();
    let events = drain(
        h.engine
            .resume(&run_id, ResumeInput::Approve)
            .await
            .unwrap(),
    )
    .await;

    assert!(events.iter().any(|e| matches!(
        e,
        RunEvent::Failed {
            kind: ErrorKind::LlmCallFailed,
            ..
        }
    )));

    // The last persisted state survives for inspection
    let record = h.engine.get_run(&run_id).await.unwrap();
    assert_eq!(
        record.status,
        RunStatus::Failed {
            kind: ErrorKind::LlmCallFailed
        }
    );
    assert_eq!(record.state.sections.len(), 1);
    assert!(record.state.final_report.is_none());
}

#[tokio::test]
async fn abandoned_runs_cannot_be_resumed_but_stay_inspectable() {
    let h = harness(ScriptedModel::new(vec![section("Body", true)], Grade::Pass));

    let run_id = h.engine.start_run("topic", test_config(1)).await.unwrap();
    h.engine.abandon_run(&run_id).await.unwrap();

    let record = h.engine.get_run(&run_id).await.unwrap();
    assert_eq!(record.status, RunStatus::Abandoned);
    assert_eq!(record.state.sections.len(), 1, "plan is still readable");

    let err = h
        .engine
        .resume(&run_id, ResumeInput::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::Validation { .. }));
}

#[tokio::test]
async fn resume_rejects_unknown_runs() {
    let h = harness(ScriptedModel::new(vec![section("Body", true)], Grade::Pass));
    let err = h
        .engine
        .resume("no-such-run", ResumeInput::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::NotFound { .. }));
}
