//! Workflow state model
//!
//! Report-scope state is owned by the engine; each research section gets its
//! own exclusively-owned [`SectionState`] for the lifetime of its task.
//! Completed sections flow back through an order-independent merge at the
//! engine's join boundary - nothing mutable is shared while tasks run.

use chrono::{DateTime, Utc};
use reportify_core::{ErrorKind, Grade, RunConfig, SearchQuery, Section};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Report-scope state, one instance per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportState {
    pub topic: String,
    /// Reviewer feedback captured at the approval checkpoint
    pub feedback_on_plan: Option<String>,
    /// The approved plan, in plan order
    pub sections: Vec<Section>,
    /// Finished sections keyed by name. Keyed insertion makes the merge
    /// commutative and associative, so task completion order cannot matter.
    pub completed_sections: BTreeMap<String, Section>,
    /// Completed research-section content, used as context when writing
    /// synthesis sections
    pub report_sections_digest: String,
    /// Terminal artifact, set exactly once
    pub final_report: Option<String>,
}

impl ReportState {
    pub fn new<S: Into<String>>(topic: S) -> Self {
        Self {
            topic: topic.into(),
            feedback_on_plan: None,
            sections: Vec::new(),
            completed_sections: BTreeMap::new(),
            report_sections_digest: String::new(),
            final_report: None,
        }
    }

    /// Merge finished sections into the accumulator. Only the engine calls
    /// this, at its join boundary.
    pub fn merge_completed<I: IntoIterator<Item = Section>>(&mut self, sections: I) {
        for section in sections {
            self.completed_sections.insert(section.name.clone(), section);
        }
    }

    /// Whether every planned section has non-empty content.
    pub fn all_sections_written(&self) -> bool {
        !self.sections.is_empty()
            && self.sections.iter().all(|planned| {
                self.completed_sections
                    .get(&planned.name)
                    .map(Section::is_written)
                    .unwrap_or(false)
            })
    }

    /// Completed sections restored to plan order, regardless of the order
    /// their tasks finished in.
    pub fn sections_in_plan_order(&self) -> Vec<&Section> {
        self.sections
            .iter()
            .filter_map(|planned| self.completed_sections.get(&planned.name))
            .collect()
    }
}

/// Section-scope state, exclusively owned by one research task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionState {
    /// Report topic (read-only copy)
    pub topic: String,
    pub section: Section,
    pub search_iterations: usize,
    pub search_queries: Vec<SearchQuery>,
    /// Digest from the latest search pass; replaced, never appended to
    pub source_digest: String,
    /// Read-only context from already-completed sections
    pub report_sections_digest: String,
    /// Output slot, written once when the loop exits
    pub completed: Option<Section>,
}

impl SectionState {
    pub fn new<S: Into<String>>(topic: S, section: Section, report_sections_digest: String) -> Self {
        Self {
            topic: topic.into(),
            section,
            search_iterations: 0,
            search_queries: Vec::new(),
            source_digest: String::new(),
            report_sections_digest,
            completed: None,
        }
    }
}

/// Where a run is in its lifecycle.
///
/// The human checkpoint is the explicit `AwaitingApproval` state with a
/// persisted record behind it - resumption is a normal transition driven by
/// external input, not error recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunStatus {
    Planning,
    AwaitingApproval,
    Researching,
    Compiling,
    Completed,
    Failed { kind: ErrorKind },
    Abandoned,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Planning => write!(f, "planning"),
            RunStatus::AwaitingApproval => write!(f, "awaiting_approval"),
            RunStatus::Researching => write!(f, "researching"),
            RunStatus::Compiling => write!(f, "compiling"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed { kind } => write!(f, "failed ({})", kind),
            RunStatus::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Input that resumes a run held at the approval checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResumeInput {
    /// Accept the proposed plan and start section research
    Approve,
    /// Re-enter planning with this text as reviewer feedback
    Revise(String),
}

/// The persisted unit: everything needed to inspect or resume a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub status: RunStatus,
    pub config: RunConfig,
    pub state: ReportState,
    /// Last known per-section research state, updated at the join boundary
    pub section_states: BTreeMap<String, SectionState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn new<S: Into<String>>(run_id: String, config: RunConfig, topic: S) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            status: RunStatus::Planning,
            config,
            state: ReportState::new(topic),
            section_states: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// State-transition events streamed to the caller while a run executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    PlanProposed { sections: Vec<Section> },
    AwaitingApproval,
    ResearchStarted { sections: Vec<String> },
    SectionSearch {
        section: String,
        iteration: usize,
        queries: Vec<SearchQuery>,
    },
    SectionDrafted { section: String },
    SectionGraded { section: String, grade: Grade },
    SectionCompleted { section: String },
    Compiling,
    Completed { final_report: String },
    Failed { kind: ErrorKind, message: String },
}

/// Render sections into the readable multi-section block used as
/// cross-section context for synthesis writing.
pub fn format_sections(sections: &[Section]) -> String {
    let mut formatted = String::new();
    for (idx, section) in sections.iter().enumerate() {
        formatted.push_str(&format!(
            "\n{divider}\nSection {index}: {name}\n{divider}\nDescription:\n{description}\nRequires Research:\n{research}\n\nContent:\n{content}\n\n",
            divider = "=".repeat(60),
            index = idx + 1,
            name = section.name,
            description = section.description,
            research = section.research,
            content = if section.content.is_empty() {
                "[Not yet written]"
            } else {
                &section.content
            },
        ));
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str, content: &str) -> Section {
        Section {
            name: name.to_string(),
            description: format!("{} description", name),
            research: true,
            content: content.to_string(),
        }
    }

    #[test]
    fn merge_is_order_independent() {
        let sections = vec![
            section("Alpha", "a"),
            section("Beta", "b"),
            section("Gamma", "c"),
        ];

        // Merge in every permutation of completion order
        let permutations: Vec<Vec<usize>> = vec![
            vec![0, 1, 2],
            vec![0, 2, 1],
            vec![1, 0, 2],
            vec![1, 2, 0],
            vec![2, 0, 1],
            vec![2, 1, 0],
        ];

        let mut merged: Vec<BTreeMap<String, Section>> = Vec::new();
        for order in permutations {
            let mut state = ReportState::new("topic");
            for i in order {
                state.merge_completed([sections[i].clone()]);
            }
            merged.push(state.completed_sections);
        }

        for other in &merged[1..] {
            assert_eq!(&merged[0], other);
        }
    }

    #[test]
    fn merge_in_chunks_equals_merge_at_once() {
        let mut at_once = ReportState::new("topic");
        at_once.merge_completed([section("A", "1"), section("B", "2"), section("C", "3")]);

        let mut chunked = ReportState::new("topic");
        chunked.merge_completed([section("C", "3")]);
        chunked.merge_completed([section("A", "1"), section("B", "2")]);

        assert_eq!(at_once.completed_sections, chunked.completed_sections);
    }

    #[test]
    fn plan_order_is_restored_from_the_plan() {
        let mut state = ReportState::new("topic");
        state.sections = vec![
            section("First", ""),
            section("Second", ""),
            section("Third", ""),
        ];
        // Completion arrives out of order
        state.merge_completed([
            section("Third", "t"),
            section("First", "f"),
            section("Second", "s"),
        ]);

        let ordered: Vec<&str> = state
            .sections_in_plan_order()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(ordered, vec!["First", "Second", "Third"]);
        assert!(state.all_sections_written());
    }

    #[test]
    fn unwritten_sections_block_completion() {
        let mut state = ReportState::new("topic");
        state.sections = vec![section("Only", "")];
        assert!(!state.all_sections_written());

        state.merge_completed([section("Only", "")]);
        assert!(!state.all_sections_written(), "empty content does not count");

        state.merge_completed([section("Only", "done")]);
        assert!(state.all_sections_written());
    }

    #[test]
    fn format_sections_marks_unwritten_content() {
        let rendered = format_sections(&[section("Pending", "")]);
        assert!(rendered.contains("Section 1: Pending"));
        assert!(rendered.contains("[Not yet written]"));
    }
}
