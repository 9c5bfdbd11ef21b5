//! Core type definitions for ward

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Derived status of a task in the dependency graph
///
/// Status is always computed from the dependency closure at query time,
/// never stored authoritatively. Only the `in_progress` and `complete`
/// marks on [`TaskNode`] carry information on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Blocked,
    Ready,
    InProgress,
    Complete,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocked => write!(f, "blocked"),
            Self::Ready => write!(f, "ready"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blocked" => Ok(Self::Blocked),
            "ready" => Ok(Self::Ready),
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "complete" | "done" => Ok(Self::Complete),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

/// A work item, keyed by name in the task graph
///
/// The `status` field carries only the external marks (`in_progress`,
/// `complete`); `blocked` and `ready` are always derived from the
/// dependency closure at query time and any persisted value for them is
/// ignored on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
    #[serde(default)]
    pub description: String,
    #[serde(default = "unmarked_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
}

fn unmarked_status() -> TaskStatus {
    TaskStatus::Blocked
}

impl TaskNode {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: TaskStatus::Blocked,
            dependencies: BTreeSet::new(),
        }
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }
}

/// Status of a coarse-grained project phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Complete,
}

/// An ordered project phase
///
/// Phases complete in order: a later phase cannot be complete while an
/// earlier one is pending. The store's consistency pass enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPhase {
    pub name: String,
    pub status: PhaseStatus,
}

impl ProjectPhase {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: PhaseStatus::Pending,
        }
    }
}

/// Steps of the development workflow cycle
///
/// The transition table is a fixed total function with no terminal state:
/// `commit` wraps back to `explore`, giving a cycle of length 7. The
/// machine runs forever until an external driver stops it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    #[default]
    LoadPhase,
    Explore,
    WriteTests,
    Implement,
    RunTests,
    Doublecheck,
    Commit,
}

impl WorkflowStep {
    /// Fixed transition table: current step to next step
    pub fn next(self) -> Self {
        match self {
            Self::LoadPhase => Self::Explore,
            Self::Explore => Self::WriteTests,
            Self::WriteTests => Self::Implement,
            Self::Implement => Self::RunTests,
            Self::RunTests => Self::Doublecheck,
            Self::Doublecheck => Self::Commit,
            Self::Commit => Self::Explore,
        }
    }

    /// Driver instruction associated with this step
    pub fn instruction(self) -> &'static str {
        match self {
            Self::LoadPhase => {
                "Load the current phase plan and confirm its evidence requirements."
            }
            Self::Explore => {
                "Explore the codebase and documentation relevant to the current phase."
            }
            Self::WriteTests => "Write failing tests that capture the phase's acceptance criteria.",
            Self::Implement => "Implement the minimal change that makes the new tests pass.",
            Self::RunTests => "Run the full test suite and record pass/fail counts as evidence.",
            Self::Doublecheck => {
                "Re-validate cross-references and review the diff before committing."
            }
            Self::Commit => "Commit the work and record the commit identifier as evidence.",
        }
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoadPhase => write!(f, "load_phase"),
            Self::Explore => write!(f, "explore"),
            Self::WriteTests => write!(f, "write_tests"),
            Self::Implement => write!(f, "implement"),
            Self::RunTests => write!(f, "run_tests"),
            Self::Doublecheck => write!(f, "doublecheck"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

impl std::str::FromStr for WorkflowStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "load_phase" | "loadphase" => Ok(Self::LoadPhase),
            "explore" => Ok(Self::Explore),
            "write_tests" | "writetests" => Ok(Self::WriteTests),
            "implement" => Ok(Self::Implement),
            "run_tests" | "runtests" => Ok(Self::RunTests),
            "doublecheck" => Ok(Self::Doublecheck),
            "commit" => Ok(Self::Commit),
            _ => Err(format!("Invalid workflow step: {}", s)),
        }
    }
}

/// The persisted workflow singleton
///
/// Owned exclusively by the workflow engine; every other component treats
/// it as read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub current_step: WorkflowStep,
    pub iteration: u64,
    #[serde(rename = "timestamp")]
    pub last_updated: DateTime<Utc>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            current_step: WorkflowStep::LoadPhase,
            iteration: 0,
            last_updated: Utc::now(),
        }
    }
}

/// Syntax that produced a reference candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefSyntax {
    /// `Label: path` line inside a traceability block
    TraceabilityBlock,
    /// Markdown `[text](path)` link
    MarkdownLink,
    /// Inline backtick path mention
    InlinePath,
    /// Listed in a companion reference file
    CompanionFile,
}

impl std::fmt::Display for RefSyntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TraceabilityBlock => write!(f, "traceability_block"),
            Self::MarkdownLink => write!(f, "markdown_link"),
            Self::InlinePath => write!(f, "inline_path"),
            Self::CompanionFile => write!(f, "companion_file"),
        }
    }
}

/// A candidate file-path reference extracted from one file
///
/// Immutable once extracted. `target_path` is the raw string as written;
/// normalization happens at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Root-relative path of the file the reference is attributed to
    pub source_file: PathBuf,
    /// The raw target string as written in the source
    pub target_path: String,
    /// 1-based line number of the mention
    pub line_number: usize,
    pub syntax: RefSyntax,
}

/// Error type for a reference that failed to resolve
pub const ERROR_BROKEN_REFERENCE: &str = "BROKEN_REFERENCE";
/// Error type for a file that could not be read during a sweep
pub const ERROR_READ_FAILURE: &str = "READ_FAILURE";

/// A reference that failed to resolve, plus diagnostics
///
/// `target_path` is always the normalized root-relative form so the same
/// logical target reports identically regardless of which file named it.
/// Broken references are recomputed on every sweep and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenReference {
    pub source_file: PathBuf,
    pub target_path: PathBuf,
    pub line_number: usize,
    pub error_type: String,
    pub details: String,
}

/// An evidence record submitted to unlock a phase transition
///
/// Created by the actor performing the work, validated by the gate,
/// consumed read-only when the gate decision is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Phase this record claims to satisfy
    pub phase: String,
    pub timestamp: DateTime<Utc>,
    /// Field name to value; `Value::Null` is the unfilled sentinel.
    /// Flattened so evidence files carry the fields at the top level.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl EvidenceRecord {
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            timestamp: Utc::now(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// A field counts as present only if it exists and is neither null
    /// nor an empty string.
    pub fn is_present(&self, field: &str) -> bool {
        match self.fields.get(field) {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

/// The aggregate persisted as one consistency-checked whole
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompleteSystemState {
    #[serde(default)]
    pub workflow: Option<WorkflowState>,
    /// Task name to node
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskNode>,
    /// Ordered project phases
    #[serde(default)]
    pub phases: Vec<ProjectPhase>,
    /// Evidence history, newest last
    #[serde(default)]
    pub evidence: Vec<EvidenceRecord>,
}

/// Severity of a classified discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryLevel {
    Note,
    Concern,
    Critical,
}

/// Effect a discovery has on the running workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowImpact {
    None,
    ReviewNeeded,
    Halt,
}

/// Structured output of the content-understanding collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    pub level: DiscoveryLevel,
    pub workflow_impact: WorkflowImpact,
    pub is_blocking: bool,
    /// Classifier confidence, 0.0 - 1.0
    pub confidence: f32,
}

/// Pluggable content-understanding capability
///
/// The engine only consumes the structured output; what a discovery means
/// semantically is entirely the classifier's judgment. Implementations may
/// be rule-based or model-backed behind the same contract.
pub trait ContentClassifier {
    fn classify(&self, text: &str) -> Discovery;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_workflow_cycle_length_is_seven() {
        let mut step = WorkflowStep::LoadPhase;
        for _ in 0..7 {
            step = step.next();
        }
        assert_eq!(step, WorkflowStep::Explore);
    }

    #[test]
    fn test_workflow_first_transitions() {
        let s1 = WorkflowStep::LoadPhase.next();
        let s2 = s1.next();
        let s3 = s2.next();
        assert_eq!(s1, WorkflowStep::Explore);
        assert_eq!(s2, WorkflowStep::WriteTests);
        assert_eq!(s3, WorkflowStep::Implement);
    }

    #[test]
    fn test_workflow_step_roundtrip() {
        for step in [
            WorkflowStep::LoadPhase,
            WorkflowStep::Explore,
            WorkflowStep::WriteTests,
            WorkflowStep::Implement,
            WorkflowStep::RunTests,
            WorkflowStep::Doublecheck,
            WorkflowStep::Commit,
        ] {
            let parsed = WorkflowStep::from_str(&step.to_string()).unwrap();
            assert_eq!(parsed, step);
        }
    }

    #[test]
    fn test_task_status_parsing() {
        assert_eq!(
            TaskStatus::from_str("in_progress").unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!(TaskStatus::from_str("DONE").unwrap(), TaskStatus::Complete);
        assert!(TaskStatus::from_str("unknown").is_err());
    }

    #[test]
    fn test_evidence_presence_sentinel() {
        let record = EvidenceRecord::new("run_tests")
            .with_field("test_results", serde_json::json!("42 passed"))
            .with_field("tests_passed", serde_json::Value::Null)
            .with_field("notes", serde_json::json!(""));

        assert!(record.is_present("test_results"));
        assert!(!record.is_present("tests_passed"));
        assert!(!record.is_present("notes"));
        assert!(!record.is_present("absent"));
    }

    #[test]
    fn test_workflow_state_serde() {
        let state = WorkflowState::default();
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"load_phase\""));
        let back: WorkflowState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.current_step, WorkflowStep::LoadPhase);
        assert_eq!(back.iteration, 0);
    }
}
