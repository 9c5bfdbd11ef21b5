//! State store implementation

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use ward_core::{
    CompleteSystemState, EvidenceRecord, PhaseStatus, Result, TaskNode, WardError, WorkflowState,
};

const WORKFLOW_FILE: &str = "workflow.json";
const TASKS_FILE: &str = "tasks.json";
const PHASES_FILE: &str = "phases.json";

/// A consistency problem found while loading persisted state
///
/// Carried alongside the loaded (or defaulted) value; callers decide how
/// loudly to surface it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyWarning {
    /// State file the problem was found in
    pub file: String,
    pub detail: String,
}

impl std::fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.file, self.detail)
    }
}

/// Durable, atomic persistence for ward state files
#[derive(Debug, Clone)]
pub struct StateStore {
    state_dir: PathBuf,
}

impl StateStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn workflow_path(&self) -> PathBuf {
        self.state_dir.join(WORKFLOW_FILE)
    }

    fn tasks_path(&self) -> PathBuf {
        self.state_dir.join(TASKS_FILE)
    }

    fn phases_path(&self) -> PathBuf {
        self.state_dir.join(PHASES_FILE)
    }

    fn evidence_path(&self, phase: &str) -> PathBuf {
        self.state_dir.join(format!("evidence-{}.json", phase))
    }

    /// Load the workflow singleton, defaulting on missing or corrupt state
    pub fn load_workflow(&self) -> (WorkflowState, Vec<ConsistencyWarning>) {
        let mut warnings = Vec::new();
        let state = self
            .load_json::<WorkflowState>(&self.workflow_path(), WORKFLOW_FILE, &mut warnings)
            .unwrap_or_default();
        (state, warnings)
    }

    pub fn save_workflow(&self, state: &WorkflowState) -> Result<()> {
        self.save_json(&self.workflow_path(), state)
    }

    /// Load the persisted task graph nodes, defaulting to empty
    pub fn load_tasks(&self) -> (BTreeMap<String, TaskNode>, Vec<ConsistencyWarning>) {
        let mut warnings = Vec::new();
        let tasks = self
            .load_json::<BTreeMap<String, TaskNode>>(&self.tasks_path(), TASKS_FILE, &mut warnings)
            .unwrap_or_default();

        // Dependency closure check: unknown names are structural corruption
        for (name, node) in &tasks {
            for dep in &node.dependencies {
                if !tasks.contains_key(dep) {
                    warnings.push(ConsistencyWarning {
                        file: TASKS_FILE.to_string(),
                        detail: format!("Task '{}' depends on unknown task '{}'", name, dep),
                    });
                }
            }
        }
        (tasks, warnings)
    }

    pub fn save_tasks(&self, tasks: &BTreeMap<String, TaskNode>) -> Result<()> {
        self.save_json(&self.tasks_path(), tasks)
    }

    /// Load the ordered project phases, defaulting to empty
    pub fn load_phases(&self) -> (Vec<ward_core::ProjectPhase>, Vec<ConsistencyWarning>) {
        let mut warnings = Vec::new();
        let phases = self
            .load_json::<Vec<ward_core::ProjectPhase>>(
                &self.phases_path(),
                PHASES_FILE,
                &mut warnings,
            )
            .unwrap_or_default();
        (phases, warnings)
    }

    pub fn save_phases(&self, phases: &[ward_core::ProjectPhase]) -> Result<()> {
        self.save_json(&self.phases_path(), &phases)
    }

    /// Load the evidence record for one phase, if any was persisted
    pub fn load_evidence(&self, phase: &str) -> (Option<EvidenceRecord>, Vec<ConsistencyWarning>) {
        let path = self.evidence_path(phase);
        if !path.exists() {
            return (None, Vec::new());
        }
        let mut warnings = Vec::new();
        let file = format!("evidence-{}.json", phase);
        let record = self.load_json::<EvidenceRecord>(&path, &file, &mut warnings);
        if let Some(record) = &record {
            if record.phase != phase {
                warnings.push(ConsistencyWarning {
                    file,
                    detail: format!(
                        "Evidence file claims phase '{}' but was stored for '{}'",
                        record.phase, phase
                    ),
                });
            }
        }
        (record, warnings)
    }

    pub fn save_evidence(&self, record: &EvidenceRecord) -> Result<()> {
        self.save_json(&self.evidence_path(&record.phase), record)
    }

    /// Load the aggregate system state, checked as one whole
    pub fn load_system(&self) -> (CompleteSystemState, Vec<ConsistencyWarning>) {
        let (workflow, mut warnings) = self.load_workflow();
        let (tasks, task_warnings) = self.load_tasks();
        warnings.extend(task_warnings);
        let (phases, phase_warnings) = self.load_phases();
        warnings.extend(phase_warnings);

        let mut evidence = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&self.state_dir) {
            let mut paths: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with("evidence-") && n.ends_with(".json"))
                        .unwrap_or(false)
                })
                .collect();
            paths.sort();
            for path in paths {
                let file = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if let Some(record) = self.load_json::<EvidenceRecord>(&path, &file, &mut warnings)
                {
                    evidence.push(record);
                }
            }
        }
        evidence.sort_by_key(|r| r.timestamp);

        let state = CompleteSystemState {
            workflow: Some(workflow),
            tasks,
            phases,
            evidence,
        };
        warnings.extend(check_phase_ordering(&state));
        (state, warnings)
    }

    /// Persist the aggregate; each member file is replaced atomically
    pub fn save_system(&self, state: &CompleteSystemState) -> Result<()> {
        if let Some(workflow) = &state.workflow {
            self.save_workflow(workflow)?;
        }
        self.save_tasks(&state.tasks)?;
        self.save_phases(&state.phases)?;
        for record in &state.evidence {
            self.save_evidence(record)?;
        }
        Ok(())
    }

    fn load_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &Path,
        file: &str,
        warnings: &mut Vec<ConsistencyWarning>,
    ) -> Option<T> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(file, "State file not found, using default");
                return None;
            }
            Err(e) => {
                warnings.push(ConsistencyWarning {
                    file: file.to_string(),
                    detail: WardError::StateConsistency(format!("Unreadable state file: {}", e))
                        .to_string(),
                });
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(file, error = %e, "Corrupt state file, falling back to default");
                warnings.push(ConsistencyWarning {
                    file: file.to_string(),
                    detail: WardError::StateConsistency(format!(
                        "Failed structural validation: {}",
                        e
                    ))
                    .to_string(),
                });
                None
            }
        }
    }

    /// Atomic replace: write to a temp file in the state directory, then
    /// rename over the target.
    fn save_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.state_dir)?;

        let data = serde_json::to_string_pretty(value)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.state_dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| WardError::Io(e.error))?;
        debug!(path = %path.display(), "State file replaced atomically");
        Ok(())
    }
}

/// Phases complete in order: a later phase cannot be complete while an
/// earlier one is pending.
fn check_phase_ordering(state: &CompleteSystemState) -> Vec<ConsistencyWarning> {
    let mut warnings = Vec::new();
    let mut seen_pending: Option<&str> = None;
    for phase in &state.phases {
        match phase.status {
            PhaseStatus::Pending => {
                seen_pending.get_or_insert(phase.name.as_str());
            }
            PhaseStatus::Complete => {
                if let Some(pending) = seen_pending {
                    warnings.push(ConsistencyWarning {
                        file: PHASES_FILE.to_string(),
                        detail: format!(
                            "Phase '{}' is complete but earlier phase '{}' is still pending",
                            phase.name, pending
                        ),
                    });
                }
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use ward_core::{ProjectPhase, WorkflowStep};

    fn store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state"));
        (dir, store)
    }

    #[test]
    fn test_workflow_roundtrip() {
        let (_dir, store) = store();
        let mut state = WorkflowState::default();
        state.current_step = WorkflowStep::Implement;
        state.iteration = 4;

        store.save_workflow(&state).unwrap();
        let (loaded, warnings) = store.load_workflow();
        assert_eq!(loaded.current_step, WorkflowStep::Implement);
        assert_eq!(loaded.iteration, 4);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_state_defaults_without_warning() {
        let (_dir, store) = store();
        let (state, warnings) = store.load_workflow();
        assert_eq!(state.current_step, WorkflowStep::LoadPhase);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_corrupt_state_defaults_with_warning() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.state_dir()).unwrap();
        std::fs::write(store.state_dir().join(WORKFLOW_FILE), "{not json").unwrap();

        let (state, warnings) = store.load_workflow();
        assert_eq!(state.current_step, WorkflowStep::LoadPhase);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].detail.contains("State consistency error"));
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let (_dir, store) = store();
        store.save_workflow(&WorkflowState::default()).unwrap();

        let entries: Vec<String> = std::fs::read_dir(store.state_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec![WORKFLOW_FILE.to_string()]);
    }

    #[test]
    fn test_tasks_roundtrip_and_dependency_check() {
        let (_dir, store) = store();
        let mut tasks = BTreeMap::new();
        tasks.insert("a".to_string(), TaskNode::new("first"));
        tasks.insert(
            "b".to_string(),
            TaskNode::new("second").with_dependencies(["a"]),
        );
        store.save_tasks(&tasks).unwrap();

        let (loaded, warnings) = store.load_tasks();
        assert_eq!(loaded.len(), 2);
        assert!(warnings.is_empty());

        // Now corrupt the closure
        let mut bad = loaded;
        bad.insert(
            "c".to_string(),
            TaskNode::new("dangling").with_dependencies(["ghost"]),
        );
        store.save_tasks(&bad).unwrap();
        let (_, warnings) = store.load_tasks();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].detail.contains("ghost"));
    }

    #[test]
    fn test_evidence_roundtrip_flattened_fields() {
        let (_dir, store) = store();
        let record = EvidenceRecord::new("run_tests")
            .with_field("test_results", serde_json::json!("40 passed, 0 failed"))
            .with_field("tests_passed", serde_json::json!(40));
        store.save_evidence(&record).unwrap();

        // Fields live at the top level of the JSON document
        let raw =
            std::fs::read_to_string(store.state_dir().join("evidence-run_tests.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["tests_passed"], serde_json::json!(40));
        assert_eq!(value["phase"], serde_json::json!("run_tests"));

        let (loaded, warnings) = store.load_evidence("run_tests");
        assert!(warnings.is_empty());
        assert!(loaded.unwrap().is_present("test_results"));
    }

    #[test]
    fn test_evidence_phase_mismatch_warns() {
        let (_dir, store) = store();
        let record = EvidenceRecord::new("commit");
        store.save_evidence(&record).unwrap();
        std::fs::rename(
            store.state_dir().join("evidence-commit.json"),
            store.state_dir().join("evidence-explore.json"),
        )
        .unwrap();

        let (loaded, warnings) = store.load_evidence("explore");
        assert!(loaded.is_some());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_system_aggregate_roundtrip() {
        let (_dir, store) = store();
        let mut tasks = BTreeMap::new();
        tasks.insert("a".to_string(), TaskNode::new("only"));
        let state = CompleteSystemState {
            workflow: Some(WorkflowState::default()),
            tasks,
            phases: vec![ProjectPhase::pending("phase_1")],
            evidence: vec![EvidenceRecord::new("explore")],
        };
        store.save_system(&state).unwrap();

        let (loaded, warnings) = store.load_system();
        assert!(warnings.is_empty());
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.phases.len(), 1);
        assert_eq!(loaded.evidence.len(), 1);
        assert_eq!(loaded.evidence[0].phase, "explore");
    }

    #[test]
    fn test_phase_ordering_invariant() {
        let state = CompleteSystemState {
            workflow: None,
            tasks: BTreeMap::new(),
            phases: vec![
                ProjectPhase {
                    name: "phase_1".to_string(),
                    status: PhaseStatus::Pending,
                },
                ProjectPhase {
                    name: "phase_2".to_string(),
                    status: PhaseStatus::Complete,
                },
            ],
            evidence: Vec::new(),
        };
        let warnings = check_phase_ordering(&state);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].detail.contains("phase_2"));
    }
}
