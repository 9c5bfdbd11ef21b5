//! Workflow state machine
//!
//! A fixed-transition-table machine over the seven workflow steps. The
//! table and instruction generation are pure; this module adds the
//! persisted singleton and the `advance` operation around them.

use chrono::Utc;
use tracing::{info, warn};
use ward_core::{Result, WorkflowState, WorkflowStep};
use ward_store::{ConsistencyWarning, StateStore};

/// Generic fallback for step names outside the fixed table
const FALLBACK_INSTRUCTION: &str =
    "Unknown workflow step; review the persisted state and continue from load_phase.";

/// Instruction lookup by step name, with a generic fallback for unknown
/// names.
pub fn instruction_for(step_name: &str) -> &'static str {
    step_name
        .parse::<WorkflowStep>()
        .map(WorkflowStep::instruction)
        .unwrap_or(FALLBACK_INSTRUCTION)
}

/// Result of one `advance` call
#[derive(Debug, Clone)]
pub struct AdvanceOutcome {
    pub previous: WorkflowStep,
    pub next: WorkflowStep,
    /// Total advances performed since the state was created
    pub iteration: u64,
    /// Instruction associated with the *next* step
    pub instruction: &'static str,
    /// Consistency warnings surfaced while loading persisted state
    pub warnings: Vec<ConsistencyWarning>,
}

/// The workflow state machine with its persisted singleton
///
/// Owns the [`WorkflowState`] exclusively; every other component treats
/// that state as read-only. Designed for single-writer use; concurrent
/// drivers get last-writer-wins.
pub struct WorkflowEngine {
    store: StateStore,
}

impl WorkflowEngine {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    /// Read the current persisted state without mutating it
    pub fn current(&self) -> (WorkflowState, Vec<ConsistencyWarning>) {
        self.store.load_workflow()
    }

    /// Advance one step: load, transition, persist, instruct
    ///
    /// Unset or corrupt persisted state falls back to the `load_phase`
    /// default; the fallback is surfaced through `warnings`.
    pub fn advance(&self) -> Result<AdvanceOutcome> {
        let (state, warnings) = self.store.load_workflow();
        for warning in &warnings {
            warn!(%warning, "Workflow state fell back to default");
        }

        let previous = state.current_step;
        let next = previous.next();
        let updated = WorkflowState {
            current_step: next,
            iteration: state.iteration + 1,
            last_updated: Utc::now(),
        };
        self.store.save_workflow(&updated)?;

        info!(from = %previous, to = %next, iteration = updated.iteration, "Workflow advanced");
        Ok(AdvanceOutcome {
            previous,
            next,
            iteration: updated.iteration,
            instruction: next.instruction(),
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> (tempfile::TempDir, WorkflowEngine) {
        let dir = tempfile::tempdir().unwrap();
        let engine = WorkflowEngine::new(StateStore::new(dir.path().join("state")));
        (dir, engine)
    }

    #[test]
    fn test_first_three_advances_from_unset_state() {
        let (_dir, engine) = engine();
        let steps: Vec<WorkflowStep> =
            (0..3).map(|_| engine.advance().unwrap().next).collect();
        assert_eq!(
            steps,
            vec![
                WorkflowStep::Explore,
                WorkflowStep::WriteTests,
                WorkflowStep::Implement
            ]
        );
    }

    #[test]
    fn test_seven_advances_close_the_cycle() {
        let (_dir, engine) = engine();
        let mut last = WorkflowStep::LoadPhase;
        for _ in 0..7 {
            last = engine.advance().unwrap().next;
        }
        assert_eq!(last, WorkflowStep::Explore);

        let (state, _) = engine.current();
        assert_eq!(state.iteration, 7);
    }

    #[test]
    fn test_instruction_matches_next_step() {
        let (_dir, engine) = engine();
        let outcome = engine.advance().unwrap();
        assert_eq!(outcome.next, WorkflowStep::Explore);
        assert_eq!(outcome.instruction, WorkflowStep::Explore.instruction());
    }

    #[test]
    fn test_corrupt_state_surfaces_warning_and_defaults() {
        let (_dir, engine) = engine();
        std::fs::create_dir_all(engine.store.state_dir()).unwrap();
        std::fs::write(
            engine.store.state_dir().join("workflow.json"),
            "{\"current_step\": \"summon_demons\"}",
        )
        .unwrap();

        let outcome = engine.advance().unwrap();
        assert!(!outcome.warnings.is_empty());
        // Fell back to load_phase, so the advance lands on explore
        assert_eq!(outcome.previous, WorkflowStep::LoadPhase);
        assert_eq!(outcome.next, WorkflowStep::Explore);
    }

    #[test]
    fn test_instruction_fallback_for_unknown_names() {
        assert_eq!(instruction_for("explore"), WorkflowStep::Explore.instruction());
        assert_eq!(instruction_for("not_a_step"), FALLBACK_INSTRUCTION);
    }
}
