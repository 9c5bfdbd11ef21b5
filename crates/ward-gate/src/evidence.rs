//! Evidence gate
//!
//! Holds the per-phase evidence schema and validates submitted records
//! against it. Validation is a pure function over its inputs: the record
//! is consumed read-only and never mutated by the gate.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use ward_core::EvidenceRecord;

/// Required and optional field names for one phase
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseRequirements {
    pub required: BTreeSet<String>,
    pub optional: BTreeSet<String>,
}

impl PhaseRequirements {
    pub fn new<R, O, S>(required: R, optional: O) -> Self
    where
        R: IntoIterator<Item = S>,
        O: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
            optional: optional.into_iter().map(Into::into).collect(),
        }
    }
}

/// Structured result of one gate check
///
/// Missing required fields fail validation; missing optional fields are
/// reported but never fail it. Returned as data, never raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    pub valid: bool,
    pub present_fields: Vec<String>,
    pub missing_required: Vec<String>,
    pub missing_optional: Vec<String>,
}

/// Per-phase evidence schema table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSchema {
    phases: BTreeMap<String, PhaseRequirements>,
}

impl EvidenceSchema {
    pub fn empty() -> Self {
        Self {
            phases: BTreeMap::new(),
        }
    }

    /// The built-in schema for the workflow cycle's phases
    pub fn builtin() -> Self {
        let mut phases = BTreeMap::new();
        phases.insert(
            "explore".to_string(),
            PhaseRequirements::new(["findings"], ["open_questions"]),
        );
        phases.insert(
            "write_tests".to_string(),
            PhaseRequirements::new(["test_files"], ["coverage_notes"]),
        );
        phases.insert(
            "implement".to_string(),
            PhaseRequirements::new(["files_changed"], ["design_notes"]),
        );
        phases.insert(
            "run_tests".to_string(),
            PhaseRequirements::new(["test_results", "tests_passed"], ["tests_failed"]),
        );
        phases.insert(
            "doublecheck".to_string(),
            PhaseRequirements::new(["xref_clean"], ["review_notes"]),
        );
        phases.insert(
            "commit".to_string(),
            PhaseRequirements::new(["commit_id"], ["commit_message"]),
        );
        Self { phases }
    }

    pub fn set_phase(&mut self, phase: impl Into<String>, requirements: PhaseRequirements) {
        self.phases.insert(phase.into(), requirements);
    }

    pub fn requirements(&self, phase: &str) -> Option<&PhaseRequirements> {
        self.phases.get(phase)
    }

    /// Validate an evidence record against the schema for `phase`
    ///
    /// A phase absent from the table is trivially satisfied. This is a
    /// deliberate permissive default: unknown phases are not blocking.
    pub fn validate(&self, record: &EvidenceRecord, phase: &str) -> GateResult {
        let Some(requirements) = self.phases.get(phase) else {
            debug!(phase, "No evidence schema for phase, trivially valid");
            return GateResult {
                valid: true,
                present_fields: record.fields.keys().cloned().collect(),
                missing_required: Vec::new(),
                missing_optional: Vec::new(),
            };
        };

        let mut present_fields = Vec::new();
        let mut missing_required = Vec::new();
        let mut missing_optional = Vec::new();

        for field in &requirements.required {
            if record.is_present(field) {
                present_fields.push(field.clone());
            } else {
                missing_required.push(field.clone());
            }
        }
        for field in &requirements.optional {
            if record.is_present(field) {
                present_fields.push(field.clone());
            } else {
                missing_optional.push(field.clone());
            }
        }

        GateResult {
            valid: missing_required.is_empty(),
            present_fields,
            missing_required,
            missing_optional,
        }
    }

    /// Build a skeleton record for `phase` with every required field set
    /// to the null sentinel, for the caller to fill in.
    pub fn scaffold(&self, phase: &str) -> EvidenceRecord {
        let mut record = EvidenceRecord::new(phase);
        if let Some(requirements) = self.phases.get(phase) {
            for field in &requirements.required {
                record
                    .fields
                    .insert(field.clone(), serde_json::Value::Null);
            }
        }
        record
    }
}

impl Default for EvidenceSchema {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_field_fails() {
        let schema = EvidenceSchema::builtin();
        let record = EvidenceRecord::new("run_tests")
            .with_field("test_results", serde_json::json!("40 passed"));

        let result = schema.validate(&record, "run_tests");
        assert!(!result.valid);
        assert_eq!(result.missing_required, vec!["tests_passed".to_string()]);
    }

    #[test]
    fn test_all_required_present_is_valid_regardless_of_optional() {
        let schema = EvidenceSchema::builtin();
        let record = EvidenceRecord::new("run_tests")
            .with_field("test_results", serde_json::json!("40 passed"))
            .with_field("tests_passed", serde_json::json!(40));

        let result = schema.validate(&record, "run_tests");
        assert!(result.valid);
        assert!(result.missing_required.is_empty());
        // Optional absence is reported, never failing
        assert_eq!(result.missing_optional, vec!["tests_failed".to_string()]);
    }

    #[test]
    fn test_null_sentinel_is_not_present() {
        let schema = EvidenceSchema::builtin();
        let record = EvidenceRecord::new("run_tests")
            .with_field("test_results", serde_json::Value::Null)
            .with_field("tests_passed", serde_json::json!(""));

        let result = schema.validate(&record, "run_tests");
        assert!(!result.valid);
        assert_eq!(result.missing_required.len(), 2);
    }

    #[test]
    fn test_unknown_phase_is_trivially_valid() {
        let schema = EvidenceSchema::builtin();
        let record = EvidenceRecord::new("phase_99");
        let result = schema.validate(&record, "phase_99");
        assert!(result.valid);
        assert!(result.missing_required.is_empty());
    }

    #[test]
    fn test_scaffold_has_null_required_fields() {
        let schema = EvidenceSchema::builtin();
        let record = schema.scaffold("run_tests");

        assert_eq!(record.phase, "run_tests");
        assert_eq!(
            record.fields.get("tests_passed"),
            Some(&serde_json::Value::Null)
        );
        assert_eq!(
            record.fields.get("test_results"),
            Some(&serde_json::Value::Null)
        );
        // A fresh scaffold never passes its own gate
        assert!(!schema.validate(&record, "run_tests").valid);
    }

    #[test]
    fn test_validation_is_pure() {
        let schema = EvidenceSchema::builtin();
        let record = EvidenceRecord::new("commit");
        let before = record.clone();
        let _ = schema.validate(&record, "commit");
        assert_eq!(record, before);
    }
}
