//! # ward-gate
//!
//! Workflow gating for ward.
//!
//! This crate provides:
//! - The evidence gate: schema-driven validation of evidence records
//!   before a phase transition is allowed
//! - The workflow state machine: a fixed cyclic transition table with
//!   persisted state and deterministic instruction generation
//! - The task graph: dependency-derived task status with no cached state
//! - A rule-based default for the pluggable content classifier

mod classify;
mod evidence;
mod graph;
mod workflow;

pub use classify::KeywordClassifier;
pub use evidence::{EvidenceSchema, GateResult, PhaseRequirements};
pub use graph::TaskGraph;
pub use workflow::{instruction_for, AdvanceOutcome, WorkflowEngine};
