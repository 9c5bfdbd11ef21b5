//! # ward-store
//!
//! Durable persistence for ward state: workflow step, task graph, and
//! evidence records, stored as JSON files under a state directory.
//!
//! Every write is a full-file atomic replace (write to a temp file in
//! the same directory, then rename into place), so a reader never
//! observes a partially written state file. The process model assumes a
//! single driver at a time; concurrent drivers get last-writer-wins
//! semantics, which is a documented limitation, not an invariant.
//!
//! Loads never fail on corrupt state: they fall back to a safe default
//! and surface the problem as a [`ConsistencyWarning`], never silently.

mod store;

pub use store::{ConsistencyWarning, StateStore};
