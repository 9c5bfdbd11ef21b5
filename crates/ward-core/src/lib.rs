//! # ward-core
//!
//! Core types for ward, a workflow-gating and integrity-checking engine
//! for documentation-driven development.
//!
//! Ward tracks a graph of dependent work items, requires verifiable
//! evidence before each phase transition, and keeps the project's
//! documentation/code cross-reference graph from going stale.
//!
//! ## Core Paradigm
//!
//! - Phase transitions are gated on evidence, not trust
//! - Task status is derived from the dependency closure, never cached
//! - Reference validation is stateless: every sweep recomputes from disk
//! - Content understanding is delegated to a pluggable classifier

mod config;
mod error;
mod types;

pub use config::WardConfig;
pub use error::{Result, WardError};
pub use types::*;
