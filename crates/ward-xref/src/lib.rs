//! # ward-xref
//!
//! Cross-reference integrity checking for ward.
//!
//! This crate provides:
//! - Reference extraction from traceability blocks, markdown links,
//!   inline path mentions, and companion reference files
//! - Resolution of candidates against a project root
//! - A full-tree sweep that aggregates broken references into a report
//!
//! Validation is stateless and idempotent: every sweep recomputes from
//! disk, and broken references are never persisted across runs.

mod extract;
mod resolve;
mod validator;

pub use extract::{extract, is_file_reference, FileKind, COMPANION_SUFFIX};
pub use resolve::{ResolveOutcome, Resolver};
pub use validator::{render_report, sweep, write_report, SweepConfig, SweepReport};
