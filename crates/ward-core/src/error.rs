//! Unified error types for ward

use thiserror::Error;

/// Unified error type for all ward operations
///
/// Broken references and missing evidence fields are deliberately NOT
/// variants here: they are findings carried in reports and gate results,
/// never raised as errors.
#[derive(Error, Debug)]
pub enum WardError {
    /// Fatal: missing or invalid project root, malformed schema
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Fatal at graph-build time: a task names a dependency that does not exist
    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    /// Persisted state failed structural validation on load
    ///
    /// Recoverable: callers fall back to a default state but must surface
    /// this as a warning, never swallow it.
    #[error("State consistency error: {0}")]
    StateConsistency(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using WardError
pub type Result<T> = std::result::Result<T, WardError>;
