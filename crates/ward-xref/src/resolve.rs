//! Reference resolution
//!
//! Resolves extracted candidates against the project root. The reported
//! target for a broken reference is always the normalized root-relative
//! form, so the same logical target reports identically regardless of
//! which file referenced it.

use std::path::{Component, Path, PathBuf};
use ward_core::{BrokenReference, Reference, Result, WardError, ERROR_BROKEN_REFERENCE};

/// Outcome of resolving one reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Normalized root-relative path of an existing regular file
    Resolved(PathBuf),
    Broken(BrokenReference),
}

/// Resolves references against a project root
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
}

impl Resolver {
    /// Create a resolver for `root`
    ///
    /// A missing root directory is a fatal configuration error.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(WardError::Configuration(format!(
                "Project root does not exist or is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve one reference
    ///
    /// Rules, in order: strip a single leading separator (root-relative),
    /// try relative to root, then resolve `../` traversal against the
    /// source file's directory and re-normalize. Only an existing regular
    /// file counts as resolved.
    pub fn resolve(&self, reference: &Reference) -> ResolveOutcome {
        // Anchor fragments are not part of the file path
        let raw = reference
            .target_path
            .split('#')
            .next()
            .unwrap_or(&reference.target_path);
        // Exactly one leading separator marks a root-relative reference
        let stripped = raw.strip_prefix('/').unwrap_or(raw);

        // Root-relative lookup first
        let root_relative = normalize(Path::new(stripped));
        if self.root.join(&root_relative).is_file() {
            return ResolveOutcome::Resolved(root_relative);
        }

        // Relative traversal resolves against the source file's directory
        let normalized = if stripped.starts_with("../") || stripped.starts_with("./") {
            let source_dir = reference
                .source_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let candidate = normalize(&source_dir.join(stripped));
            if self.root.join(&candidate).is_file() {
                return ResolveOutcome::Resolved(candidate);
            }
            candidate
        } else {
            root_relative
        };

        ResolveOutcome::Broken(BrokenReference {
            source_file: reference.source_file.clone(),
            target_path: normalized,
            line_number: reference.line_number,
            error_type: ERROR_BROKEN_REFERENCE.to_string(),
            details: format!(
                "'{}' referenced at line {} does not resolve to an existing file",
                reference.target_path, reference.line_number
            ),
        })
    }
}

/// Lexical normalization: drop `.` segments and fold `..` into the parent.
/// Traversal above the root saturates at the root rather than escaping it.
fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<std::ffi::OsString> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(part) => parts.push(part.to_os_string()),
            Component::RootDir | Component::Prefix(_) => {}
        }
    }
    parts.iter().collect()
}
