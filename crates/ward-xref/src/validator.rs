//! Full-project cross-reference sweep
//!
//! Walks the project tree top-down, applies the extractor and resolver to
//! every non-skipped file, and aggregates broken references into a single
//! report. The sweep always completes and reports: unreadable files
//! become report entries, never aborts. Only a missing root is fatal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use ward_core::{BrokenReference, Result, WardError, ERROR_READ_FAILURE};

use crate::extract::{extract, FileKind, COMPANION_SUFFIX};
use crate::resolve::{ResolveOutcome, Resolver};

const PROSE_EXTENSIONS: &[&str] = &["md", "markdown", "rst", "txt"];
const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "ts", "go", "java", "c", "h", "cpp", "sh",
];

/// Configuration for one sweep
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub root: PathBuf,
    /// Directory names excluded entirely, as containers and as entries
    pub skip_dirs: Vec<String>,
    /// Caller-supplied time budget; on exhaustion the partial report is
    /// returned with `timed_out` set
    pub time_budget: Duration,
}

impl SweepConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            skip_dirs: ward_core::WardConfig::default().skip_dirs,
            time_budget: Duration::from_secs(60),
        }
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }
}

/// Aggregated result of one sweep
///
/// Recomputed from disk on every run; never persisted across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub broken: Vec<BrokenReference>,
    pub files_scanned: usize,
    /// True if the time budget ran out; callers must not assume the
    /// report is complete
    pub timed_out: bool,
    pub started_at: DateTime<Utc>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.broken.is_empty() && !self.timed_out
    }
}

/// Run a full-tree sweep
pub fn sweep(config: &SweepConfig) -> Result<SweepReport> {
    let resolver = Resolver::new(&config.root)?;
    let deadline = Instant::now() + config.time_budget;

    let mut report = SweepReport {
        broken: Vec::new(),
        files_scanned: 0,
        timed_out: false,
        started_at: Utc::now(),
    };

    let skip = config.skip_dirs.clone();
    let skip_root = config.root.clone();
    let walker = WalkDir::new(&config.root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            // Judge only the segments below the root; the root's own
            // ancestors may legitimately contain skip names
            let below = entry.path().strip_prefix(&skip_root).unwrap_or(entry.path());
            !is_skipped(below, &skip)
        });

    for entry in walker {
        if Instant::now() >= deadline {
            warn!("Sweep time budget exhausted, returning partial report");
            report.timed_out = true;
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Unreadable directory entries are findings, not aborts
                let path = e
                    .path()
                    .and_then(|p| p.strip_prefix(&config.root).ok())
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                report.broken.push(read_failure(path, e.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(&config.root)
            .map_err(|e| WardError::Other(format!("Path outside root: {}", e)))?
            .to_path_buf();

        let Some(kind) = classify(&relative) else {
            continue;
        };

        report.files_scanned += 1;
        let text = match std::fs::read_to_string(entry.path()) {
            Ok(text) => text,
            Err(e) => {
                report
                    .broken
                    .push(read_failure(relative, format!("Failed to read file: {}", e)));
                continue;
            }
        };

        for reference in extract(&text, kind, &relative) {
            if let ResolveOutcome::Broken(broken) = resolver.resolve(&reference) {
                debug!(
                    source = %broken.source_file.display(),
                    target = %broken.target_path.display(),
                    "Broken reference"
                );
                report.broken.push(broken);
            }
        }
    }

    info!(
        files_scanned = report.files_scanned,
        broken = report.broken.len(),
        timed_out = report.timed_out,
        "Sweep complete"
    );
    Ok(report)
}

/// Skip predicate: any path segment matching a skip name excludes the
/// path, both as a container and as an individual entry.
fn is_skipped(path: &Path, skip_dirs: &[String]) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|name| skip_dirs.iter().any(|skip| skip == name))
            .unwrap_or(false)
    })
}

/// Dispatch a file to the extractor mode for its kind, or skip it
fn classify(path: &Path) -> Option<FileKind> {
    let name = path.file_name()?.to_str()?;
    if name.ends_with(COMPANION_SUFFIX) {
        return Some(FileKind::Companion);
    }
    let ext = path.extension()?.to_str()?.to_lowercase();
    if PROSE_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileKind::Prose)
    } else if SOURCE_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileKind::Source)
    } else {
        None
    }
}

fn read_failure(path: PathBuf, details: String) -> BrokenReference {
    BrokenReference {
        source_file: path.clone(),
        target_path: path,
        line_number: 0,
        error_type: ERROR_READ_FAILURE.to_string(),
        details,
    }
}

/// Render the human-readable error report document
pub fn render_report(report: &SweepReport) -> String {
    let mut out = String::new();
    out.push_str("CROSS-REFERENCE VALIDATION REPORT\n");
    out.push_str("=================================\n");
    out.push_str(&format!(
        "Generated: {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("Files scanned: {}\n", report.files_scanned));
    out.push_str(&format!("Broken references: {}\n", report.broken.len()));
    if report.timed_out {
        out.push_str("WARNING: time budget exhausted, report is partial\n");
    }
    out.push('\n');

    if report.broken.is_empty() {
        out.push_str("No broken references found.\n");
    } else {
        out.push_str("BROKEN REFERENCES\n");
        out.push_str("-----------------\n");
        for broken in &report.broken {
            out.push_str(&format!(
                "source_file: {}\ntarget_path: {}\nline_number: {}\nerror_type: {}\ndetails: {}\n\n",
                broken.source_file.display(),
                broken.target_path.display(),
                broken.line_number,
                broken.error_type,
                broken.details,
            ));
        }
    }

    out.push_str("RESOLUTION STEPS\n");
    out.push_str("----------------\n");
    out.push_str("1. Open the source file at the listed line number.\n");
    out.push_str("2. Fix the path, or create the missing target file.\n");
    out.push_str("3. If the target was intentionally removed, delete the mention.\n");
    out.push_str("4. Re-run the sweep; reports are recomputed from scratch each run.\n");
    out
}

/// Write the rendered report under the error-log directory
///
/// One file per run, named from the sweep start time, so repeated runs
/// land predictably instead of accumulating garbage.
pub fn write_report(report: &SweepReport, root: &Path, error_log_dir: &Path) -> Result<PathBuf> {
    let dir = root.join(error_log_dir);
    std::fs::create_dir_all(&dir)?;

    let filename = format!(
        "xref-report-{}.txt",
        report.started_at.format("%Y%m%d-%H%M%S")
    );
    let path = dir.join(filename);
    std::fs::write(&path, render_report(report))?;
    info!(path = %path.display(), "Wrote sweep report");
    Ok(path)
}
