//! Reference extraction
//!
//! Scans one unit of text and produces the ordered sequence of candidate
//! file-path references, tagged with the syntax that produced them. The
//! recognized syntaxes are independent and all applied to every
//! applicable file; re-running on the same text always yields the same
//! sequence.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use ward_core::{RefSyntax, Reference};

/// Reserved suffix associating a companion reference file with its target
pub const COMPANION_SUFFIX: &str = ".refs.md";

/// File extensions treated as recognizable in path candidates
const PATH_EXTENSIONS: &[&str] = &[
    "md", "rst", "txt", "rs", "py", "js", "ts", "go", "java", "c", "h", "cpp", "sh", "json",
    "toml", "yaml", "yml", "html", "css", "sql",
];

/// Kind of file being scanned, selecting which syntaxes apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Source file with structured comments (traceability blocks, inline paths)
    Source,
    /// Prose or markup file (traceability blocks, markdown links, inline paths)
    Prose,
    /// Companion reference file (headed "Traceability:" / "Used By:" lists)
    Companion,
}

fn traceability_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Optional comment marker, a title-cased label, then a single path token.
        Regex::new(r"^\s*(?:(?://+|#+|\*+)\s*)?([A-Z][A-Za-z0-9 _-]{0,40}):\s+(\S+)\s*$").unwrap()
    })
}

fn markdown_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\]]*\]\(([^()\s]+)\)").unwrap())
}

fn inline_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").unwrap())
}

/// Whether a candidate string qualifies as a file reference at all
///
/// Rejects URL schemes, bare anchors, and directory references (trailing
/// separator). This predicate says nothing about existence; that is the
/// resolver's job.
pub fn is_file_reference(candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    let lower = candidate.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("mailto:")
    {
        return false;
    }
    if candidate.starts_with('#') {
        return false;
    }
    if candidate.ends_with('/') || candidate.ends_with('\\') {
        return false;
    }
    true
}

/// Whether a token is shaped like a file path: it has a separator or a
/// recognizable extension. Keeps prose words out of traceability labels.
/// Brackets and parens are markup, never part of these path syntaxes.
fn looks_like_path(candidate: &str) -> bool {
    if candidate.contains(['[', ']', '(', ')']) {
        return false;
    }
    if candidate.contains('/') || candidate.contains('\\') {
        return true;
    }
    match candidate.rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && PATH_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// The logical target of a companion reference file, if the name carries
/// the reserved suffix (`settings.json.refs.md` -> `settings.json`).
pub fn companion_target(companion: &Path) -> Option<PathBuf> {
    let name = companion.file_name()?.to_str()?;
    let target_name = name.strip_suffix(COMPANION_SUFFIX)?;
    if target_name.is_empty() {
        return None;
    }
    Some(match companion.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(target_name),
        _ => PathBuf::from(target_name),
    })
}

/// Extract all reference candidates from one file's text
///
/// `source_file` is the root-relative path of the file being scanned.
/// For [`FileKind::Companion`] files the returned references are
/// attributed to the companion's *target* file, not the companion itself.
pub fn extract(text: &str, kind: FileKind, source_file: &Path) -> Vec<Reference> {
    match kind {
        FileKind::Companion => extract_companion(text, source_file),
        FileKind::Source => extract_lines(text, source_file, false),
        FileKind::Prose => extract_lines(text, source_file, true),
    }
}

fn extract_lines(text: &str, source_file: &Path, markdown: bool) -> Vec<Reference> {
    let mut refs = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_number = idx + 1;

        // Traceability block entry: `Label: path`. The syntaxes are
        // independent, so a matching line still flows to the other passes.
        if let Some(caps) = traceability_re().captures(line) {
            let target = trim_punctuation(&caps[2]);
            if is_file_reference(target) && looks_like_path(target) {
                refs.push(Reference {
                    source_file: source_file.to_path_buf(),
                    target_path: target.to_string(),
                    line_number,
                    syntax: RefSyntax::TraceabilityBlock,
                });
            }
        }

        // Markdown links: `[text](path)`
        if markdown {
            for caps in markdown_link_re().captures_iter(line) {
                let target = &caps[1];
                if is_file_reference(target) && looks_like_path(target) {
                    refs.push(Reference {
                        source_file: source_file.to_path_buf(),
                        target_path: target.to_string(),
                        line_number,
                        syntax: RefSyntax::MarkdownLink,
                    });
                }
            }
        }

        // Inline backtick path mentions, only in a files/implementation context
        if has_path_context(line) {
            for caps in inline_code_re().captures_iter(line) {
                let target = caps[1].trim();
                if is_file_reference(target)
                    && target.contains('/')
                    && has_known_extension(target)
                {
                    refs.push(Reference {
                        source_file: source_file.to_path_buf(),
                        target_path: target.to_string(),
                        line_number,
                        syntax: RefSyntax::InlinePath,
                    });
                }
            }
        }
    }

    refs
}

/// Companion sections: a `Traceability:` or `Used By:` heading followed by
/// listed paths until a blank line or the next heading.
fn extract_companion(text: &str, companion_file: &Path) -> Vec<Reference> {
    let attributed = companion_target(companion_file)
        .unwrap_or_else(|| companion_file.to_path_buf());

    let mut refs = Vec::new();
    let mut in_section = false;

    for (idx, line) in text.lines().enumerate() {
        let line_number = idx + 1;
        let trimmed = line.trim().trim_start_matches('#').trim();

        if trimmed.eq_ignore_ascii_case("Traceability:") || trimmed.eq_ignore_ascii_case("Used By:")
        {
            in_section = true;
            continue;
        }
        if trimmed.is_empty() || trimmed.ends_with(':') {
            in_section = false;
            continue;
        }
        if !in_section {
            continue;
        }

        let item = trimmed
            .trim_start_matches(['-', '*'])
            .trim();
        let target = trim_punctuation(item);
        if is_file_reference(target) && looks_like_path(target) {
            refs.push(Reference {
                source_file: attributed.clone(),
                target_path: target.to_string(),
                line_number,
                syntax: RefSyntax::CompanionFile,
            });
        }
    }

    refs
}

/// Whole-word match, so "profile" or "filed" do not open the gate
fn has_path_context(line: &str) -> bool {
    line.split(|c: char| !c.is_alphanumeric()).any(|word| {
        word.eq_ignore_ascii_case("file")
            || word.eq_ignore_ascii_case("files")
            || word.eq_ignore_ascii_case("implementation")
    })
}

fn has_known_extension(candidate: &str) -> bool {
    candidate
        .rsplit_once('.')
        .map(|(_, ext)| PATH_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn trim_punctuation(candidate: &str) -> &str {
    candidate.trim_end_matches([',', ';', '.']).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_prose(text: &str) -> Vec<Reference> {
        extract(text, FileKind::Prose, Path::new("docs/plan.md"))
    }

    #[test]
    fn test_traceability_block_entries() {
        let text = "Traceability:\n\
                    Phase Plan: docs/phases/phase_1.md\n\
                    Architecture: docs/architecture.md\n\
                    Behavior: docs/behavior/gating.md\n";
        let refs = extract_prose(text);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].target_path, "docs/phases/phase_1.md");
        assert_eq!(refs[0].line_number, 2);
        assert!(refs.iter().all(|r| r.syntax == RefSyntax::TraceabilityBlock));
    }

    #[test]
    fn test_traceability_in_source_comments() {
        let text = "// Phase Plan: docs/phases/phase_2.md\n# Behavior: docs/behavior.md\nlet x = 1;\n";
        let refs = extract(text, FileKind::Source, Path::new("src/gate.rs"));
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].target_path, "docs/behavior.md");
    }

    #[test]
    fn test_markdown_links() {
        let text = "See [the plan](docs/plan.md) and [upstream](https://example.com/x.md).\n\
                    Jump to [section](#overview) or [mail us](mailto:a@b.c).\n";
        let refs = extract_prose(text);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].target_path, "docs/plan.md");
        assert_eq!(refs[0].syntax, RefSyntax::MarkdownLink);
    }

    #[test]
    fn test_urls_anchors_mailto_rejected_by_predicate() {
        assert!(!is_file_reference("https://example.com/a.md"));
        assert!(!is_file_reference("http://example.com"));
        assert!(!is_file_reference("mailto:dev@example.com"));
        assert!(!is_file_reference("#section"));
        assert!(!is_file_reference("docs/"));
        assert!(!is_file_reference(""));
        assert!(is_file_reference("docs/plan.md"));
        assert!(is_file_reference("/docs/plan.md"));
    }

    #[test]
    fn test_inline_path_requires_context() {
        let with_context = "Implementation files: `src/gate.rs` and `src/graph.rs`.\n";
        let refs = extract_prose(with_context);
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.syntax == RefSyntax::InlinePath));

        let without_context = "Run `src/gate.rs` to see.\n";
        assert!(extract_prose(without_context).is_empty());

        // Code spans without separator or extension are not paths
        let not_paths = "The files use `HashMap` and `serde`.\n";
        assert!(extract_prose(not_paths).is_empty());
    }

    #[test]
    fn test_labeled_markdown_link_is_a_link() {
        // A label in front of a link does not turn the markup into a
        // traceability target
        let refs = extract_prose("Architecture: [arch](docs/arch.md)\n");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].target_path, "docs/arch.md");
        assert_eq!(refs[0].syntax, RefSyntax::MarkdownLink);
    }

    #[test]
    fn test_path_context_requires_whole_words() {
        let unrelated = "Update the user profile in `src/profile.rs`.\n";
        assert!(extract_prose(unrelated).is_empty());

        let related = "See the file `src/profile.rs` for details.\n";
        let refs = extract_prose(related);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].syntax, RefSyntax::InlinePath);
    }

    #[test]
    fn test_companion_target_naming() {
        assert_eq!(
            companion_target(Path::new("config/settings.json.refs.md")),
            Some(PathBuf::from("config/settings.json"))
        );
        assert_eq!(companion_target(Path::new("docs/readme.md")), None);
    }

    #[test]
    fn test_companion_sections_attributed_to_target() {
        let text = "## Used By:\n\
                    - src/missing.py\n\
                    - src/main.py\n\
                    \n\
                    Notes:\n\
                    not/a/listed.md\n";
        let refs = extract(
            text,
            FileKind::Companion,
            Path::new("config/settings.json.refs.md"),
        );
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].source_file, PathBuf::from("config/settings.json"));
        assert_eq!(refs[0].target_path, "src/missing.py");
        assert_eq!(refs[0].syntax, RefSyntax::CompanionFile);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let text = "Architecture: docs/arch.md\nSee [plan](docs/plan.md).\n";
        let first = extract_prose(text);
        let second = extract_prose(text);
        assert_eq!(first, second);
    }
}
