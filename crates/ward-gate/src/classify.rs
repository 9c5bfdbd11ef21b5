//! Rule-based default for the content classifier seam
//!
//! The engine delegates content understanding to a pluggable
//! [`ContentClassifier`]; this keyword-tier implementation keeps every
//! gating flow deterministic and unit-testable offline. A model-backed
//! classifier can be swapped in behind the same contract.

use ward_core::{ContentClassifier, Discovery, DiscoveryLevel, WorkflowImpact};

const CRITICAL_KEYWORDS: &[&str] = &[
    "data loss",
    "corruption",
    "security",
    "vulnerability",
    "crash",
    "deadlock",
];

const CONCERN_KEYWORDS: &[&str] = &[
    "missing",
    "stale",
    "mismatch",
    "inconsistent",
    "deprecated",
    "broken",
    "outdated",
];

/// Keyword-tier discovery classifier
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ContentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Discovery {
        let lower = text.to_lowercase();

        if CRITICAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return Discovery {
                level: DiscoveryLevel::Critical,
                workflow_impact: WorkflowImpact::Halt,
                is_blocking: true,
                confidence: 0.9,
            };
        }
        if CONCERN_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return Discovery {
                level: DiscoveryLevel::Concern,
                workflow_impact: WorkflowImpact::ReviewNeeded,
                is_blocking: false,
                confidence: 0.7,
            };
        }
        Discovery {
            level: DiscoveryLevel::Note,
            workflow_impact: WorkflowImpact::None,
            is_blocking: false,
            confidence: 0.5,
        }
    }
}
