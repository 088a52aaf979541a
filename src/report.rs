//! Outcome reporting for masking runs
//!
//! Masking never fails because of detection problems, it degrades. The
//! report makes that degradation visible: under-redaction is a
//! security-relevant outcome and callers must be able to tell it apart from a
//! clean run.

use crate::category::Category;
use serde::{Deserialize, Serialize};

/// A non-fatal problem encountered while masking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaskWarning {
    /// A detector could not run; its categories may be under-redacted
    DetectorUnavailable { detector: String, reason: String },

    /// A detector exceeded its time budget and contributed nothing
    DetectorTimedOut { detector: String, timeout_ms: u64 },

    /// A detector proposed a range outside the text or inside a character
    InvalidCandidate {
        detector: String,
        start: usize,
        end: usize,
    },

    /// Two candidates tied on every rule up to the final fallback
    AmbiguousSpan {
        start: usize,
        end: usize,
        kept: Category,
        dropped: Category,
    },

    /// The input already contained a placeholder minted earlier in this
    /// session; unmasking will turn that literal into the mapped value
    LiteralPlaceholder { token: String },
}

impl MaskWarning {
    /// Whether this warning means some sensitive data may have gone unmasked
    pub fn reduces_coverage(&self) -> bool {
        matches!(
            self,
            Self::DetectorUnavailable { .. }
                | Self::DetectorTimedOut { .. }
                | Self::InvalidCandidate { .. }
        )
    }
}

/// A masked span, described without its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedSpan {
    /// Start byte offset in the original text
    pub start: usize,
    /// End byte offset in the original text
    pub end: usize,
    pub category: Category,
    /// Placeholder now standing in the masked text
    pub token: String,
    /// Detector whose candidate was kept
    pub detector: String,
}

/// Summary of one `mask` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaskReport {
    /// Session the placeholders belong to
    pub session_id: String,
    /// Masked spans, ordered by start offset
    pub findings: Vec<MaskedSpan>,
    /// Non-fatal problems, in the order they were encountered
    pub warnings: Vec<MaskWarning>,
    /// Detectors that ran to completion
    pub detectors_run: Vec<String>,
    /// Detectors that were unavailable or timed out
    pub detectors_failed: Vec<String>,
}

impl MaskReport {
    /// True when every detector ran and every candidate could be placed
    pub fn is_fully_covered(&self) -> bool {
        !self.warnings.iter().any(MaskWarning::reduces_coverage)
    }
}

/// Result of an `unmask` call with bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmaskOutput {
    /// Text with every recognised placeholder restored
    pub text: String,
    /// Number of placeholders replaced
    pub restored: usize,
    /// Token-shaped strings the session does not know, left verbatim
    pub unknown: Vec<String>,
}
