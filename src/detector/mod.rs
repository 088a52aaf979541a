//! Detector trait: the capability every source of candidates implements
//!
//! A detector looks at a text and proposes substrings that may be sensitive.
//! It never mutates the text and never sees the session; the engine runs all
//! registered detectors over the same input and reconciles their proposals in
//! the [`SpanResolver`](crate::resolver::SpanResolver).
//!
//! ```text
//! text → [RegexDetector] ─┐
//!      → [KeywordDetector] ├→ candidates → SpanResolver → findings
//!      → [EntityDetector] ─┘
//! ```

use crate::category::Category;
use crate::error::DetectorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod entity;
pub mod keyword;
pub mod pattern;

pub use self::entity::{EntityDetector, EntityRecognizer, EntityTag, TagMap};
pub use self::keyword::{KeywordDetector, KeywordDetectorConfig};
pub use self::pattern::{default_pattern_rules, PatternRule, RegexDetector};

/// Where a detection sits in the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Only the literal value is known; the resolver searches for it
    Value(String),
    /// Byte range `[start, end)` into the scanned text
    Range { start: usize, end: usize },
}

/// A single proposal from a detector
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Location of the proposed value
    pub locator: Locator,
    /// What the detector believes the value is
    pub category: Category,
    /// Confidence (0.0 to 1.0), for detectors that produce one
    pub score: Option<f64>,
}

impl Detection {
    /// A detection that carries only the literal value
    pub fn value(value: impl Into<String>, category: Category) -> Self {
        Self {
            locator: Locator::Value(value.into()),
            category,
            score: None,
        }
    }

    /// A detection at a known byte range
    pub fn span(start: usize, end: usize, category: Category) -> Self {
        Self {
            locator: Locator::Range { start, end },
            category,
            score: None,
        }
    }

    /// Attach a confidence score
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

/// Broad class of a detector, used to break ties between equal-length spans.
///
/// Pattern matches on structured data carry a lower false-positive risk than
/// statistical entity recognition, so `Structured` sorts first and wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Structured,
    Statistical,
}

/// Pluggable source of candidate spans.
///
/// Implementations must be pure over their input. A detector that cannot run
/// returns `Err(DetectorError::Unavailable)` rather than an empty list, so the
/// engine can report reduced coverage instead of silently losing it.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Scan `text` and return every candidate found.
    async fn find(&self, text: &str) -> Result<Vec<Detection>, DetectorError>;

    /// Human-readable name (used in reports and logs).
    fn name(&self) -> &str;

    /// Structured pattern matcher or statistical recognizer.
    fn kind(&self) -> DetectorKind;
}
