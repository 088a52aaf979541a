//! Span resolution: turns overlapping, duplicate detector output into a
//! conflict-free, ordered set of findings
//!
//! ## Pipeline
//!
//! ```text
//! detections ─→ locate (value → offsets, range checks)
//!            ─→ filter (degenerate, min score, boundaries, allow-list)
//!            ─→ rank   (length, detector kind, category, fallback)
//!            ─→ select (dedup, drop overlaps) ─→ findings by start offset
//! ```
//!
//! The filters run once over the union of all candidates, so every detector
//! gets the same boundary and allow-list policy.

use crate::category::Category;
use crate::config::{MaskConfig, ValueOccurrences};
use crate::detector::{Detection, DetectorKind, Locator};
use crate::report::MaskWarning;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

/// A half-open byte range `[start, end)` of the original text, with the
/// literal value it covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub category: Category,
    pub value: String,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether the two spans share at least one byte
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Identity of the detector a candidate came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorInfo {
    pub name: String,
    pub kind: DetectorKind,
    /// Registration index; earlier registration wins late ties
    pub order: usize,
}

/// A located, not yet validated proposal
#[derive(Debug, Clone)]
pub struct Candidate {
    pub span: Span,
    pub score: Option<f64>,
    pub source: DetectorInfo,
}

/// A validated span selected for masking
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub span: Span,
    /// Detector whose candidate was kept
    pub detector: String,
}

/// Output of one resolution pass
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Non-overlapping findings ordered by start offset
    pub findings: Vec<Finding>,
    pub warnings: Vec<MaskWarning>,
}

/// Reconciles candidates from all detectors under one policy
#[derive(Debug, Clone)]
pub struct SpanResolver {
    allowed: HashSet<String>,
    punctuation: HashSet<char>,
    min_score: f64,
    occurrences: ValueOccurrences,
}

impl SpanResolver {
    pub fn new(config: &MaskConfig) -> Self {
        Self {
            allowed: config
                .allowed_values
                .iter()
                .map(|v| v.to_lowercase())
                .collect(),
            punctuation: config.punctuation_boundary_chars.chars().collect(),
            min_score: config.min_score,
            occurrences: config.value_occurrences,
        }
    }

    /// Turn one detector's output into candidates with offsets.
    ///
    /// Ranges must lie inside the text on `char` boundaries; anything else is
    /// dropped with an `InvalidCandidate` warning. Values are located by exact
    /// substring search.
    pub fn locate(
        &self,
        text: &str,
        source: &DetectorInfo,
        detections: Vec<Detection>,
    ) -> (Vec<Candidate>, Vec<MaskWarning>) {
        let mut candidates = Vec::new();
        let mut warnings = Vec::new();

        for detection in detections {
            let Detection {
                locator,
                category,
                score,
            } = detection;

            let starts: Vec<(usize, usize)> = match locator {
                Locator::Range { start, end } => {
                    if start < end
                        && end <= text.len()
                        && text.is_char_boundary(start)
                        && text.is_char_boundary(end)
                    {
                        vec![(start, end)]
                    } else {
                        tracing::warn!(
                            detector = %source.name,
                            start,
                            end,
                            text_len = text.len(),
                            "Detector proposed an invalid range"
                        );
                        warnings.push(MaskWarning::InvalidCandidate {
                            detector: source.name.clone(),
                            start,
                            end,
                        });
                        continue;
                    }
                }
                Locator::Value(value) => {
                    if value.is_empty() {
                        continue;
                    }
                    let found: Vec<(usize, usize)> = match self.occurrences {
                        ValueOccurrences::First => text
                            .find(value.as_str())
                            .map(|s| (s, s + value.len()))
                            .into_iter()
                            .collect(),
                        ValueOccurrences::All => text
                            .match_indices(value.as_str())
                            .map(|(s, v)| (s, s + v.len()))
                            .collect(),
                    };
                    if found.is_empty() {
                        tracing::debug!(
                            detector = %source.name,
                            category = %category,
                            value_len = value.len(),
                            "Detected value does not occur in text"
                        );
                    }
                    found
                }
            };

            candidates.extend(starts.into_iter().map(|(start, end)| Candidate {
                span: Span {
                    start,
                    end,
                    category: category.clone(),
                    value: text[start..end].to_string(),
                },
                score,
                source: source.clone(),
            }));
        }

        (candidates, warnings)
    }

    /// Filter, rank and select candidates into non-overlapping findings.
    pub fn resolve(&self, text: &str, candidates: Vec<Candidate>) -> Resolution {
        let total = candidates.len();
        let mut ranked: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| self.accepts(text, c))
            .collect();
        let valid = ranked.len();
        ranked.sort_by(|a, b| rank(a).cmp(&rank(b)));

        let mut warnings = Vec::new();
        let mut accepted: Vec<Candidate> = Vec::new();
        // start offset → index into `accepted`; accepted ranges are disjoint
        let mut occupied: BTreeMap<usize, usize> = BTreeMap::new();
        let mut seen: HashSet<(usize, usize, Category)> = HashSet::new();

        for candidate in ranked {
            let span = &candidate.span;
            if seen.contains(&(span.start, span.end, span.category.clone())) {
                continue;
            }

            if let Some(&idx) = occupied.range(..span.end).next_back().map(|(_, i)| i) {
                let holder = &accepted[idx];
                if holder.span.end > span.start {
                    if is_ambiguous(holder, &candidate) {
                        tracing::warn!(
                            start = span.start,
                            end = span.end,
                            kept = %holder.span.category,
                            dropped = %span.category,
                            "Ambiguous span resolved by fallback order"
                        );
                        warnings.push(MaskWarning::AmbiguousSpan {
                            start: span.start,
                            end: span.end,
                            kept: holder.span.category.clone(),
                            dropped: span.category.clone(),
                        });
                    }
                    continue;
                }
            }

            seen.insert((span.start, span.end, span.category.clone()));
            occupied.insert(span.start, accepted.len());
            accepted.push(candidate);
        }

        accepted.sort_by_key(|c| c.span.start);

        tracing::debug!(
            candidates = total,
            valid,
            findings = accepted.len(),
            "Spans resolved"
        );

        Resolution {
            findings: accepted
                .into_iter()
                .map(|c| Finding {
                    span: c.span,
                    detector: c.source.name,
                })
                .collect(),
            warnings,
        }
    }

    fn accepts(&self, text: &str, candidate: &Candidate) -> bool {
        let span = &candidate.span;
        if is_degenerate(span) {
            return false;
        }
        if candidate.score.is_some_and(|s| s < self.min_score) {
            return false;
        }
        if !self.has_boundaries(text, span.start, span.end) {
            return false;
        }
        !self.allowed.contains(&span.value.to_lowercase())
    }

    /// Both neighbours of `[start, end)` are whitespace, a configured
    /// punctuation character, or the edge of the text.
    fn has_boundaries(&self, text: &str, start: usize, end: usize) -> bool {
        let ok = |c: Option<char>| match c {
            None => true,
            Some(c) => c.is_whitespace() || self.punctuation.contains(&c),
        };
        ok(text[..start].chars().next_back()) && ok(text[end..].chars().next())
    }
}

/// Sort key: longest first, then structured detectors, category priority,
/// category name, registration order and position.
fn rank(c: &Candidate) -> (Reverse<usize>, DetectorKind, u8, &str, usize, usize) {
    (
        Reverse(c.span.len()),
        c.source.kind,
        c.span.category.priority(),
        c.span.category.as_str(),
        c.source.order,
        c.span.start,
    )
}

/// The two candidates differ only past category priority
fn is_ambiguous(kept: &Candidate, dropped: &Candidate) -> bool {
    kept.span.start == dropped.span.start
        && kept.span.end == dropped.span.end
        && kept.span.category != dropped.span.category
        && kept.source.kind == dropped.source.kind
        && kept.span.category.priority() == dropped.span.category.priority()
}

fn is_degenerate(span: &Span) -> bool {
    let value = span.value.as_str();
    if value.trim().is_empty() || value.contains('<') || value.contains('>') {
        return true;
    }
    span.category.is_entity() && (value.chars().count() == 1 || is_all_uppercase(value))
}

fn is_all_uppercase(value: &str) -> bool {
    value.chars().any(char::is_uppercase) && !value.chars().any(char::is_lowercase)
}
