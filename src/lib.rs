//! # a3s-mask
//!
//! Reversible, type-tagged masking of sensitive values in free-form text.
//!
//! ## Overview
//!
//! `a3s-mask` replaces personal names, contact details, network addresses and
//! card numbers with placeholders such as `<PERSON_0>` or `<EMAIL_1>` before
//! text leaves the process, and restores the original values in whatever
//! comes back. Detectors are pluggable; the engine reconciles their findings,
//! numbers placeholders per session, and guarantees that unmasking a masked
//! text reproduces the input exactly.
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_mask::{MaskingEngine, RegexDetector};
//!
//! # async fn example() -> a3s_mask::Result<()> {
//! let engine = MaskingEngine::builder()
//!     .detector(RegexDetector::with_defaults()?)
//!     .build()?;
//!
//! let out = engine.mask("Mail ops@example.com from 10.0.0.7").await;
//! assert_eq!(out.masked, "Mail <EMAIL_0> from <IP_0>");
//!
//! // ... send `out.masked` to an external processor ...
//! let restored = engine.unmask(&out.masked, &out.session)?;
//! assert_eq!(restored, "Mail ops@example.com from 10.0.0.7");
//!
//! if !out.report.is_fully_covered() {
//!     // a detector failed; some values may be unmasked
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Detectors
//!
//! - **RegexDetector** – IP, EMAIL, PHONE, CREDIT_CARD and URL patterns, or custom rules
//! - **KeywordDetector** – caller-supplied literal terms as a fixed category
//! - **EntityDetector** – adapter over any NER / token-classification model
//!
//! ## Architecture
//!
//! - **Detector** trait – async capability every candidate source implements
//! - **SpanResolver** – boundary, allow-list and overlap rules over all candidates
//! - **Session** – value ↔ placeholder mapping and allocator
//! - **SessionStore** – process-local sessions keyed by `SessionHandle`
//! - **MaskingEngine** – mask / unmask over the above

pub mod category;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod placeholder;
pub mod report;
pub mod resolver;
pub mod session;
pub mod store;

// Re-export core types
pub use category::Category;
pub use config::{MaskConfig, ValueOccurrences};
pub use detector::{
    Detection, Detector, DetectorKind, EntityDetector, EntityRecognizer, EntityTag,
    KeywordDetector, KeywordDetectorConfig, Locator, PatternRule, RegexDetector, TagMap,
};
pub use engine::{MaskOutput, Masked, MaskingEngine, MaskingEngineBuilder};
pub use error::{DetectorError, MaskError, Result};
pub use placeholder::PlaceholderToken;
pub use report::{MaskReport, MaskWarning, MaskedSpan, UnmaskOutput};
pub use resolver::{Candidate, Finding, Span, SpanResolver};
pub use session::Session;
pub use store::{SessionHandle, SessionStore};
