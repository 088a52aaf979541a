//! Substitution engine
//!
//! Runs every registered detector over a text, resolves their candidates,
//! allocates placeholders and splices them in. `unmask` reverses the
//! substitution with a single left-to-right pass over placeholder syntax.
//!
//! ## Masking flow
//!
//! ```text
//! text ─→ detectors (concurrent, optional timeout) ─→ join
//!      ─→ SpanResolver ─→ allocate (left to right) ─→ splice (right to left)
//!      ─→ masked text + MaskReport
//! ```
//!
//! Detection never fails a `mask` call. A detector that is unavailable or
//! times out contributes nothing and the report says so.

use crate::config::MaskConfig;
use crate::detector::Detector;
use crate::error::{DetectorError, MaskError, Result};
use crate::placeholder::{self, PlaceholderToken};
use crate::report::{MaskReport, MaskWarning, MaskedSpan, UnmaskOutput};
use crate::resolver::{DetectorInfo, Finding, SpanResolver};
use crate::session::Session;
use crate::store::{SessionHandle, SessionStore};
use futures::future::join_all;
use std::time::Duration;

/// Result of masking into a stored session
#[derive(Debug, Clone)]
pub struct MaskOutput {
    /// Text with every finding replaced by its placeholder
    pub masked: String,
    /// Handle to pass back to `unmask`
    pub session: SessionHandle,
    pub report: MaskReport,
}

/// Result of masking into a caller-owned session
#[derive(Debug, Clone)]
pub struct Masked {
    pub text: String,
    pub report: MaskReport,
}

/// Everything detection and resolution produced for one text
struct Detected {
    findings: Vec<Finding>,
    warnings: Vec<MaskWarning>,
    run: Vec<String>,
    failed: Vec<String>,
}

/// Builder for [`MaskingEngine`]
///
/// Detectors are consulted in registration order; on otherwise equal
/// candidates the earlier one wins.
#[derive(Default)]
pub struct MaskingEngineBuilder {
    detectors: Vec<Box<dyn Detector>>,
    config: MaskConfig,
    store: Option<SessionStore>,
}

impl MaskingEngineBuilder {
    /// Register a detector
    pub fn detector(mut self, detector: impl Detector + 'static) -> Self {
        self.detectors.push(Box::new(detector));
        self
    }

    /// Register an already boxed detector
    pub fn boxed_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.detectors.push(detector);
        self
    }

    pub fn config(mut self, config: MaskConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing session store instead of creating one
    pub fn store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate the configuration and build the engine
    pub fn build(self) -> Result<MaskingEngine> {
        self.config.validate()?;
        if self.detectors.is_empty() {
            tracing::warn!("Masking engine built without detectors; nothing will be masked");
        }
        Ok(MaskingEngine {
            resolver: SpanResolver::new(&self.config),
            detectors: self.detectors,
            config: self.config,
            store: self.store.unwrap_or_default(),
        })
    }
}

/// Reversible masking over a set of detectors and a session store
pub struct MaskingEngine {
    detectors: Vec<Box<dyn Detector>>,
    resolver: SpanResolver,
    config: MaskConfig,
    store: SessionStore,
}

impl MaskingEngine {
    pub fn builder() -> MaskingEngineBuilder {
        MaskingEngineBuilder::default()
    }

    pub fn config(&self) -> &MaskConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Registered detector names, in priority order
    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Mask `text` into a fresh stored session.
    ///
    /// The session stays in the store until [`discard`](Self::discard) or
    /// [`export`](Self::export) removes it. The store never evicts on its own.
    pub async fn mask(&self, text: &str) -> MaskOutput {
        let mut session = Session::new();
        let masked = self.mask_session(&mut session, text).await;
        let handle = self.store.insert(session);

        tracing::info!(
            session_id = %handle,
            findings = masked.report.findings.len(),
            covered = masked.report.is_fully_covered(),
            "Masking session created"
        );

        MaskOutput {
            masked: masked.text,
            session: handle,
            report: masked.report,
        }
    }

    /// Mask `text` into an existing stored session, reusing its placeholders.
    ///
    /// Detection runs before the session is locked; allocation and splicing
    /// run under the session's entry lock.
    pub async fn mask_in(&self, handle: &SessionHandle, text: &str) -> Result<MaskOutput> {
        if !self.store.contains(handle) {
            return Err(MaskError::InvalidSession(handle.to_string()));
        }

        let detected = self.detect(text).await;
        let masked = self
            .store
            .with_mut(handle, |session| apply(session, text, detected))
            .ok_or_else(|| MaskError::InvalidSession(handle.to_string()))?;

        Ok(MaskOutput {
            masked: masked.text,
            session: handle.clone(),
            report: masked.report,
        })
    }

    /// Mask `text` into a caller-owned session.
    pub async fn mask_session(&self, session: &mut Session, text: &str) -> Masked {
        let detected = self.detect(text).await;
        apply(session, text, detected)
    }

    /// Restore every placeholder the stored session knows.
    ///
    /// Fails with `InvalidSession` if the handle is unknown or its session was
    /// never populated by `mask`.
    pub fn unmask(&self, text: &str, handle: &SessionHandle) -> Result<String> {
        self.unmask_report(text, handle).map(|out| out.text)
    }

    /// Like [`unmask`](Self::unmask), with restore counts and unknown tokens
    pub fn unmask_report(&self, text: &str, handle: &SessionHandle) -> Result<UnmaskOutput> {
        self.store
            .with(handle, |session| {
                if session.is_populated() {
                    Ok(Self::unmask_session_report(session, text))
                } else {
                    Err(MaskError::InvalidSession(handle.to_string()))
                }
            })
            .ok_or_else(|| MaskError::InvalidSession(handle.to_string()))?
    }

    /// Restore placeholders from a caller-owned session. Never fails; tokens
    /// the session does not know are left verbatim.
    pub fn unmask_session(session: &Session, text: &str) -> String {
        Self::unmask_session_report(session, text).text
    }

    pub fn unmask_session_report(session: &Session, text: &str) -> UnmaskOutput {
        let (restored_text, restored, unknown) =
            placeholder::replace_with(text, |token| session.value_of(token));

        if !unknown.is_empty() {
            tracing::debug!(
                session_id = session.id(),
                restored,
                unknown = unknown.len(),
                "Unknown placeholders left verbatim"
            );
        }

        UnmaskOutput {
            text: restored_text,
            restored,
            unknown,
        }
    }

    /// Drop a stored session. Returns whether it existed.
    pub fn discard(&self, handle: &SessionHandle) -> bool {
        self.store.remove(handle)
    }

    /// Remove a stored session and hand it to the caller
    pub fn export(&self, handle: &SessionHandle) -> Result<Session> {
        self.store
            .take(handle)
            .ok_or_else(|| MaskError::InvalidSession(handle.to_string()))
    }

    /// Put a previously exported session back into the store
    pub fn import(&self, session: Session) -> SessionHandle {
        self.store.insert(session)
    }

    /// Run all detectors concurrently, join, then resolve.
    async fn detect(&self, text: &str) -> Detected {
        let timeout = self.config.detector_timeout_ms;
        let runs = self.detectors.iter().map(|detector| async move {
            let outcome = match timeout {
                Some(ms) => {
                    match tokio::time::timeout(Duration::from_millis(ms), detector.find(text)).await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => Err(DetectorError::Timeout(ms)),
                    }
                }
                None => detector.find(text).await,
            };
            (detector, outcome)
        });
        let outcomes = join_all(runs).await;

        let mut candidates = Vec::new();
        let mut warnings = Vec::new();
        let mut run = Vec::new();
        let mut failed = Vec::new();

        for (order, (detector, outcome)) in outcomes.into_iter().enumerate() {
            let info = DetectorInfo {
                name: detector.name().to_string(),
                kind: detector.kind(),
                order,
            };
            match outcome {
                Ok(detections) => {
                    tracing::debug!(
                        detector = %info.name,
                        detections = detections.len(),
                        "Detector finished"
                    );
                    let (found, invalid) = self.resolver.locate(text, &info, detections);
                    candidates.extend(found);
                    warnings.extend(invalid);
                    run.push(info.name);
                }
                Err(DetectorError::Timeout(timeout_ms)) => {
                    tracing::warn!(
                        detector = %info.name,
                        timeout_ms,
                        "Detector timed out; coverage reduced"
                    );
                    warnings.push(MaskWarning::DetectorTimedOut {
                        detector: info.name.clone(),
                        timeout_ms,
                    });
                    failed.push(info.name);
                }
                Err(DetectorError::Unavailable(reason)) => {
                    tracing::warn!(
                        detector = %info.name,
                        reason = %reason,
                        "Detector unavailable; coverage reduced"
                    );
                    warnings.push(MaskWarning::DetectorUnavailable {
                        detector: info.name.clone(),
                        reason,
                    });
                    failed.push(info.name);
                }
            }
        }

        let resolution = self.resolver.resolve(text, candidates);
        warnings.extend(resolution.warnings);

        Detected {
            findings: resolution.findings,
            warnings,
            run,
            failed,
        }
    }
}

/// Allocate placeholders for the findings and splice them into `text`.
fn apply(session: &mut Session, text: &str, detected: Detected) -> Masked {
    let Detected {
        findings,
        mut warnings,
        run,
        failed,
    } = detected;

    for token in session.reserve_literals(text) {
        tracing::warn!(
            session_id = session.id(),
            token = %token,
            "Input contains a placeholder already minted in this session"
        );
        warnings.push(MaskWarning::LiteralPlaceholder { token });
    }

    // First-seen numbering follows reading order
    let tokens: Vec<PlaceholderToken> = findings
        .iter()
        .map(|f| session.allocate(&f.span.value, &f.span.category))
        .collect();

    let mut masked = text.to_string();
    for (finding, token) in findings.iter().zip(&tokens).rev() {
        masked.replace_range(finding.span.start..finding.span.end, &token.to_string());
    }

    session.record_detectors(&run);
    session.mark_populated();

    let findings = findings
        .into_iter()
        .zip(tokens)
        .map(|(finding, token)| MaskedSpan {
            start: finding.span.start,
            end: finding.span.end,
            category: finding.span.category,
            token: token.to_string(),
            detector: finding.detector,
        })
        .collect();

    Masked {
        text: masked,
        report: MaskReport {
            session_id: session.id().to_string(),
            findings,
            warnings,
            detectors_run: run,
            detectors_failed: failed,
        },
    }
}
