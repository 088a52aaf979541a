//! Error types for a3s-mask

use thiserror::Error;

/// Errors surfaced by the masking engine and its session store
#[derive(Debug, Error)]
pub enum MaskError {
    /// `unmask` was called with a handle that no `mask` call produced
    /// (or whose session has already been discarded)
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// Two sessions disagree on the value behind the same placeholder
    #[error("Placeholder {token} already maps to a different value in session {session_id}")]
    MappingConflict { session_id: String, token: String },

    /// A category name cannot be used as a placeholder prefix
    #[error("Invalid category name '{0}': expected upper snake case")]
    InvalidCategory(String),

    /// A detector pattern failed to compile
    #[error("Invalid pattern for rule '{rule}': {reason}")]
    InvalidPattern { rule: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (configuration files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reasons a detector could not produce a result.
///
/// Distinct from `Ok(vec![])`, which means the detector ran and found nothing.
/// The engine treats both variants as recoverable: the detector contributes
/// no candidates and the run is reported as not fully covered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetectorError {
    /// The detector cannot execute (model not loaded, dependency missing, ...)
    #[error("Detector unavailable: {0}")]
    Unavailable(String),

    /// The detector did not answer within the configured budget
    #[error("Detector timed out after {0} ms")]
    Timeout(u64),
}

/// Result type alias for masking operations
pub type Result<T> = std::result::Result<T, MaskError>;
