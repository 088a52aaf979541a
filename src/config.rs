//! Masking configuration
//!
//! Policy that differs between callers (which values are safe, which
//! characters delimit a value, how confident a statistical detector must be)
//! lives here and is handed to the engine at construction time, so two
//! engines with different policies can run side by side.

use crate::error::{MaskError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a detection that carries only a value (no offsets) is located in the text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOccurrences {
    /// Only the first occurrence of the value becomes a candidate
    First,
    /// Every non-overlapping occurrence becomes a candidate
    #[default]
    All,
}

/// Configuration for span resolution and detector execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Values never masked, compared case-insensitively
    pub allowed_values: Vec<String>,

    /// Characters that, besides whitespace and the ends of the text,
    /// may precede or follow a masked value
    pub punctuation_boundary_chars: String,

    /// Scored candidates below this confidence are discarded
    pub min_score: f64,

    /// Locating strategy for value-only detections
    pub value_occurrences: ValueOccurrences,

    /// Per-detector time budget; a detector exceeding it contributes nothing
    pub detector_timeout_ms: Option<u64>,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            allowed_values: default_allowed_values(),
            punctuation_boundary_chars: DEFAULT_PUNCTUATION.to_string(),
            min_score: 0.5,
            value_occurrences: ValueOccurrences::All,
            detector_timeout_ms: None,
        }
    }
}

const DEFAULT_PUNCTUATION: &str = ".,;:!?'\"()[]{}<>";

impl MaskConfig {
    /// Parse configuration from a JSON string. Missing fields take defaults.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: MaskConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(MaskError::Config(format!(
                "min_score must be within [0, 1], got {}",
                self.min_score
            )));
        }
        if let Some(c) = self
            .punctuation_boundary_chars
            .chars()
            .find(|c| c.is_alphanumeric())
        {
            return Err(MaskError::Config(format!(
                "punctuation_boundary_chars must not contain alphanumeric '{}'",
                c
            )));
        }
        if self.detector_timeout_ms == Some(0) {
            return Err(MaskError::Config(
                "detector_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Common words that statistical recognizers tend to flag as names
/// in support and operations text.
pub fn default_allowed_values() -> Vec<String> {
    [
        "NetAct", "cell", "support", "backup", "restore", "case", "Java", "basic", "issue",
        "Once", "feature", "enabled", "helpful", "failure", "set", "resolved", "button",
        "monitor", "follow", "up", "PM", "CM", "FM", "need", "node", "startup", "dump", "site",
        "check", "checked", "serial", "sleep", "silent", "config", "change", "changes", "normal",
        "operations", "operation", "upgrade", "traffic", "title", "control", "network", "plane",
        "snapshot", "installation", "unknown", "release", "software", "transport", "alarm",
        "alarms", "time", "lte", "attempts", "setup", "degraded", "detection", "sleeping", "due",
        "reset", "recovery", "manual", "manager", "download", "suspect", "clear", "power",
        "setting", "confirm", "fix", "correction", "top", "reference", "capture",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
