//! Regex-based detector for structured values
//!
//! Fast and high-precision. Patterns stay deliberately permissive at their
//! edges: the resolver's boundary check rejects matches embedded in larger
//! tokens, which stands in for look-around assertions the `regex` crate
//! does not support.

use super::{Detection, Detector, DetectorKind};
use crate::category::Category;
use crate::error::{DetectorError, MaskError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A named pattern and the category its matches belong to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRule {
    pub name: String,
    pub category: Category,
    pub pattern: String,
}

impl PatternRule {
    pub fn new(name: impl Into<String>, category: Category, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category,
            pattern: pattern.into(),
        }
    }
}

/// Detector that runs a list of compiled pattern rules
pub struct RegexDetector {
    name: String,
    rules: Vec<(String, Regex, Category)>,
}

impl RegexDetector {
    /// Compile the given rules
    pub fn new(rules: &[PatternRule]) -> Result<Self> {
        let compiled = rules
            .iter()
            .map(|rule| {
                let regex = Regex::new(&rule.pattern).map_err(|e| MaskError::InvalidPattern {
                    rule: rule.name.clone(),
                    reason: e.to_string(),
                })?;
                Ok((rule.name.clone(), regex, rule.category.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: "regex".to_string(),
            rules: compiled,
        })
    }

    /// Detector with the built-in IP, EMAIL, PHONE, CREDIT_CARD and URL rules
    pub fn with_defaults() -> Result<Self> {
        Self::new(&default_pattern_rules())
    }

    /// Override the name reported for this detector
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Names of the compiled rules, in evaluation order
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|(name, _, _)| name.as_str()).collect()
    }

    fn scan(&self, text: &str) -> Vec<Detection> {
        let mut detections = Vec::new();
        for (rule_name, regex, category) in &self.rules {
            let before = detections.len();
            detections.extend(
                regex
                    .find_iter(text)
                    .map(|m| Detection::span(m.start(), m.end(), category.clone())),
            );
            tracing::trace!(
                rule = %rule_name,
                matches = detections.len() - before,
                "Pattern rule evaluated"
            );
        }
        detections
    }
}

#[async_trait]
impl Detector for RegexDetector {
    async fn find(&self, text: &str) -> std::result::Result<Vec<Detection>, DetectorError> {
        Ok(self.scan(text))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::Structured
    }
}

/// Default structured-data rules
pub fn default_pattern_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            "ip",
            Category::Ip,
            r"\b(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\b",
        ),
        PatternRule::new(
            "email",
            Category::Email,
            r"(?i)\b[a-z0-9._%+-]+@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}\b",
        ),
        PatternRule::new(
            "phone",
            Category::Phone,
            r"(?:\+?\d{1,3}[-.\s*]?)?(?:\(?\d{3}\)?[-.\s*]?)?\d{3}[-.\s*]?\d{4}\b|(?:\(\+?\d{2}\)|\+?\d{2})\s*\d{2}\s*\d{3}\s*\d{4}\b",
        ),
        PatternRule::new(
            "credit_card",
            Category::CreditCard,
            r"\b(?:\d{4}[- ]){3}\d{4}\b|\b\d{16}\b",
        ),
        PatternRule::new(
            "url",
            Category::Url,
            r#"(?i)\b(?:https?://|www\d{0,3}\.)[^\s<>"']*[^\s<>"'.,;:!?)\]]|\b[a-z0-9][a-z0-9.\-]*\.(?:com|org|net|edu|gov|mil|int|info|biz|io|ai|dev|app|co|uk|de|fr|eu|us|ca|au)\b(?:/[^\s<>"']*[^\s<>"'.,;:!?)\]])?"#,
        ),
    ]
}
