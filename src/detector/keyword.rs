//! Keyword detector
//!
//! Flags caller-supplied literal terms (customer names, host names, project
//! code names) as a fixed category. Matching is literal; case folding is
//! optional.

use super::{Detection, Detector, DetectorKind};
use crate::category::Category;
use crate::error::{DetectorError, MaskError, Result};
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Keyword detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordDetectorConfig {
    pub keywords: Vec<String>,
    pub case_sensitive: bool,
    pub category: Category,
}

impl KeywordDetectorConfig {
    /// Case-insensitive keyword list for one category
    pub fn new(category: Category, keywords: Vec<String>) -> Self {
        Self {
            keywords,
            case_sensitive: false,
            category,
        }
    }
}

/// Detector that reports every occurrence of a fixed set of terms
pub struct KeywordDetector {
    name: String,
    category: Category,
    matchers: Vec<Regex>,
}

impl KeywordDetector {
    /// Build matchers for every non-empty keyword
    pub fn new(config: KeywordDetectorConfig) -> Result<Self> {
        let matchers = config
            .keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|keyword| {
                RegexBuilder::new(&regex::escape(keyword))
                    .case_insensitive(!config.case_sensitive)
                    .build()
                    .map_err(|e| MaskError::InvalidPattern {
                        rule: keyword.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: "keyword".to_string(),
            category: config.category,
            matchers,
        })
    }

    /// Create from a keyword list (case-insensitive)
    pub fn from_keywords(category: Category, keywords: Vec<String>) -> Result<Self> {
        Self::new(KeywordDetectorConfig::new(category, keywords))
    }

    /// Override the name reported for this detector
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Detector for KeywordDetector {
    async fn find(&self, text: &str) -> std::result::Result<Vec<Detection>, DetectorError> {
        Ok(self
            .matchers
            .iter()
            .flat_map(|m| m.find_iter(text))
            .map(|m| Detection::span(m.start(), m.end(), self.category.clone()))
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::Structured
    }
}
