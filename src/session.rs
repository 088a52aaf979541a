//! Masking session and placeholder allocation
//!
//! A session owns the bidirectional mapping between literal values and the
//! placeholders that replaced them. The mapping is keyed by the literal value
//! alone: the first category to claim a value wins, and every later
//! occurrence reuses its token.

use crate::category::Category;
use crate::error::{MaskError, Result};
use crate::placeholder::{self, PlaceholderToken};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Value ↔ placeholder mapping for one masking session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    /// Literal value → placeholder
    values: HashMap<String, PlaceholderToken>,
    /// Rendered placeholder → literal value
    tokens: HashMap<String, String>,
    /// Next index per category
    counters: HashMap<Category, usize>,
    /// Token-shaped literals seen in masked inputs; never minted
    reserved: HashSet<String>,
    /// Detectors that contributed to this session, in registration order
    detectors: Vec<String>,
    /// Set once a `mask` call has run against this session
    populated: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: format!("msk-{}", Uuid::new_v4()),
            created_at: Utc::now(),
            values: HashMap::new(),
            tokens: HashMap::new(),
            counters: HashMap::new(),
            reserved: HashSet::new(),
            detectors: Vec::new(),
            populated: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Token for `value`, minting the next free one for `category` if the
    /// value has not been seen in this session.
    pub fn allocate(&mut self, value: &str, category: &Category) -> PlaceholderToken {
        if let Some(token) = self.values.get(value) {
            return token.clone();
        }

        let counter = self.counters.entry(category.clone()).or_insert(0);
        let token = loop {
            let candidate = PlaceholderToken::new(category.clone(), *counter);
            *counter += 1;
            let rendered = candidate.to_string();
            if !self.reserved.contains(&rendered) && !self.tokens.contains_key(&rendered) {
                break candidate;
            }
        };

        self.tokens.insert(token.to_string(), value.to_string());
        self.values.insert(value.to_string(), token.clone());
        token
    }

    /// Reserve every token-shaped literal in `text` so it is never minted.
    ///
    /// Returns the literals that this session had already minted; unmasking
    /// will replace those with their mapped values.
    pub fn reserve_literals(&mut self, text: &str) -> Vec<String> {
        let mut minted = Vec::new();
        for (_, literal) in placeholder::scan(text) {
            if self.tokens.contains_key(literal) {
                if !minted.iter().any(|m| m == literal) {
                    minted.push(literal.to_string());
                }
            } else {
                self.reserved.insert(literal.to_string());
            }
        }
        minted
    }

    /// Literal value behind a rendered placeholder
    pub fn value_of(&self, token: &str) -> Option<&str> {
        self.tokens.get(token).map(String::as_str)
    }

    /// Placeholder already assigned to a literal value
    pub fn token_for(&self, value: &str) -> Option<&PlaceholderToken> {
        self.values.get(value)
    }

    /// `(placeholder, value)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    /// Record the detectors that ran against this session
    pub fn record_detectors<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            if !self.detectors.iter().any(|d| d == name) {
                self.detectors.push(name.to_string());
            }
        }
    }

    pub fn detectors(&self) -> &[String] {
        &self.detectors
    }

    /// Categories with at least one minted placeholder
    pub fn categories(&self) -> HashSet<&Category> {
        self.values.values().map(|t| t.category()).collect()
    }

    pub(crate) fn mark_populated(&mut self) {
        self.populated = true;
    }

    /// Whether any `mask` call has run against this session
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Fold another session's mapping into this one.
    ///
    /// Fails without modifying `self` if a placeholder would map to two
    /// different values, or if one side minted a placeholder the other saw as
    /// literal input text. A value mapped in both sessions keeps this
    /// session's placeholder; the other one still unmasks to the same value.
    pub fn merge(&mut self, other: &Session) -> Result<()> {
        let conflict = |token: &str| MaskError::MappingConflict {
            session_id: self.id.clone(),
            token: token.to_string(),
        };

        for (token, value) in &other.tokens {
            match self.tokens.get(token) {
                Some(existing) if existing != value => return Err(conflict(token.as_str())),
                _ if self.reserved.contains(token) => return Err(conflict(token.as_str())),
                _ => {}
            }
        }
        if let Some(token) = other.reserved.iter().find(|t| self.tokens.contains_key(*t)) {
            return Err(conflict(token.as_str()));
        }

        for (token, value) in &other.tokens {
            self.tokens.insert(token.clone(), value.clone());
        }
        for (value, token) in &other.values {
            self.values
                .entry(value.clone())
                .or_insert_with(|| token.clone());
        }
        for (category, next) in &other.counters {
            let counter = self.counters.entry(category.clone()).or_insert(0);
            *counter = (*counter).max(*next);
        }
        self.reserved.extend(other.reserved.iter().cloned());
        self.record_detectors(&other.detectors);
        self.populated |= other.populated;

        tracing::debug!(
            session_id = %self.id,
            merged_from = %other.id,
            mappings = self.tokens.len(),
            "Sessions merged"
        );
        Ok(())
    }

    /// Number of placeholder mappings
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Drop every mapping, keeping the session id
    pub fn clear(&mut self) {
        self.values.clear();
        self.tokens.clear();
        self.counters.clear();
        self.reserved.clear();
        self.detectors.clear();
        self.populated = false;
    }
}
