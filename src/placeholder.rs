//! Placeholder token syntax
//!
//! A placeholder is `<` + category name + `_` + index + `>`, e.g.
//! `<PERSON_0>` or `<CREDIT_CARD_12>`. The syntax crosses the boundary to
//! external processors and must stay stable.

use crate::category::Category;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::sync::OnceLock;

/// Cached regex matching any token-shaped string
fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([A-Z][A-Z0-9_]*)_(\d+)>").unwrap())
}

/// A placeholder substituted for one masked value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PlaceholderToken {
    category: Category,
    index: usize,
}

impl PlaceholderToken {
    pub fn new(category: Category, index: usize) -> Self {
        Self { category, index }
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Parse a complete token. Returns `None` for anything else,
    /// including tokens with surrounding text.
    pub fn parse(s: &str) -> Option<Self> {
        let caps = token_regex().captures(s)?;
        let whole = caps.get(0)?;
        if whole.start() != 0 || whole.end() != s.len() {
            return None;
        }
        let category = Category::custom(caps.get(1)?.as_str()).ok()?;
        let index = caps.get(2)?.as_str().parse().ok()?;
        Some(Self { category, index })
    }
}

impl fmt::Display for PlaceholderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}_{}>", self.category, self.index)
    }
}

impl From<PlaceholderToken> for String {
    fn from(token: PlaceholderToken) -> Self {
        token.to_string()
    }
}

impl TryFrom<String> for PlaceholderToken {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("not a placeholder token: {}", value))
    }
}

/// Byte ranges of every token-shaped substring, left to right.
///
/// Matches do not overlap. Token-shaped does not mean minted: the caller
/// decides whether a match belongs to its session.
pub fn scan(text: &str) -> impl Iterator<Item = (Range<usize>, &str)> + '_ {
    token_regex()
        .find_iter(text)
        .map(|m| (m.range(), m.as_str()))
}

/// Replace each token-shaped substring for which `lookup` returns a value.
///
/// A single left-to-right pass: replacement values are never rescanned.
/// Returns the new text, the number of replacements and the unrecognised
/// tokens in order of appearance.
pub fn replace_with<'a, F>(text: &str, mut lookup: F) -> (String, usize, Vec<String>)
where
    F: FnMut(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut restored = 0;
    let mut unknown = Vec::new();

    for (range, token) in scan(text) {
        out.push_str(&text[last..range.start]);
        match lookup(token) {
            Some(value) => {
                out.push_str(value);
                restored += 1;
            }
            None => {
                out.push_str(token);
                unknown.push(token.to_string());
            }
        }
        last = range.end;
    }
    out.push_str(&text[last..]);

    (out, restored, unknown)
}
