//! Categories of sensitive data and their placeholder prefixes

use crate::error::{MaskError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of sensitive value a placeholder stands for.
///
/// The upper snake case name of a category is its placeholder prefix
/// (`<EMAIL_0>`, `<CREDIT_CARD_3>`). New kinds of data only need a detector
/// and a [`Category::custom`] name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Category {
    Ip,
    Email,
    Phone,
    CreditCard,
    Url,
    Person,
    Organization,
    Location,
    Misc,
    Custom(String),
}

impl Category {
    /// Built-in categories, in resolution priority order
    pub const BUILTIN: [Category; 9] = [
        Category::CreditCard,
        Category::Email,
        Category::Ip,
        Category::Phone,
        Category::Url,
        Category::Person,
        Category::Organization,
        Category::Location,
        Category::Misc,
    ];

    /// Create a category from an upper snake case name.
    ///
    /// Built-in names resolve to their built-in variant, so
    /// `Category::custom("EMAIL")` is `Category::Email`.
    pub fn custom(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(MaskError::InvalidCategory(name));
        }
        Ok(Self::builtin(&name).unwrap_or(Self::Custom(name)))
    }

    fn builtin(name: &str) -> Option<Self> {
        let category = match name {
            "IP" => Self::Ip,
            "EMAIL" => Self::Email,
            "PHONE" => Self::Phone,
            "CREDIT_CARD" => Self::CreditCard,
            "URL" => Self::Url,
            "PERSON" => Self::Person,
            "ORGANIZATION" => Self::Organization,
            "LOCATION" => Self::Location,
            "MISC" => Self::Misc,
            _ => return None,
        };
        Some(category)
    }

    /// Placeholder prefix for this category
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ip => "IP",
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::CreditCard => "CREDIT_CARD",
            Self::Url => "URL",
            Self::Person => "PERSON",
            Self::Organization => "ORGANIZATION",
            Self::Location => "LOCATION",
            Self::Misc => "MISC",
            Self::Custom(name) => name,
        }
    }

    /// Whether values of this category are natural-language entities
    /// (names, organisations, places) rather than structured patterns.
    ///
    /// Entity values get the extra degeneracy filters: single characters and
    /// all-uppercase acronyms are never masked as entities.
    pub fn is_entity(&self) -> bool {
        matches!(
            self,
            Self::Person | Self::Organization | Self::Location | Self::Misc
        )
    }

    /// Tie-break rank when two candidates cover the same range; lower wins.
    pub fn priority(&self) -> u8 {
        match self {
            Self::CreditCard => 0,
            Self::Email => 1,
            Self::Ip => 2,
            Self::Phone => 3,
            Self::Url => 4,
            Self::Person => 5,
            Self::Organization => 6,
            Self::Location => 7,
            Self::Misc => 8,
            Self::Custom(_) => 9,
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = MaskError;

    fn from_str(s: &str) -> Result<Self> {
        Self::custom(s)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl TryFrom<String> for Category {
    type Error = MaskError;

    fn try_from(value: String) -> Result<Self> {
        Self::custom(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        assert_eq!(Category::CreditCard.to_string(), "CREDIT_CARD");
        assert_eq!(Category::Ip.as_str(), "IP");
        assert_eq!("PERSON".parse::<Category>().unwrap(), Category::Person);
    }

    #[test]
    fn test_custom_resolves_builtin() {
        assert_eq!(Category::custom("EMAIL").unwrap(), Category::Email);
        assert_eq!(
            Category::custom("SERIAL_NUMBER").unwrap(),
            Category::Custom("SERIAL_NUMBER".into())
        );
    }

    #[test]
    fn test_custom_rejects_bad_names() {
        assert!(Category::custom("").is_err());
        assert!(Category::custom("serial").is_err());
        assert!(Category::custom("_SERIAL").is_err());
        assert!(Category::custom("SERIAL-NO").is_err());
        assert!(Category::custom("AB<C").is_err());
    }

    #[test]
    fn test_entity_categories() {
        assert!(Category::Person.is_entity());
        assert!(Category::Misc.is_entity());
        assert!(!Category::Email.is_entity());
        assert!(!Category::Custom("HOST".into()).is_entity());
    }

    #[test]
    fn test_priority_order_matches_builtin_list() {
        let priorities: Vec<u8> = Category::BUILTIN.iter().map(|c| c.priority()).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
        assert!(Category::Misc.priority() < Category::Custom("X".into()).priority());
    }

    #[test]
    fn test_serde_as_name() {
        let json = serde_json::to_string(&Category::CreditCard).unwrap();
        assert_eq!(json, "\"CREDIT_CARD\"");
        let parsed: Category = serde_json::from_str("\"HOSTNAME\"").unwrap();
        assert_eq!(parsed, Category::Custom("HOSTNAME".into()));
        assert!(serde_json::from_str::<Category>("\"lower\"").is_err());
    }
}
