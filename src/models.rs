use std::fmt;

use chrono::NaiveDate;

use crate::error::{LedgerlyError, Result};
use crate::fingerprint::fingerprint;

/// Stored label of the reserved "ignore" category.
pub const IGNORED_LABEL: &str = "IGNORED";

/// Category assigned to projected loan installments.
pub const LOANS_CATEGORY: &str = "Loans";

/// Spending category. `Ignored` is a reserved member of the category domain:
/// a deliberate classification that reports leave out, not a deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Named(String),
    Ignored,
}

impl Category {
    /// Parses a user-supplied label. Blank labels are rejected.
    pub fn parse(label: &str) -> Result<Self> {
        let label = label.trim();
        if label.is_empty() {
            return Err(LedgerlyError::Validation("category must not be empty".into()));
        }
        if label.eq_ignore_ascii_case(IGNORED_LABEL) {
            return Ok(Self::Ignored);
        }
        Ok(Self::Named(label.to_string()))
    }

    /// Reads a stored column value; empty means pending.
    pub fn from_stored(value: Option<String>) -> Option<Self> {
        value.and_then(|v| Self::parse(&v).ok())
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Ignored => IGNORED_LABEL,
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical transaction record shared by every parser, the projector and
/// the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub source: String,
    pub category: Option<Category>,
    pub is_manual: bool,
    pub hash_id: String,
}

impl Transaction {
    /// Builds a pending candidate whose identity is derived from its content.
    pub fn candidate(date: NaiveDate, description: &str, amount: f64, source: &str) -> Self {
        Self {
            date,
            description: description.to_string(),
            amount,
            source: source.to_string(),
            category: None,
            is_manual: false,
            hash_id: fingerprint(date, amount, description),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.category.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub match_term: String,
    pub target_category: Category,
}

impl Rule {
    pub fn matches(&self, description: &str) -> bool {
        description
            .to_lowercase()
            .contains(&self.match_term.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_reserves_ignored() {
        assert_eq!(Category::parse("ignored").unwrap(), Category::Ignored);
        assert_eq!(Category::parse(" Food ").unwrap(), Category::Named("Food".into()));
        assert!(Category::parse("   ").is_err());
    }

    #[test]
    fn test_category_from_stored_treats_empty_as_pending() {
        assert_eq!(Category::from_stored(None), None);
        assert_eq!(Category::from_stored(Some(String::new())), None);
        assert_eq!(Category::from_stored(Some("IGNORED".into())), Some(Category::Ignored));
    }

    #[test]
    fn test_rule_matches_case_insensitive_substring() {
        let rule = Rule {
            match_term: "uber".into(),
            target_category: Category::Named("Transport".into()),
        };
        assert!(rule.matches("UBER *TRIP 1234"));
        assert!(!rule.matches("LYFT RIDE"));
    }

    #[test]
    fn test_candidate_is_pending_and_unlocked() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let txn = Transaction::candidate(date, "MARKET", -12.5, "CSV: a.csv");
        assert!(txn.is_pending());
        assert!(!txn.is_manual);
        assert_eq!(txn.hash_id, fingerprint(date, -12.5, "MARKET"));
    }
}
