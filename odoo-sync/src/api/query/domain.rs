//! Odoo search domains in prefix (Polish) notation

use serde_json::{Value, json};

/// A search domain, e.g. `["&", ["attDate", ">=", "2024-04-01"], ["attDate", "<=", "2024-04-30"]]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Domain {
    terms: Vec<Value>,
}

impl Domain {
    /// Matches every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Single `[field, operator, value]` condition
    pub fn condition(field: &str, operator: &str, value: impl Into<Value>) -> Self {
        Self {
            terms: vec![json!([field, operator, value.into()])],
        }
    }

    /// `from <= field <= to`, inclusive on both ends
    pub fn between(field: &str, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self::condition(field, ">=", from).and(Self::condition(field, "<=", to))
    }

    /// Conjunction of two domains
    pub fn and(self, other: Domain) -> Self {
        if self.terms.is_empty() {
            return other;
        }
        if other.terms.is_empty() {
            return self;
        }
        let mut terms = Vec::with_capacity(self.terms.len() + other.terms.len() + 1);
        terms.push(json!("&"));
        terms.extend(self.terms);
        terms.extend(other.terms);
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.terms.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_matches_prefix_notation() {
        let domain = Domain::between("attDate", "2024-04-01", "2024-04-30");
        assert_eq!(
            domain.to_value(),
            json!(["&", ["attDate", ">=", "2024-04-01"], ["attDate", "<=", "2024-04-30"]])
        );
    }

    #[test]
    fn test_and_with_empty_is_identity() {
        let domain = Domain::all().and(Domain::condition("state", "=", "purchase"));
        assert_eq!(domain.to_value(), json!([["state", "=", "purchase"]]));
        assert!(Domain::all().is_empty());
        assert_eq!(Domain::all().to_value(), json!([]));
    }
}
