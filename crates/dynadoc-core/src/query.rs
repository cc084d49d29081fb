//! Query descriptions, result pages and continuation tokens.

use serde::{Deserialize, Serialize};

use dynadoc_model::Key;

use crate::error::Result;
use crate::expression::{ExpressionBuilder, Predicate};
use crate::value::Value;

/// Opaque resume point of a paged read.
///
/// Wraps the store's `LastEvaluatedKey`; hand it back unchanged to continue.
/// It serializes so callers can carry it across requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(Key);

impl ContinuationToken {
    /// `None` for the empty key the store sends on the last page.
    pub(crate) fn from_last_evaluated(key: Key) -> Option<Self> {
        (!key.is_empty()).then_some(Self(key))
    }

    pub(crate) fn into_start_key(self) -> Key {
        self.0
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page, after filtering.
    pub items: Vec<T>,
    /// Items the store evaluated, before filtering.
    pub scanned_count: usize,
    /// Resume point, `None` on the last page.
    pub next: Option<ContinuationToken>,
}

impl<T> Page<T> {
    /// Returns `true` if there are more pages.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// A key-condition query against a table or one of its indexes.
#[derive(Debug, Clone)]
pub struct Query {
    pub(crate) expressions: ExpressionBuilder,
    pub(crate) index: Option<String>,
    pub(crate) forward: bool,
    pub(crate) limit: Option<i32>,
    pub(crate) start: Option<ContinuationToken>,
}

impl Query {
    /// Query from a `{ field: literal }` key match.
    pub fn new(key_match: &Value) -> Result<Self> {
        Ok(Self::from_builder(ExpressionBuilder::new().key_match(key_match)?))
    }

    /// Query for items whose `field` equals `value`.
    #[must_use]
    pub fn key_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::from_builder(ExpressionBuilder::new().key_equals(field, value))
    }

    fn from_builder(expressions: ExpressionBuilder) -> Self {
        Self {
            expressions,
            index: None,
            forward: true,
            limit: None,
            start: None,
        }
    }

    /// Query a secondary index instead of the table.
    #[must_use]
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index = Some(name.into());
        self
    }

    /// Sort-key range from `{ field: { operator: literal } }`.
    pub fn range(mut self, criteria: &Value) -> Result<Self> {
        self.expressions = self.expressions.range(criteria)?;
        Ok(self)
    }

    /// Sort-key range from a predicate.
    pub fn range_predicate(mut self, predicate: Predicate) -> Result<Self> {
        self.expressions = self.expressions.range_predicate(predicate)?;
        Ok(self)
    }

    /// Post-read filter from `{ field: { operator: literal }, ... }`.
    pub fn filter(mut self, criteria: &Value) -> Result<Self> {
        self.expressions = self.expressions.filter(criteria)?;
        Ok(self)
    }

    /// Add one filter predicate.
    #[must_use]
    pub fn filter_predicate(mut self, predicate: Predicate) -> Self {
        self.expressions = self.expressions.filter_predicate(predicate);
        self
    }

    /// Only return these attributes.
    #[must_use]
    pub fn project<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expressions = self.expressions.project(attributes);
        self
    }

    /// Walk the sort key in descending order.
    #[must_use]
    pub fn descending(mut self) -> Self {
        self.forward = false;
        self
    }

    /// Evaluate at most `limit` items per page.
    #[must_use]
    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume from a previous page.
    #[must_use]
    pub fn start_from(mut self, token: ContinuationToken) -> Self {
        self.start = Some(token);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dynadoc_model::AttributeValue;

    use super::*;

    #[test]
    fn test_should_treat_empty_last_key_as_final_page() {
        assert_eq!(ContinuationToken::from_last_evaluated(HashMap::new()), None);
        let key = HashMap::from([("pk".to_owned(), AttributeValue::S("a".to_owned()))]);
        let token = ContinuationToken::from_last_evaluated(key.clone()).unwrap();
        assert_eq!(token.into_start_key(), key);
    }

    #[test]
    fn test_should_serialize_token_as_wire_key() {
        let key = HashMap::from([("pk".to_owned(), AttributeValue::N("7".to_owned()))]);
        let token = ContinuationToken::from_last_evaluated(key).unwrap();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, r#"{"pk":{"N":"7"}}"#);
        let back: ContinuationToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }

    #[test]
    fn test_should_reject_multi_field_key_match() {
        let criteria = Value::from_json(&serde_json::json!({"a": 1, "b": 2})).unwrap();
        assert!(Query::new(&criteria).is_err());
    }
}
