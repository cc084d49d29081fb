//! Placeholder allocation and expression fragments.
//!
//! Each clause writes through its own [`FragmentWriter`], whose placeholders
//! all start with the clause prefix (`#k0`, `:f2`, `:u1z`). Two clauses
//! therefore never produce the same placeholder, and merging checks it anyway.

use std::collections::HashMap;
use std::fmt;

use dynadoc_model::AttributeValue;

use crate::codec::Codec;
use crate::error::ExpressionError;
use crate::value::Value;

/// The part of a request a fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clause {
    /// Partition (or index) key equality.
    KeyMatch,
    /// Sort-key range appended to the key match.
    Range,
    /// Post-read filter.
    Filter,
    /// Precondition of a write.
    Condition,
    /// Update actions.
    Update,
    /// Attribute projection.
    Projection,
}

impl Clause {
    /// Placeholder prefix owned by this clause.
    #[must_use]
    pub fn prefix(self) -> char {
        match self {
            Self::KeyMatch => 'k',
            Self::Range => 'r',
            Self::Filter => 'f',
            Self::Condition => 'c',
            Self::Update => 'u',
            Self::Projection => 'p',
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::KeyMatch => "key match",
            Self::Range => "range",
            Self::Filter => "filter",
            Self::Condition => "condition",
            Self::Update => "update",
            Self::Projection => "projection",
        };
        f.write_str(name)
    }
}

/// Expression text plus the placeholders it references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    /// Expression text.
    pub text: String,
    /// `#placeholder` to attribute name.
    pub names: HashMap<String, String>,
    /// `:placeholder` to wire value.
    pub values: HashMap<String, AttributeValue>,
}

impl Fragment {
    /// Move this fragment's placeholders into request-wide tables.
    ///
    /// Fails without partial effect if any placeholder is already present.
    pub fn merge_into(
        self,
        names: &mut HashMap<String, String>,
        values: &mut HashMap<String, AttributeValue>,
    ) -> Result<String, ExpressionError> {
        let clash = self
            .names
            .keys()
            .find(|k| names.contains_key(*k))
            .or_else(|| self.values.keys().find(|k| values.contains_key(*k)));
        if let Some(clash) = clash {
            return Err(ExpressionError::PlaceholderCollision(clash.clone()));
        }
        names.extend(self.names);
        values.extend(self.values);
        Ok(self.text)
    }
}

/// Allocates placeholders for one clause.
#[derive(Debug)]
pub(crate) struct FragmentWriter<'c> {
    clause: Clause,
    codec: &'c Codec,
    next_slot: usize,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl<'c> FragmentWriter<'c> {
    pub(crate) fn new(clause: Clause, codec: &'c Codec) -> Self {
        Self {
            clause,
            codec,
            next_slot: 0,
            names: HashMap::new(),
            values: HashMap::new(),
        }
    }

    pub(crate) fn clause(&self) -> Clause {
        self.clause
    }

    /// Reserve the next slot; every name/value placeholder of one field shares it.
    pub(crate) fn slot(&mut self) -> usize {
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }

    /// Bind an attribute name to `#<prefix><slot>`.
    pub(crate) fn name(&mut self, slot: usize, attribute: &str) -> String {
        let placeholder = format!("#{}{slot}", self.clause.prefix());
        self.names.insert(placeholder.clone(), attribute.to_owned());
        placeholder
    }

    /// Bind an already-encoded value to `:<prefix><slot><suffix>`.
    pub(crate) fn wire_value(&mut self, slot: usize, suffix: &str, wire: AttributeValue) -> String {
        let placeholder = format!(":{}{slot}{suffix}", self.clause.prefix());
        self.values.insert(placeholder.clone(), wire);
        placeholder
    }

    /// Encode and bind a value. `Ok(None)` if the codec omits it.
    pub(crate) fn try_value(
        &mut self,
        slot: usize,
        suffix: &str,
        value: &Value,
    ) -> Result<Option<String>, ExpressionError> {
        Ok(self
            .codec
            .encode(value)?
            .map(|wire| self.wire_value(slot, suffix, wire)))
    }

    /// Encode and bind a value that must be present.
    pub(crate) fn value(
        &mut self,
        slot: usize,
        suffix: &str,
        field: &str,
        value: &Value,
    ) -> Result<String, ExpressionError> {
        self.try_value(slot, suffix, value)?.ok_or_else(|| {
            ExpressionError::InvalidQueryShape(format!(
                "{} on '{field}' needs a value, got {}",
                self.clause,
                value.kind()
            ))
        })
    }

    pub(crate) fn finish(self, text: String) -> Fragment {
        Fragment {
            text,
            names: self.names,
            values: self.values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_prefix_placeholders_by_clause() {
        let codec = Codec::default();
        let mut w = FragmentWriter::new(Clause::Filter, &codec);
        let slot = w.slot();
        assert_eq!(w.name(slot, "age"), "#f0");
        assert_eq!(w.value(slot, "", "age", &Value::from(3)).unwrap(), ":f0");
        let slot = w.slot();
        assert_eq!(w.name(slot, "name"), "#f1");
        let frag = w.finish("#f0 > :f0".to_owned());
        assert_eq!(frag.names.len(), 2);
        assert_eq!(frag.values.len(), 1);
    }

    #[test]
    fn test_should_reject_missing_required_value() {
        let codec = Codec::default();
        let mut w = FragmentWriter::new(Clause::Condition, &codec);
        let err = w.value(0, "", "age", &Value::Undefined).unwrap_err();
        assert!(matches!(err, ExpressionError::InvalidQueryShape(m) if m.contains("condition")));
    }

    #[test]
    fn test_should_detect_collisions_on_merge() {
        let mut names = HashMap::from([("#k0".to_owned(), "id".to_owned())]);
        let mut values = HashMap::new();
        let frag = Fragment {
            text: "#k0 = :k0".to_owned(),
            names: HashMap::from([("#k0".to_owned(), "other".to_owned())]),
            values: HashMap::from([(":k0".to_owned(), AttributeValue::S("x".to_owned()))]),
        };
        let err = frag.merge_into(&mut names, &mut values).unwrap_err();
        assert_eq!(err, ExpressionError::PlaceholderCollision("#k0".to_owned()));
        assert_eq!(names["#k0"], "id");
        assert!(values.is_empty());
    }
}
