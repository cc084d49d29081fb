//! Predicates for key, range, filter and condition clauses.
//!
//! Callers describe predicates as native maps of the form
//! `{ field: { operator: literal } }`; this module parses them into
//! [`Predicate`]s and renders them against a [`FragmentWriter`].

use std::fmt;
use std::str::FromStr;

use crate::error::ExpressionError;
use crate::expression::placeholder::FragmentWriter;
use crate::value::Value;

/// Comparison operators understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `begins_with(path, :v)`
    BeginsWith,
    /// `path BETWEEN :lo AND :hi`
    Between,
    /// `contains(path, :v)`
    Contains,
    /// `attribute_exists(path)`
    Exists,
    /// `attribute_not_exists(path)`
    NotExists,
}

impl Comparator {
    /// Operator spelling used in native criteria maps.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::BeginsWith => "begins_with",
            Self::Between => "between",
            Self::Contains => "contains",
            Self::Exists => "attribute_exists",
            Self::NotExists => "attribute_not_exists",
        }
    }

    /// Returns `true` if the operator compares against exactly one literal.
    #[must_use]
    pub fn takes_single_operand(&self) -> bool {
        matches!(
            self,
            Self::Eq
                | Self::Ne
                | Self::Lt
                | Self::Le
                | Self::Gt
                | Self::Ge
                | Self::BeginsWith
                | Self::Contains
        )
    }

    /// Returns `true` if the store accepts this operator on a sort key.
    #[must_use]
    pub fn is_range_operator(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::BeginsWith | Self::Between
        )
    }
}

impl FromStr for Comparator {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "=" | "==" => Self::Eq,
            "<>" | "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            _ => match s.to_ascii_lowercase().as_str() {
                "begins_with" => Self::BeginsWith,
                "between" => Self::Between,
                "contains" => Self::Contains,
                "attribute_exists" | "exists" => Self::Exists,
                "attribute_not_exists" | "not_exists" => Self::NotExists,
                _ => {
                    return Err(ExpressionError::InvalidQueryShape(format!(
                        "unknown operator '{s}'"
                    )));
                }
            },
        })
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Existence checks take no operand.
    None,
    /// A single literal.
    One(Value),
    /// Inclusive bounds for `between`.
    Bounds(Value, Value),
}

/// One `field operator operand` test.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Attribute name.
    pub field: String,
    /// Operator.
    pub comparator: Comparator,
    /// Operand.
    pub operand: Operand,
}

impl Predicate {
    /// Build a predicate, checking that the operand fits the operator.
    pub fn new(
        field: impl Into<String>,
        comparator: Comparator,
        operand: Value,
    ) -> Result<Self, ExpressionError> {
        let field = field.into();
        let operand = match comparator {
            Comparator::Exists | Comparator::NotExists => Operand::None,
            Comparator::Between => match operand {
                Value::List(mut bounds) if bounds.len() == 2 => {
                    let hi = bounds.pop().unwrap_or_default();
                    let lo = bounds.pop().unwrap_or_default();
                    Operand::Bounds(lo, hi)
                }
                other => {
                    return Err(ExpressionError::InvalidQueryShape(format!(
                        "between on '{field}' needs a two-element list, got {}",
                        other.kind()
                    )));
                }
            },
            _ => Operand::One(operand),
        };
        Ok(Self {
            field,
            comparator,
            operand,
        })
    }

    /// `field = value`
    #[must_use]
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            comparator: Comparator::Eq,
            operand: Operand::One(value.into()),
        }
    }

    /// `field <op> value`; fails for operators that do not take one literal.
    pub fn binary(
        field: impl Into<String>,
        comparator: Comparator,
        value: impl Into<Value>,
    ) -> Result<Self, ExpressionError> {
        let field = field.into();
        if !comparator.takes_single_operand() {
            return Err(ExpressionError::InvalidQueryShape(format!(
                "operator {comparator} on '{field}' does not take a single literal"
            )));
        }
        Ok(Self {
            field,
            comparator,
            operand: Operand::One(value.into()),
        })
    }

    /// `field BETWEEN lo AND hi`
    #[must_use]
    pub fn between(field: impl Into<String>, lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            comparator: Comparator::Between,
            operand: Operand::Bounds(lo.into(), hi.into()),
        }
    }

    /// `attribute_exists(field)`
    #[must_use]
    pub fn exists(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            comparator: Comparator::Exists,
            operand: Operand::None,
        }
    }

    /// `attribute_not_exists(field)`
    #[must_use]
    pub fn not_exists(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            comparator: Comparator::NotExists,
            operand: Operand::None,
        }
    }

    /// Parse `{ field: { operator: literal }, ... }` into predicates.
    pub fn parse_all(criteria: &Value) -> Result<Vec<Self>, ExpressionError> {
        let Value::Map(fields) = criteria else {
            return Err(ExpressionError::InvalidQueryShape(format!(
                "criteria must be a map, got {}",
                criteria.kind()
            )));
        };
        fields
            .iter()
            .map(|(field, entry)| {
                let Some(ops) = entry.as_map().filter(|m| m.len() == 1) else {
                    return Err(ExpressionError::InvalidQueryShape(format!(
                        "'{field}' must map to exactly one {{operator: literal}} entry"
                    )));
                };
                let (op, operand) = ops
                    .iter()
                    .next()
                    .ok_or_else(|| ExpressionError::InvalidQueryShape(field.clone()))?;
                Self::new(field.clone(), op.parse()?, operand.clone())
            })
            .collect()
    }

    /// Parse criteria that must name exactly one field.
    pub fn parse_single(criteria: &Value, clause: &str) -> Result<Self, ExpressionError> {
        let mut predicates = Self::parse_all(criteria)?;
        if predicates.len() != 1 {
            return Err(ExpressionError::InvalidQueryShape(format!(
                "{clause} needs exactly one field, got {}",
                predicates.len()
            )));
        }
        predicates
            .pop()
            .ok_or_else(|| ExpressionError::InvalidQueryShape(clause.to_owned()))
    }

    /// Render against a writer, allocating one slot.
    pub(crate) fn render(&self, w: &mut FragmentWriter<'_>) -> Result<String, ExpressionError> {
        let slot = w.slot();
        let name = w.name(slot, &self.field);
        let field = self.field.as_str();
        Ok(match (&self.comparator, &self.operand) {
            (Comparator::Exists, Operand::None) => format!("attribute_exists({name})"),
            (Comparator::NotExists, Operand::None) => format!("attribute_not_exists({name})"),
            (Comparator::Between, Operand::Bounds(lo, hi)) => {
                let lo = w.value(slot, "lo", field, lo)?;
                let hi = w.value(slot, "hi", field, hi)?;
                format!("{name} BETWEEN {lo} AND {hi}")
            }
            (Comparator::BeginsWith | Comparator::Contains, Operand::One(v)) => {
                let value = w.value(slot, "", field, v)?;
                format!("{}({name}, {value})", self.comparator.as_str())
            }
            (
                op @ (Comparator::Eq
                | Comparator::Ne
                | Comparator::Lt
                | Comparator::Le
                | Comparator::Gt
                | Comparator::Ge),
                Operand::One(v),
            ) => {
                let value = w.value(slot, "", field, v)?;
                format!("{name} {} {value}", op.as_str())
            }
            (op, _) => {
                return Err(ExpressionError::InvalidQueryShape(format!(
                    "{} operator {op} on '{field}' has the wrong operand shape",
                    w.clause()
                )));
            }
        })
    }
}

/// Parse a key-match map: exactly one field mapped to a literal.
pub fn parse_key_match(criteria: &Value) -> Result<(String, Value), ExpressionError> {
    match criteria {
        Value::Map(fields) if fields.len() == 1 => {
            let (field, value) = fields
                .iter()
                .next()
                .ok_or_else(|| ExpressionError::InvalidQueryShape("key match".to_owned()))?;
            Ok((field.clone(), value.clone()))
        }
        Value::Map(fields) => Err(ExpressionError::InvalidQueryShape(format!(
            "key match needs exactly one field, got {}",
            fields.len()
        ))),
        other => Err(ExpressionError::InvalidQueryShape(format!(
            "key match must be a map, got {}",
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::Codec;
    use crate::expression::placeholder::Clause;

    fn criteria(json: serde_json::Value) -> Value {
        Value::from_json(&json).unwrap()
    }

    #[test]
    fn test_should_parse_operator_spellings() {
        assert_eq!("<=".parse::<Comparator>().unwrap(), Comparator::Le);
        assert_eq!("BEGINS_WITH".parse::<Comparator>().unwrap(), Comparator::BeginsWith);
        assert!("like".parse::<Comparator>().is_err());
    }

    #[test]
    fn test_should_parse_criteria_map() {
        let preds = Predicate::parse_all(&criteria(json!({
            "age": {">=": 21},
            "name": {"begins_with": "J"}
        })))
        .unwrap();
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[0], Predicate::binary("age", Comparator::Ge, 21).unwrap());
        assert_eq!(preds[1].comparator, Comparator::BeginsWith);
    }

    #[test]
    fn test_should_reject_multi_operator_entries() {
        let err = Predicate::parse_all(&criteria(json!({"age": {">": 1, "<": 5}}))).unwrap_err();
        assert!(matches!(err, ExpressionError::InvalidQueryShape(_)));
        let err = Predicate::parse_all(&criteria(json!({"age": 5}))).unwrap_err();
        assert!(matches!(err, ExpressionError::InvalidQueryShape(_)));
    }

    #[test]
    fn test_should_require_single_field() {
        let err = Predicate::parse_single(&criteria(json!({"a": {"=": 1}, "b": {"=": 2}})), "range")
            .unwrap_err();
        assert!(matches!(err, ExpressionError::InvalidQueryShape(m) if m.contains("range")));
    }

    #[test]
    fn test_should_require_two_bounds_for_between() {
        let ok = Predicate::parse_all(&criteria(json!({"ts": {"between": [1, 9]}}))).unwrap();
        assert_eq!(ok[0], Predicate::between("ts", 1, 9));
        let err = Predicate::parse_all(&criteria(json!({"ts": {"between": [1]}}))).unwrap_err();
        assert!(matches!(err, ExpressionError::InvalidQueryShape(_)));
    }

    #[test]
    fn test_should_render_each_operator_form() {
        let codec = Codec::default();
        let mut w = FragmentWriter::new(Clause::Filter, &codec);
        assert_eq!(
            Predicate::binary("a", Comparator::Ne, "x")
                .unwrap()
                .render(&mut w)
                .unwrap(),
            "#f0 <> :f0"
        );
        assert_eq!(
            Predicate::binary("b", Comparator::BeginsWith, "x")
                .unwrap()
                .render(&mut w)
                .unwrap(),
            "begins_with(#f1, :f1)"
        );
        assert_eq!(
            Predicate::between("c", 1, 2).render(&mut w).unwrap(),
            "#f2 BETWEEN :f2lo AND :f2hi"
        );
        assert_eq!(
            Predicate::not_exists("d").render(&mut w).unwrap(),
            "attribute_not_exists(#f3)"
        );
        let frag = w.finish(String::new());
        assert_eq!(frag.names.len(), 4);
        assert_eq!(frag.values.len(), 4);
    }

    #[test]
    fn test_should_reject_binary_with_multi_operand_operator() {
        for op in [Comparator::Between, Comparator::Exists, Comparator::NotExists] {
            let err = Predicate::binary("sk", op, 5).unwrap_err();
            assert!(
                matches!(err, ExpressionError::InvalidQueryShape(ref m) if m.contains("sk")),
                "{op} should be rejected"
            );
        }
    }

    #[test]
    fn test_should_reject_hand_built_predicate_with_wrong_operand() {
        let codec = Codec::default();
        let mut w = FragmentWriter::new(Clause::Range, &codec);
        let between_one = Predicate {
            field: "sk".to_owned(),
            comparator: Comparator::Between,
            operand: Operand::One(Value::from(5)),
        };
        let err = between_one.render(&mut w).unwrap_err();
        assert!(
            matches!(err, ExpressionError::InvalidQueryShape(m) if m.contains("wrong operand"))
        );

        let exists_with_value = Predicate {
            field: "sk".to_owned(),
            comparator: Comparator::Exists,
            operand: Operand::One(Value::from(5)),
        };
        assert!(exists_with_value.render(&mut w).is_err());
    }

    #[test]
    fn test_should_parse_key_match() {
        let (field, value) = parse_key_match(&criteria(json!({"id": "u1"}))).unwrap();
        assert_eq!(field, "id");
        assert_eq!(value, Value::from("u1"));
        let err = parse_key_match(&criteria(json!({"id": "u1", "sk": 1}))).unwrap_err();
        assert!(matches!(err, ExpressionError::InvalidQueryShape(m) if m.contains("exactly one")));
        assert!(parse_key_match(&criteria(json!({}))).is_err());
    }
}
