//! Accumulates clauses and renders a request's expressions in one pass.

use std::collections::HashMap;

use dynadoc_model::AttributeValue;

use crate::codec::Codec;
use crate::error::ExpressionError;
use crate::expression::condition::{Predicate, parse_key_match};
use crate::expression::placeholder::{Clause, FragmentWriter};
use crate::expression::update::UpdateDocument;
use crate::value::Value;

/// Rendered expressions plus the merged placeholder tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltExpressions {
    /// `KeyConditionExpression`: key match, then `AND` range.
    pub key_condition: Option<String>,
    /// `FilterExpression`.
    pub filter: Option<String>,
    /// `ConditionExpression`.
    pub condition: Option<String>,
    /// `UpdateExpression`.
    pub update: Option<String>,
    /// `ProjectionExpression`.
    pub projection: Option<String>,
    /// `ExpressionAttributeNames`.
    pub names: HashMap<String, String>,
    /// `ExpressionAttributeValues`.
    pub values: HashMap<String, AttributeValue>,
}

/// Builder for one request's expressions.
///
/// ```
/// use dynadoc_core::expression::{ExpressionBuilder, UpdateDocument};
/// use dynadoc_core::Value;
///
/// let built = ExpressionBuilder::new()
///     .condition(&Value::from_json(&serde_json::json!({"version": {"=": 3}})).unwrap())
///     .unwrap()
///     .update(UpdateDocument::new().increment("version", 1))
///     .build()
///     .unwrap();
/// assert_eq!(built.condition.as_deref(), Some("#c0 = :c0"));
/// assert_eq!(built.update.as_deref(), Some("SET #u0 = if_not_exists(#u0, :u0z) + :u0"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExpressionBuilder {
    codec: Codec,
    key_match: Option<(String, Value)>,
    range: Option<Predicate>,
    filter: Vec<Predicate>,
    condition: Vec<Predicate>,
    update: Option<UpdateDocument>,
    projection: Vec<String>,
}

impl ExpressionBuilder {
    /// A builder using the default codec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder encoding literals with `codec`.
    #[must_use]
    pub fn with_codec(codec: Codec) -> Self {
        Self {
            codec,
            ..Self::default()
        }
    }

    /// Same clauses, different codec.
    pub(crate) fn clone_with_codec(&self, codec: Codec) -> Self {
        Self {
            codec,
            ..self.clone()
        }
    }

    /// Key match from `{ field: literal }` with exactly one field.
    pub fn key_match(mut self, criteria: &Value) -> Result<Self, ExpressionError> {
        self.key_match = Some(parse_key_match(criteria)?);
        Ok(self)
    }

    /// Key match on a known field.
    #[must_use]
    pub fn key_equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.key_match = Some((field.into(), value.into()));
        self
    }

    /// Sort-key range from `{ field: { operator: literal } }`.
    pub fn range(self, criteria: &Value) -> Result<Self, ExpressionError> {
        let predicate = Predicate::parse_single(criteria, "range")?;
        self.range_predicate(predicate)
    }

    /// Sort-key range from a predicate.
    pub fn range_predicate(mut self, predicate: Predicate) -> Result<Self, ExpressionError> {
        if !predicate.comparator.is_range_operator() {
            return Err(ExpressionError::InvalidQueryShape(format!(
                "operator {} is not allowed in a range",
                predicate.comparator
            )));
        }
        self.range = Some(predicate);
        Ok(self)
    }

    /// Filter from `{ field: { operator: literal }, ... }`; fields are ANDed.
    pub fn filter(mut self, criteria: &Value) -> Result<Self, ExpressionError> {
        self.filter.extend(Predicate::parse_all(criteria)?);
        Ok(self)
    }

    /// Add one filter predicate.
    #[must_use]
    pub fn filter_predicate(mut self, predicate: Predicate) -> Self {
        self.filter.push(predicate);
        self
    }

    /// Write precondition from `{ field: { operator: literal } }` with one field.
    pub fn condition(mut self, criteria: &Value) -> Result<Self, ExpressionError> {
        self.condition
            .push(Predicate::parse_single(criteria, "condition")?);
        Ok(self)
    }

    /// Add one condition predicate; several are ANDed.
    #[must_use]
    pub fn condition_predicate(mut self, predicate: Predicate) -> Self {
        self.condition.push(predicate);
        self
    }

    /// Set the update document.
    #[must_use]
    pub fn update(mut self, document: UpdateDocument) -> Self {
        self.update = Some(document);
        self
    }

    /// Restrict returned attributes.
    #[must_use]
    pub fn project<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection.extend(attributes.into_iter().map(Into::into));
        self
    }

    /// Render every clause and merge the placeholder tables.
    pub fn build(&self) -> Result<BuiltExpressions, ExpressionError> {
        let mut built = BuiltExpressions::default();
        let codec = &self.codec;

        if let Some((field, value)) = &self.key_match {
            let mut w = FragmentWriter::new(Clause::KeyMatch, codec);
            let slot = w.slot();
            let name = w.name(slot, field);
            let value = w.value(slot, "", field, value)?;
            let mut text = w
                .finish(format!("{name} = {value}"))
                .merge_into(&mut built.names, &mut built.values)?;

            if let Some(range) = &self.range {
                let mut w = FragmentWriter::new(Clause::Range, codec);
                let rendered = range.render(&mut w)?;
                let range_text = w
                    .finish(rendered)
                    .merge_into(&mut built.names, &mut built.values)?;
                text = format!("{text} AND {range_text}");
            }
            built.key_condition = Some(text);
        } else if self.range.is_some() {
            return Err(ExpressionError::InvalidQueryShape(
                "a range needs a key match".to_owned(),
            ));
        }

        built.filter = render_predicates(Clause::Filter, &self.filter, codec, &mut built)?;
        built.condition = render_predicates(Clause::Condition, &self.condition, codec, &mut built)?;

        if let Some(document) = &self.update {
            let mut w = FragmentWriter::new(Clause::Update, codec);
            let text = document.render(&mut w)?;
            built.update = Some(w.finish(text).merge_into(&mut built.names, &mut built.values)?);
        }

        if !self.projection.is_empty() {
            let mut w = FragmentWriter::new(Clause::Projection, codec);
            let names: Vec<String> = self
                .projection
                .iter()
                .map(|attr| {
                    let slot = w.slot();
                    w.name(slot, attr)
                })
                .collect();
            built.projection =
                Some(w.finish(names.join(", ")).merge_into(&mut built.names, &mut built.values)?);
        }

        Ok(built)
    }
}

fn render_predicates(
    clause: Clause,
    predicates: &[Predicate],
    codec: &Codec,
    built: &mut BuiltExpressions,
) -> Result<Option<String>, ExpressionError> {
    if predicates.is_empty() {
        return Ok(None);
    }
    let mut w = FragmentWriter::new(clause, codec);
    let parts = predicates
        .iter()
        .map(|p| p.render(&mut w))
        .collect::<Result<Vec<_>, _>>()?;
    let text = w
        .finish(parts.join(" AND "))
        .merge_into(&mut built.names, &mut built.values)?;
    Ok(Some(text))
}
