//! Update documents and their `SET` / `REMOVE` / `ADD` / `DELETE` rendering.

use std::collections::{BTreeMap, HashSet};

use dynadoc_model::AttributeValue;

use crate::error::ExpressionError;
use crate::expression::placeholder::FragmentWriter;
use crate::value::{Number, Value};

/// What to do with one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// Assign a value. `Undefined` values are skipped, never erased.
    Set(Value),
    /// Add a signed delta, starting from zero when the attribute is absent.
    Increment(Number),
    /// Append the elements of a list, creating the list when absent.
    Append(Vec<Value>),
    /// Union a set into the attribute, creating it when absent.
    AddToSet(Value),
    /// Subtract a set from the attribute; a no-op when absent.
    RemoveFromSet(Value),
    /// Remove the attribute.
    Remove,
}

/// Ordered list of per-attribute update actions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDocument {
    actions: Vec<(String, UpdateAction)>,
}

impl UpdateDocument {
    /// An empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge mode: assign every field of a flat map.
    #[must_use]
    pub fn merge(fields: &BTreeMap<String, Value>) -> Self {
        Self {
            actions: fields
                .iter()
                .map(|(k, v)| (k.clone(), UpdateAction::Set(v.clone())))
                .collect(),
        }
    }

    /// Increment mode: add a signed delta to every field of a flat map.
    pub fn increments(deltas: &BTreeMap<String, Value>) -> Result<Self, ExpressionError> {
        let actions = deltas
            .iter()
            .map(|(k, v)| match v {
                Value::Number(n) => Ok((k.clone(), UpdateAction::Increment(n.clone()))),
                other => Err(ExpressionError::InvalidQueryShape(format!(
                    "increment of '{k}' needs a number, got {}",
                    other.kind()
                ))),
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { actions })
    }

    /// Add an arbitrary action.
    #[must_use]
    pub fn action(mut self, field: impl Into<String>, action: UpdateAction) -> Self {
        self.actions.push((field.into(), action));
        self
    }

    /// `SET field = value`
    #[must_use]
    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.action(field, UpdateAction::Set(value.into()))
    }

    /// Atomic add of `delta`.
    #[must_use]
    pub fn increment(self, field: impl Into<String>, delta: impl Into<Number>) -> Self {
        self.action(field, UpdateAction::Increment(delta.into()))
    }

    /// Append list elements.
    #[must_use]
    pub fn append(self, field: impl Into<String>, elements: Vec<Value>) -> Self {
        self.action(field, UpdateAction::Append(elements))
    }

    /// Add set members.
    #[must_use]
    pub fn add_to_set(self, field: impl Into<String>, members: Value) -> Self {
        self.action(field, UpdateAction::AddToSet(members))
    }

    /// Remove set members.
    #[must_use]
    pub fn remove_from_set(self, field: impl Into<String>, members: Value) -> Self {
        self.action(field, UpdateAction::RemoveFromSet(members))
    }

    /// Remove the attribute.
    #[must_use]
    pub fn remove(self, field: impl Into<String>) -> Self {
        self.action(field, UpdateAction::Remove)
    }

    /// The actions in insertion order.
    #[must_use]
    pub fn actions(&self) -> &[(String, UpdateAction)] {
        &self.actions
    }

    /// Returns `true` if no actions were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Render the update expression.
    pub(crate) fn render(&self, w: &mut FragmentWriter<'_>) -> Result<String, ExpressionError> {
        let mut seen = HashSet::new();
        let mut set = Vec::new();
        let mut remove = Vec::new();
        let mut add = Vec::new();
        let mut delete = Vec::new();

        for (field, action) in &self.actions {
            if !seen.insert(field.as_str()) {
                return Err(ExpressionError::InvalidQueryShape(format!(
                    "'{field}' appears in more than one update action"
                )));
            }
            match action {
                UpdateAction::Set(value) => {
                    if value.is_undefined() {
                        continue;
                    }
                    let slot = w.slot();
                    let Some(v) = w.try_value(slot, "", value)? else {
                        continue;
                    };
                    let name = w.name(slot, field);
                    set.push(format!("{name} = {v}"));
                }
                UpdateAction::Increment(delta) => {
                    let slot = w.slot();
                    let name = w.name(slot, field);
                    let zero = w.wire_value(slot, "z", AttributeValue::N("0".to_owned()));
                    let v = w.value(slot, "", field, &Value::Number(delta.clone()))?;
                    set.push(format!("{name} = if_not_exists({name}, {zero}) + {v}"));
                }
                UpdateAction::Append(elements) => {
                    let slot = w.slot();
                    let name = w.name(slot, field);
                    let empty = w.wire_value(slot, "z", AttributeValue::L(Vec::new()));
                    let v = w.value(slot, "", field, &Value::List(elements.clone()))?;
                    set.push(format!("{name} = list_append(if_not_exists({name}, {empty}), {v})"));
                }
                UpdateAction::AddToSet(members) | UpdateAction::RemoveFromSet(members) => {
                    if !matches!(
                        members,
                        Value::StringSet(_) | Value::NumberSet(_) | Value::BinarySet(_)
                    ) {
                        return Err(ExpressionError::InvalidQueryShape(format!(
                            "set update of '{field}' needs a set, got {}",
                            members.kind()
                        )));
                    }
                    let slot = w.slot();
                    let Some(v) = w.try_value(slot, "", members)? else {
                        continue;
                    };
                    let name = w.name(slot, field);
                    if matches!(action, UpdateAction::AddToSet(_)) {
                        add.push(format!("{name} {v}"));
                    } else {
                        delete.push(format!("{name} {v}"));
                    }
                }
                UpdateAction::Remove => {
                    let slot = w.slot();
                    remove.push(w.name(slot, field));
                }
            }
        }

        let sections: Vec<String> = [
            ("SET", set),
            ("REMOVE", remove),
            ("ADD", add),
            ("DELETE", delete),
        ]
        .into_iter()
        .filter(|(_, parts)| !parts.is_empty())
        .map(|(keyword, parts)| format!("{keyword} {}", parts.join(", ")))
        .collect();

        if sections.is_empty() {
            return Err(ExpressionError::InvalidQueryShape(
                "update document has nothing to write".to_owned(),
            ));
        }
        Ok(sections.join(" "))
    }
}
