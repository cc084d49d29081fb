//! Evaluates parsed expressions against stored items.

use std::cmp::Ordering;
use std::collections::HashMap;

use dynadoc_core::Number;
use dynadoc_model::AttributeValue;

use super::ExpressionError;
use super::ast::{CompareOp, Condition, Function, Operand, Path, PathElement, SetValue, UpdateExpr};
use crate::storage::Item;

/// Placeholder tables of one request.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    names: &'a HashMap<String, String>,
    values: &'a HashMap<String, AttributeValue>,
}

impl<'a> EvalContext<'a> {
    /// Context resolving against the given tables.
    #[must_use]
    pub fn new(
        names: &'a HashMap<String, String>,
        values: &'a HashMap<String, AttributeValue>,
    ) -> Self {
        Self { names, values }
    }

    /// Evaluate a condition. A missing item is treated as an empty one.
    pub fn evaluate(&self, condition: &Condition, item: &Item) -> Result<bool, ExpressionError> {
        match condition {
            Condition::Compare { left, op, right } => {
                let left = self.operand(left, item)?;
                let right = self.operand(right, item)?;
                Ok(match (left, right) {
                    (Some(l), Some(r)) => compare(&l, *op, &r)?,
                    _ => *op == CompareOp::Ne,
                })
            }
            Condition::Between { value, low, high } => {
                let (Some(v), Some(lo), Some(hi)) = (
                    self.operand(value, item)?,
                    self.operand(low, item)?,
                    self.operand(high, item)?,
                ) else {
                    return Ok(false);
                };
                Ok(compare(&v, CompareOp::Ge, &lo)? && compare(&v, CompareOp::Le, &hi)?)
            }
            Condition::In { value, list } => {
                let Some(v) = self.operand(value, item)? else {
                    return Ok(false);
                };
                for candidate in list {
                    if let Some(c) = self.operand(candidate, item)? {
                        if values_equal(&v, &c)? {
                            return Ok(true);
                        }
                    }
                }
                Ok(false)
            }
            Condition::And(a, b) => Ok(self.evaluate(a, item)? && self.evaluate(b, item)?),
            Condition::Or(a, b) => Ok(self.evaluate(a, item)? || self.evaluate(b, item)?),
            Condition::Not(inner) => Ok(!self.evaluate(inner, item)?),
            Condition::Function { function, args } => self.function(*function, args, item),
        }
    }

    fn function(
        &self,
        function: Function,
        args: &[Operand],
        item: &Item,
    ) -> Result<bool, ExpressionError> {
        let target = match args.first() {
            Some(Operand::Path(path)) => self.lookup(item, path)?,
            _ => {
                return Err(ExpressionError::TypeMismatch(format!(
                    "first argument to {function} must be an attribute path"
                )));
            }
        };
        let argument = match args.get(1) {
            Some(operand) => self.operand(operand, item)?,
            None => None,
        };

        Ok(match (function, target, argument) {
            (Function::AttributeExists, target, _) => target.is_some(),
            (Function::AttributeNotExists, target, _) => target.is_none(),
            (Function::AttributeType, Some(target), Some(AttributeValue::S(tag))) => {
                target.tag() == tag
            }
            (Function::AttributeType, _, Some(other)) => {
                if other.as_s().is_none() {
                    return Err(ExpressionError::TypeMismatch(format!(
                        "attribute_type expects a string type name, got {}",
                        other.tag()
                    )));
                }
                false
            }
            (Function::BeginsWith, Some(AttributeValue::S(s)), Some(AttributeValue::S(p))) => {
                s.starts_with(p.as_str())
            }
            (Function::BeginsWith, Some(AttributeValue::B(b)), Some(AttributeValue::B(p))) => {
                b.starts_with(&p)
            }
            (Function::Contains, Some(target), Some(needle)) => contains(target, &needle)?,
            _ => false,
        })
    }

    /// Resolve `#name` placeholders of a path.
    pub fn resolve_path(&self, path: &Path) -> Result<Vec<PathElement>, ExpressionError> {
        path.0
            .iter()
            .map(|element| match element {
                PathElement::Name(name) => self.resolve_name(name).map(PathElement::Name),
                PathElement::Index(i) => Ok(PathElement::Index(*i)),
            })
            .collect()
    }

    /// Resolve one `#name` placeholder; other names are literal.
    pub fn resolve_name(&self, name: &str) -> Result<String, ExpressionError> {
        if name.starts_with('#') {
            self.names
                .get(name)
                .cloned()
                .ok_or_else(|| ExpressionError::UnresolvedName(name.to_owned()))
        } else {
            Ok(name.to_owned())
        }
    }

    /// Resolve one `:value` placeholder.
    pub fn resolve_value(&self, name: &str) -> Result<&'a AttributeValue, ExpressionError> {
        self.values
            .get(name)
            .ok_or_else(|| ExpressionError::UnresolvedValue(name.to_owned()))
    }

    fn lookup<'i>(
        &self,
        item: &'i Item,
        path: &Path,
    ) -> Result<Option<&'i AttributeValue>, ExpressionError> {
        let steps = self.resolve_path(path)?;
        Ok(lookup_resolved(item, &steps))
    }

    fn operand(
        &self,
        operand: &Operand,
        item: &Item,
    ) -> Result<Option<AttributeValue>, ExpressionError> {
        match operand {
            Operand::Path(path) => Ok(self.lookup(item, path)?.cloned()),
            Operand::Value(name) => self.resolve_value(name).map(|v| Some(v.clone())),
            Operand::Size(path) => {
                let Some(value) = self.lookup(item, path)? else {
                    return Ok(None);
                };
                let size = match value {
                    AttributeValue::S(s) => s.chars().count(),
                    AttributeValue::B(b) => b.len(),
                    AttributeValue::Ss(v) | AttributeValue::Ns(v) => v.len(),
                    AttributeValue::Bs(v) => v.len(),
                    AttributeValue::L(v) => v.len(),
                    AttributeValue::M(m) => m.len(),
                    other => {
                        return Err(ExpressionError::TypeMismatch(format!(
                            "size() is not defined for {}",
                            other.tag()
                        )));
                    }
                };
                Ok(Some(AttributeValue::N(size.to_string())))
            }
        }
    }

    /// Apply an update to `item` in place. Every right-hand side reads the
    /// item as it was before the update.
    pub fn apply_update(
        &self,
        item: &mut Item,
        update: &UpdateExpr,
    ) -> Result<(), ExpressionError> {
        let original = item.clone();

        let mut assignments = Vec::with_capacity(update.set.len());
        for (path, value) in &update.set {
            assignments.push((self.resolve_path(path)?, self.set_value(value, &original)?));
        }
        for (steps, value) in assignments {
            assign(item, &steps, value)?;
        }

        for path in &update.remove {
            remove(item, &self.resolve_path(path)?);
        }

        for (path, operand) in &update.add {
            let steps = self.resolve_path(path)?;
            let delta = self.required(operand, &original)?;
            let merged = match lookup_resolved(item, &steps) {
                None => match delta {
                    AttributeValue::N(_)
                    | AttributeValue::Ss(_)
                    | AttributeValue::Ns(_)
                    | AttributeValue::Bs(_) => delta,
                    other => {
                        return Err(ExpressionError::TypeMismatch(format!(
                            "ADD needs a number or a set, got {}",
                            other.tag()
                        )));
                    }
                },
                Some(AttributeValue::N(current)) => match &delta {
                    AttributeValue::N(d) => AttributeValue::N(
                        number(current)?
                            .try_add(&number(d)?)
                            .map_err(|e| ExpressionError::Arithmetic(e.to_string()))?
                            .to_string(),
                    ),
                    other => return Err(mismatch("ADD", "N", other)),
                },
                Some(current) => set_union(current, &delta)?,
            };
            assign(item, &steps, merged)?;
        }

        for (path, operand) in &update.delete {
            let steps = self.resolve_path(path)?;
            let removed = self.required(operand, &original)?;
            if !removed.is_set() {
                return Err(ExpressionError::TypeMismatch(format!(
                    "DELETE needs a set operand, got {}",
                    removed.tag()
                )));
            }
            let Some(current) = lookup_resolved(item, &steps) else {
                continue;
            };
            let remaining = set_difference(current, &removed)?;
            if remaining.is_empty_set() {
                remove(item, &steps);
            } else {
                assign(item, &steps, remaining)?;
            }
        }

        Ok(())
    }

    fn required(&self, operand: &Operand, item: &Item) -> Result<AttributeValue, ExpressionError> {
        self.operand(operand, item)?.ok_or_else(|| {
            ExpressionError::MissingAttribute(match operand {
                Operand::Path(p) | Operand::Size(p) => p.to_string(),
                Operand::Value(v) => v.clone(),
            })
        })
    }

    fn set_value(&self, value: &SetValue, item: &Item) -> Result<AttributeValue, ExpressionError> {
        match value {
            SetValue::Operand(operand) => self.required(operand, item),
            SetValue::IfNotExists(path, fallback) => match self.lookup(item, path)? {
                Some(existing) => Ok(existing.clone()),
                None => self.set_value(fallback, item),
            },
            SetValue::ListAppend(a, b) => {
                match (self.set_value(a, item)?, self.set_value(b, item)?) {
                    (AttributeValue::L(mut first), AttributeValue::L(second)) => {
                        first.extend(second);
                        Ok(AttributeValue::L(first))
                    }
                    (AttributeValue::L(_), other) | (other, _) => {
                        Err(mismatch("list_append", "L", &other))
                    }
                }
            }
            SetValue::Plus(a, b) | SetValue::Minus(a, b) => {
                let left = self.set_value(a, item)?;
                let right = self.set_value(b, item)?;
                let (AttributeValue::N(l), AttributeValue::N(r)) = (&left, &right) else {
                    let bad = if left.as_n().is_none() { &left } else { &right };
                    return Err(mismatch("arithmetic", "N", bad));
                };
                let (l, r) = (number(l)?, number(r)?);
                let result = if matches!(value, SetValue::Plus(..)) {
                    l.try_add(&r)
                } else {
                    l.try_sub(&r)
                };
                result
                    .map(|n| AttributeValue::N(n.to_string()))
                    .map_err(|e| ExpressionError::Arithmetic(e.to_string()))
            }
        }
    }

    /// Copy only the projected paths of `item`.
    pub fn project(&self, item: &Item, paths: &[Path]) -> Result<Item, ExpressionError> {
        let mut out = Item::new();
        for path in paths {
            let steps = self.resolve_path(path)?;
            let Some((PathElement::Name(head), rest)) = steps.split_first() else {
                continue;
            };
            if let Some(source) = item.get(head) {
                if let Some(projected) = project_value(source, rest, out.remove(head)) {
                    out.insert(head.clone(), projected);
                }
            }
        }
        Ok(out)
    }
}

fn mismatch(operation: &str, expected: &str, got: &AttributeValue) -> ExpressionError {
    ExpressionError::TypeMismatch(format!("{operation} needs {expected}, got {}", got.tag()))
}

fn number(text: &str) -> Result<Number, ExpressionError> {
    Number::parse(text).map_err(|e| ExpressionError::TypeMismatch(e.to_string()))
}

fn lookup_resolved<'i>(item: &'i Item, steps: &[PathElement]) -> Option<&'i AttributeValue> {
    let (PathElement::Name(head), rest) = steps.split_first()? else {
        return None;
    };
    let mut current = item.get(head)?;
    for step in rest {
        current = match (step, current) {
            (PathElement::Name(name), AttributeValue::M(map)) => map.get(name)?,
            (PathElement::Index(i), AttributeValue::L(list)) => list.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

fn assign(
    item: &mut Item,
    steps: &[PathElement],
    value: AttributeValue,
) -> Result<(), ExpressionError> {
    let Some((PathElement::Name(head), rest)) = steps.split_first() else {
        return Err(ExpressionError::TypeMismatch("path must start with a name".to_owned()));
    };
    let Some((last, middle)) = rest.split_last() else {
        item.insert(head.clone(), value);
        return Ok(());
    };

    let missing = || ExpressionError::MissingAttribute(display_steps(steps));
    let mut current = item.get_mut(head).ok_or_else(missing)?;
    for step in middle {
        current = match (step, current) {
            (PathElement::Name(name), AttributeValue::M(map)) => {
                map.get_mut(name).ok_or_else(missing)?
            }
            (PathElement::Index(i), AttributeValue::L(list)) => {
                list.get_mut(*i).ok_or_else(missing)?
            }
            _ => return Err(missing()),
        };
    }
    match (last, current) {
        (PathElement::Name(name), AttributeValue::M(map)) => {
            map.insert(name.clone(), value);
        }
        (PathElement::Index(i), AttributeValue::L(list)) => {
            if let Some(slot) = list.get_mut(*i) {
                *slot = value;
            } else {
                list.push(value);
            }
        }
        _ => return Err(missing()),
    }
    Ok(())
}

fn remove(item: &mut Item, steps: &[PathElement]) {
    let Some((PathElement::Name(head), rest)) = steps.split_first() else {
        return;
    };
    let Some((last, middle)) = rest.split_last() else {
        item.remove(head);
        return;
    };
    let Some(mut current) = item.get_mut(head) else {
        return;
    };
    for step in middle {
        let next = match (step, current) {
            (PathElement::Name(name), AttributeValue::M(map)) => map.get_mut(name),
            (PathElement::Index(i), AttributeValue::L(list)) => list.get_mut(*i),
            _ => None,
        };
        let Some(next) = next else {
            return;
        };
        current = next;
    }
    match (last, current) {
        (PathElement::Name(name), AttributeValue::M(map)) => {
            map.remove(name);
        }
        (PathElement::Index(i), AttributeValue::L(list)) if *i < list.len() => {
            list.remove(*i);
        }
        _ => {}
    }
}

fn display_steps(steps: &[PathElement]) -> String {
    Path(steps.to_vec()).to_string()
}

fn project_value(
    source: &AttributeValue,
    rest: &[PathElement],
    existing: Option<AttributeValue>,
) -> Option<AttributeValue> {
    let Some((step, tail)) = rest.split_first() else {
        return Some(source.clone());
    };
    match (step, source) {
        (PathElement::Name(name), AttributeValue::M(map)) => {
            let Some(child) = map.get(name) else {
                return existing;
            };
            let mut out = match existing {
                Some(AttributeValue::M(m)) => m,
                _ => HashMap::new(),
            };
            if let Some(projected) = project_value(child, tail, out.remove(name)) {
                out.insert(name.clone(), projected);
            }
            Some(AttributeValue::M(out))
        }
        (PathElement::Index(i), AttributeValue::L(list)) => {
            let Some(child) = list.get(*i) else {
                return existing;
            };
            let mut out = match existing {
                Some(AttributeValue::L(l)) => l,
                _ => Vec::new(),
            };
            out.extend(project_value(child, tail, None));
            Some(AttributeValue::L(out))
        }
        _ => existing,
    }
}

fn compare(
    left: &AttributeValue,
    op: CompareOp,
    right: &AttributeValue,
) -> Result<bool, ExpressionError> {
    match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::Ne => values_equal(left, right).map(|eq| !eq),
        _ => {
            let Some(ordering) = order(left, right)? else {
                return Ok(false);
            };
            Ok(match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
    }
}

/// Ordering of two scalars of the same type; `None` across types.
fn order(
    left: &AttributeValue,
    right: &AttributeValue,
) -> Result<Option<Ordering>, ExpressionError> {
    Ok(match (left, right) {
        (AttributeValue::N(a), AttributeValue::N(b)) => Some(number(a)?.cmp(&number(b)?)),
        (AttributeValue::S(a), AttributeValue::S(b)) => Some(a.cmp(b)),
        (AttributeValue::B(a), AttributeValue::B(b)) => Some(a.cmp(b)),
        _ => None,
    })
}

/// Equality with numeric comparison of numbers and unordered sets.
fn values_equal(left: &AttributeValue, right: &AttributeValue) -> Result<bool, ExpressionError> {
    Ok(match (left, right) {
        (AttributeValue::N(a), AttributeValue::N(b)) => number(a)? == number(b)?,
        (AttributeValue::Ns(a), AttributeValue::Ns(b)) => {
            a.len() == b.len() && all_contained(a, b, |x, y| Ok(number(x)? == number(y)?))?
        }
        (AttributeValue::Ss(a), AttributeValue::Ss(b)) => {
            a.len() == b.len() && a.iter().all(|x| b.contains(x))
        }
        (AttributeValue::Bs(a), AttributeValue::Bs(b)) => {
            a.len() == b.len() && a.iter().all(|x| b.contains(x))
        }
        (AttributeValue::L(a), AttributeValue::L(b)) => {
            a.len() == b.len() && all_contained_in_order(a, b)?
        }
        (AttributeValue::M(a), AttributeValue::M(b)) => {
            if a.len() != b.len() {
                return Ok(false);
            }
            for (k, v) in a {
                match b.get(k) {
                    Some(other) if values_equal(v, other)? => {}
                    _ => return Ok(false),
                }
            }
            true
        }
        _ => left == right,
    })
}

fn all_contained<T>(
    needles: &[T],
    haystack: &[T],
    eq: impl Fn(&T, &T) -> Result<bool, ExpressionError>,
) -> Result<bool, ExpressionError> {
    for needle in needles {
        let mut found = false;
        for candidate in haystack {
            if eq(needle, candidate)? {
                found = true;
                break;
            }
        }
        if !found {
            return Ok(false);
        }
    }
    Ok(true)
}

fn all_contained_in_order(
    a: &[AttributeValue],
    b: &[AttributeValue],
) -> Result<bool, ExpressionError> {
    for (x, y) in a.iter().zip(b) {
        if !values_equal(x, y)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn contains(target: &AttributeValue, needle: &AttributeValue) -> Result<bool, ExpressionError> {
    Ok(match (target, needle) {
        (AttributeValue::S(s), AttributeValue::S(n)) => s.contains(n.as_str()),
        (AttributeValue::B(b), AttributeValue::B(n)) => {
            n.is_empty() || b.windows(n.len()).any(|w| w == n.as_ref())
        }
        (AttributeValue::Ss(set), AttributeValue::S(n)) => set.contains(n),
        (AttributeValue::Ns(set), AttributeValue::N(n)) => {
            all_contained(std::slice::from_ref(n), set, |x, y| Ok(number(x)? == number(y)?))?
        }
        (AttributeValue::Bs(set), AttributeValue::B(n)) => set.contains(n),
        (AttributeValue::L(list), needle) => {
            for element in list {
                if values_equal(element, needle)? {
                    return Ok(true);
                }
            }
            false
        }
        _ => false,
    })
}

fn set_union(
    current: &AttributeValue,
    added: &AttributeValue,
) -> Result<AttributeValue, ExpressionError> {
    Ok(match (current, added) {
        (AttributeValue::Ss(a), AttributeValue::Ss(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().filter(|x| !a.contains(x)).cloned());
            AttributeValue::Ss(out)
        }
        (AttributeValue::Bs(a), AttributeValue::Bs(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().filter(|x| !a.contains(x)).cloned());
            AttributeValue::Bs(out)
        }
        (AttributeValue::Ns(a), AttributeValue::Ns(b)) => {
            let mut out = a.clone();
            for candidate in b {
                let present = all_contained(std::slice::from_ref(candidate), &out, |x, y| {
                    Ok(number(x)? == number(y)?)
                })?;
                if !present {
                    out.push(candidate.clone());
                }
            }
            AttributeValue::Ns(out)
        }
        (current, added) if current.is_set() => return Err(mismatch("ADD", current.tag(), added)),
        (current, _) => {
            return Err(ExpressionError::TypeMismatch(format!(
                "ADD cannot modify an attribute of type {}",
                current.tag()
            )));
        }
    })
}

fn set_difference(
    current: &AttributeValue,
    removed: &AttributeValue,
) -> Result<AttributeValue, ExpressionError> {
    Ok(match (current, removed) {
        (AttributeValue::Ss(a), AttributeValue::Ss(b)) => {
            AttributeValue::Ss(a.iter().filter(|x| !b.contains(x)).cloned().collect())
        }
        (AttributeValue::Bs(a), AttributeValue::Bs(b)) => {
            AttributeValue::Bs(a.iter().filter(|x| !b.contains(x)).cloned().collect())
        }
        (AttributeValue::Ns(a), AttributeValue::Ns(b)) => {
            let mut out = Vec::with_capacity(a.len());
            for x in a {
                let gone = all_contained(std::slice::from_ref(x), b, |x, y| {
                    Ok(number(x)? == number(y)?)
                })?;
                if !gone {
                    out.push(x.clone());
                }
            }
            AttributeValue::Ns(out)
        }
        (current, removed) => return Err(mismatch("DELETE", current.tag(), removed)),
    })
}
