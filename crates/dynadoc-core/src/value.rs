//! Native values: what callers read and write.
//!
//! [`Value`] is the caller-facing tree. [`Number`] keeps numbers as validated
//! decimal text so values up to the store's precision survive a round trip
//! without passing through a float.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CodecError, Result};

/// Maximum number of significant digits a number may carry.
pub const MAX_SIGNIFICANT_DIGITS: u64 = 38;
/// Largest decimal magnitude (exponent of the leading digit).
pub const MAX_MAGNITUDE: i64 = 125;
/// Smallest decimal magnitude.
pub const MIN_MAGNITUDE: i64 = -130;

// ---------------------------------------------------------------------------
// Number
// ---------------------------------------------------------------------------

/// A decimal number within the store's limits.
///
/// The original text is kept verbatim for encoding. Equality, ordering and
/// hashing are numeric, so `"1.50"` and `"1.5"` are the same number.
#[derive(Debug, Clone)]
pub struct Number {
    text: String,
    /// Normalized value: no trailing zeros in the mantissa.
    value: BigDecimal,
}

impl Number {
    /// Parse and validate a decimal literal: optional sign, digits with at
    /// most one `.`, optional exponent.
    pub fn parse(s: &str) -> Result<Self, CodecError> {
        let invalid = || CodecError::InvalidNumber(format!("'{s}' is not a decimal number"));

        // BigDecimal also accepts digit separators; the wire format does not.
        let well_formed = s.bytes().any(|b| b.is_ascii_digit())
            && s.bytes()
                .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'+' | b'-' | b'e' | b'E'));
        if !well_formed {
            return Err(invalid());
        }
        let value = BigDecimal::from_str(s).map_err(|_| invalid())?;
        Self::checked(s.to_owned(), value)
    }

    /// Convert a finite float using its shortest round-trip representation.
    pub fn from_f64(v: f64) -> Result<Self, CodecError> {
        if !v.is_finite() {
            return Err(CodecError::InvalidNumber(format!("{v} is not finite")));
        }
        Self::parse(&v.to_string())
    }

    /// Normalize `value` and enforce the precision and magnitude ceiling.
    fn checked(text: String, value: BigDecimal) -> Result<Self, CodecError> {
        let value = value.normalized();
        if value.is_zero() {
            return Ok(Self { text, value });
        }

        let digits = value.digits();
        if digits > MAX_SIGNIFICANT_DIGITS {
            return Err(CodecError::InvalidNumber(format!(
                "'{text}' has more than {MAX_SIGNIFICANT_DIGITS} significant digits"
            )));
        }
        let (_, scale) = value.as_bigint_and_exponent();
        let magnitude = i64::try_from(digits)
            .unwrap_or(i64::MAX)
            .saturating_sub(1)
            .saturating_sub(scale);
        if magnitude > MAX_MAGNITUDE {
            return Err(CodecError::InvalidNumber(format!(
                "'{text}' overflows the supported magnitude 1e{MAX_MAGNITUDE}"
            )));
        }
        if magnitude < MIN_MAGNITUDE {
            return Err(CodecError::InvalidNumber(format!(
                "'{text}' underflows the supported magnitude 1e{MIN_MAGNITUDE}"
            )));
        }
        Ok(Self { text, value })
    }

    /// Wrap a computed value, rendering it in plain notation.
    fn from_decimal(value: BigDecimal) -> Result<Self, CodecError> {
        let value = value.normalized();
        Self::checked(value.to_plain_string(), value)
    }

    /// The decimal text exactly as supplied.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns `true` if the number is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Returns `true` if the number has no fractional part.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        let (_, scale) = self.value.as_bigint_and_exponent();
        scale <= 0
    }

    /// The value as `i64`, if it is integral and in range.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.is_integer().then(|| self.value.to_i64()).flatten()
    }

    /// The value as `u64`, if it is integral, non-negative and in range.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        self.is_integer().then(|| self.value.to_u64()).flatten()
    }

    /// The nearest `f64`. Lossy for more than ~17 significant digits.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.value.to_f64().unwrap_or(f64::NAN)
    }

    /// Exact sum. Fails if the result leaves the supported range.
    pub fn try_add(&self, other: &Self) -> Result<Self, CodecError> {
        if other.is_zero() {
            return Ok(self.clone());
        }
        if self.is_zero() {
            return Ok(other.clone());
        }
        Self::from_decimal(&self.value + &other.value).map_err(|_| {
            CodecError::InvalidNumber(format!("{self} + {other} is out of range"))
        })
    }

    /// Exact difference.
    pub fn try_sub(&self, other: &Self) -> Result<Self, CodecError> {
        self.try_add(&other.negated())
    }

    /// The number with its sign flipped.
    #[must_use]
    pub fn negated(&self) -> Self {
        if self.is_zero() {
            return self.clone();
        }
        let text = match self.text.strip_prefix('-') {
            Some(rest) => rest.to_owned(),
            None => format!("-{}", self.text.strip_prefix('+').unwrap_or(&self.text)),
        };
        Self {
            text,
            value: -self.value.clone(),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Number {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<f64> for Number {
    type Error = CodecError;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        Self::from_f64(v)
    }
}

// Primitive integers are at most 20 digits, always inside the ceiling.
macro_rules! number_from_int {
    ($($t:ty => $wide:ty),*) => {
        $(
            impl From<$t> for Number {
                #[allow(clippy::cast_lossless, clippy::cast_possible_truncation)]
                fn from(v: $t) -> Self {
                    Self {
                        text: v.to_string(),
                        value: BigDecimal::from(v as $wide).normalized(),
                    }
                }
            }

            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Number(Number::from(v))
                }
            }
        )*
    };
}

number_from_int!(
    i8 => i64,
    i16 => i64,
    i32 => i64,
    i64 => i64,
    isize => i64,
    u8 => u64,
    u16 => u64,
    u32 => u64,
    u64 => u64,
    usize => u64
);

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A native item: attribute name to value.
pub type Item = BTreeMap<String, Value>;

/// A native value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// UTF-8 string.
    String(String),
    /// Decimal number.
    Number(Number),
    /// Boolean.
    Bool(bool),
    /// Explicit null.
    Null,
    /// Binary blob.
    Binary(Bytes),
    /// Nested map.
    Map(BTreeMap<String, Value>),
    /// Ordered list.
    List(Vec<Value>),
    /// Set of strings.
    StringSet(BTreeSet<String>),
    /// Set of numbers.
    NumberSet(BTreeSet<Number>),
    /// Set of binary blobs.
    BinarySet(BTreeSet<Bytes>),
    /// No value: the field is left out when encoding.
    #[default]
    Undefined,
}

impl Value {
    /// Build a set from loose members.
    ///
    /// Every member must be a string, every member a number, or every member
    /// a binary blob. Empty input and mixed kinds are rejected.
    pub fn set_of<I>(members: I) -> Result<Self, CodecError>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut iter = members.into_iter();
        let Some(first) = iter.next() else {
            return Err(CodecError::UnsupportedValueShape(
                "a set needs at least one member".to_owned(),
            ));
        };
        let mixed = |kind: &str, member: &Value| {
            CodecError::UnsupportedValueShape(format!(
                "set members must share one kind: expected {kind}, found {}",
                member.kind()
            ))
        };

        match first {
            Value::String(s) => {
                let mut set = BTreeSet::from([s]);
                for member in iter {
                    match member {
                        Value::String(s) => set.insert(s),
                        other => return Err(mixed("string", &other)),
                    };
                }
                Ok(Value::StringSet(set))
            }
            Value::Number(n) => {
                let mut set = BTreeSet::from([n]);
                for member in iter {
                    match member {
                        Value::Number(n) => set.insert(n),
                        other => return Err(mixed("number", &other)),
                    };
                }
                Ok(Value::NumberSet(set))
            }
            Value::Binary(b) => {
                let mut set = BTreeSet::from([b]);
                for member in iter {
                    match member {
                        Value::Binary(b) => set.insert(b),
                        other => return Err(mixed("binary", &other)),
                    };
                }
                Ok(Value::BinarySet(set))
            }
            other => Err(CodecError::UnsupportedValueShape(format!(
                "sets hold strings, numbers or binary, not {}",
                other.kind()
            ))),
        }
    }

    /// Short name of the variant, for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Null => "null",
            Self::Binary(_) => "binary",
            Self::Map(_) => "map",
            Self::List(_) => "list",
            Self::StringSet(_) => "string set",
            Self::NumberSet(_) => "number set",
            Self::BinarySet(_) => "binary set",
            Self::Undefined => "undefined",
        }
    }

    /// Returns `true` for [`Value::Undefined`].
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns the string if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a `Number`.
    #[must_use]
    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the map if this is a `Map`.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the list if this is a `List`.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Look up a field of a `Map`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_map()?.get(field)
    }

    /// Convert plain JSON into a native value.
    ///
    /// Arrays become lists and objects become maps; JSON has no sets or binary.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CodecError> {
        Ok(match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => Self::Number(number_from_json(n)?),
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => Self::List(
                items
                    .iter()
                    .map(Self::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(fields) => Self::Map(
                fields
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), Self::from_json(v)?)))
                    .collect::<Result<_, CodecError>>()?,
            ),
        })
    }

    /// Convert into plain JSON.
    ///
    /// Sets become arrays, binary becomes base64 text, and `Undefined` map
    /// fields are dropped. Numbers beyond `i64`/`u64` go through `f64`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Number(n) => number_to_json(n),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Null | Self::Undefined => serde_json::Value::Null,
            Self::Binary(b) => serde_json::Value::String(STANDARD.encode(b)),
            Self::Map(m) => serde_json::Value::Object(
                m.iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::List(l) => serde_json::Value::Array(
                l.iter()
                    .filter(|v| !v.is_undefined())
                    .map(Self::to_json)
                    .collect(),
            ),
            Self::StringSet(s) => s.iter().cloned().map(serde_json::Value::String).collect(),
            Self::NumberSet(s) => s.iter().map(number_to_json).collect(),
            Self::BinarySet(s) => s
                .iter()
                .map(|b| serde_json::Value::String(STANDARD.encode(b)))
                .collect(),
        }
    }
}

fn number_from_json(n: &serde_json::Number) -> Result<Number, CodecError> {
    if let Some(i) = n.as_i64() {
        Ok(Number::from(i))
    } else if let Some(u) = n.as_u64() {
        Ok(Number::from(u))
    } else {
        Number::parse(&n.to_string())
    }
}

fn number_to_json(n: &Number) -> serde_json::Value {
    if let Some(i) = n.as_i64() {
        return serde_json::Value::from(i);
    }
    if let Some(u) = n.as_u64() {
        return serde_json::Value::from(u);
    }
    serde_json::Number::from_f64(n.as_f64()).map_or_else(
        || serde_json::Value::String(n.to_string()),
        serde_json::Value::Number,
    )
}

/// Convert a serializable record into a native value.
pub fn to_value<T: Serialize>(record: &T) -> Result<Value> {
    let json = serde_json::to_value(record)?;
    Ok(Value::from_json(&json)?)
}

/// Convert a native value into a deserializable record.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T> {
    Ok(serde_json::from_value(value.to_json())?)
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Number> for Value {
    fn from(v: Number) -> Self {
        Self::Number(v)
    }
}

impl TryFrom<f64> for Value {
    type Error = CodecError;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        Ok(Self::Number(Number::from_f64(v)?))
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Self::Binary(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Map(v)
    }
}

impl From<BTreeSet<String>> for Value {
    fn from(v: BTreeSet<String>) -> Self {
        Self::StringSet(v)
    }
}

impl From<BTreeSet<Number>> for Value {
    fn from(v: BTreeSet<Number>) -> Self {
        Self::NumberSet(v)
    }
}

impl From<BTreeSet<Bytes>> for Value {
    fn from(v: BTreeSet<Bytes>) -> Self {
        Self::BinarySet(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Undefined, Into::into)
    }
}
