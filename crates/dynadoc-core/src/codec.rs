//! Conversion between native [`Value`]s and tagged wire [`AttributeValue`]s.
//!
//! Encoding drops `Undefined` wherever it appears. Decoding is an exhaustive
//! match over the wire tags; numbers are validated against the precision
//! ceiling on the way in.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use dynadoc_model::AttributeValue;
use dynadoc_model::attribute_value::TAGS;

use crate::error::CodecError;
use crate::value::{Item, Number, Value};

/// How strings that look like numbers are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NumericStrings {
    /// Non-empty ASCII digit strings are sent as `N`.
    #[default]
    Digits,
    /// Any string that is a valid decimal literal is sent as `N`.
    Float,
    /// Strings are always sent as `S`.
    Preserve,
}

impl FromStr for NumericStrings {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "digits" => Ok(Self::Digits),
            "float" => Ok(Self::Float),
            "preserve" => Ok(Self::Preserve),
            other => Err(format!("unknown numeric string mode '{other}'")),
        }
    }
}

/// What to do with a set that has no members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EmptySetPolicy {
    /// Fail with `UnsupportedValueShape`.
    #[default]
    Reject,
    /// Treat the set as absent and drop the field.
    Omit,
}

impl FromStr for EmptySetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "omit" => Ok(Self::Omit),
            other => Err(format!("unknown empty set policy '{other}'")),
        }
    }
}

/// Codec behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecOptions {
    /// Numeric-string coercion mode.
    pub numeric_strings: NumericStrings,
    /// Empty set handling.
    pub empty_sets: EmptySetPolicy,
}

/// Value codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    options: CodecOptions,
}

impl Codec {
    /// Create a codec with the given options.
    #[must_use]
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    /// The active options.
    #[must_use]
    pub fn options(&self) -> CodecOptions {
        self.options
    }

    /// Encode a value. `Ok(None)` means the field must be left out.
    pub fn encode(&self, value: &Value) -> Result<Option<AttributeValue>, CodecError> {
        let wire = match value {
            Value::Undefined => return Ok(None),
            Value::String(s) => {
                if self.is_numeric_string(s) {
                    AttributeValue::N(s.clone())
                } else {
                    AttributeValue::S(s.clone())
                }
            }
            Value::Number(n) => AttributeValue::N(n.to_string()),
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::Null => AttributeValue::Null(true),
            Value::Binary(b) => AttributeValue::B(b.clone()),
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(wire) = self.encode(item)? {
                        out.push(wire);
                    }
                }
                AttributeValue::L(out)
            }
            Value::Map(fields) => AttributeValue::M(self.encode_item(fields)?),
            Value::StringSet(set) => {
                if set.is_empty() {
                    return self.empty_set("string");
                }
                AttributeValue::Ss(set.iter().cloned().collect())
            }
            Value::NumberSet(set) => {
                if set.is_empty() {
                    return self.empty_set("number");
                }
                AttributeValue::Ns(set.iter().map(ToString::to_string).collect())
            }
            Value::BinarySet(set) => {
                if set.is_empty() {
                    return self.empty_set("binary");
                }
                AttributeValue::Bs(set.iter().cloned().collect())
            }
        };
        Ok(Some(wire))
    }

    /// Encode a top-level item into the flat wire map, dropping omitted fields.
    pub fn encode_item(
        &self,
        item: &BTreeMap<String, Value>,
    ) -> Result<HashMap<String, AttributeValue>, CodecError> {
        let mut out = HashMap::with_capacity(item.len());
        for (name, value) in item {
            if let Some(wire) = self.encode(value)? {
                out.insert(name.clone(), wire);
            }
        }
        Ok(out)
    }

    /// Decode a wire value. An absent value decodes to `None`.
    pub fn decode(&self, wire: Option<&AttributeValue>) -> Result<Option<Value>, CodecError> {
        wire.map(|w| self.decode_value(w)).transpose()
    }

    /// Decode a whole wire item.
    pub fn decode_item(&self, item: &HashMap<String, AttributeValue>) -> Result<Item, CodecError> {
        item.iter()
            .map(|(name, wire)| Ok((name.clone(), self.decode_value(wire)?)))
            .collect()
    }

    /// Decode raw JSON that is either wire-tagged or already native.
    ///
    /// An object whose only key is a wire tag is decoded as a wire value. An
    /// object with no wire tags, an array or a scalar is taken as native, with
    /// its children decoded the same way. Any other mix of tags is rejected.
    pub fn decode_json(&self, json: &serde_json::Value) -> Result<Value, CodecError> {
        match json {
            serde_json::Value::Object(fields) => {
                let tags: Vec<&str> = fields
                    .keys()
                    .map(String::as_str)
                    .filter(|k| TAGS.contains(k))
                    .collect();
                match (tags.as_slice(), fields.len()) {
                    ([], _) => Ok(Value::Map(
                        fields
                            .iter()
                            .map(|(k, v)| Ok((k.clone(), self.decode_json(v)?)))
                            .collect::<Result<_, CodecError>>()?,
                    )),
                    ([_], 1) => {
                        let wire: AttributeValue = serde_json::from_value(json.clone())
                            .map_err(|e| CodecError::UnsupportedValueShape(e.to_string()))?;
                        self.decode_value(&wire)
                    }
                    _ => Err(CodecError::UnsupportedValueShape(format!(
                        "wire value must carry exactly one tag, found keys {:?}",
                        fields.keys().collect::<Vec<_>>()
                    ))),
                }
            }
            serde_json::Value::Array(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|v| self.decode_json(v))
                    .collect::<Result<_, _>>()?,
            )),
            scalar => Value::from_json(scalar),
        }
    }

    fn decode_value(&self, wire: &AttributeValue) -> Result<Value, CodecError> {
        Ok(match wire {
            AttributeValue::S(s) => Value::String(s.clone()),
            AttributeValue::N(n) => Value::Number(Number::parse(n)?),
            AttributeValue::B(b) => Value::Binary(b.clone()),
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::Null(_) => Value::Null,
            AttributeValue::M(fields) => Value::Map(self.decode_item(fields)?),
            AttributeValue::L(items) => Value::List(
                items
                    .iter()
                    .map(|w| self.decode_value(w))
                    .collect::<Result<_, _>>()?,
            ),
            AttributeValue::Ss(members) => Value::StringSet(members.iter().cloned().collect()),
            AttributeValue::Ns(members) => Value::NumberSet(
                members
                    .iter()
                    .map(|n| Number::parse(n))
                    .collect::<Result<BTreeSet<_>, _>>()?,
            ),
            AttributeValue::Bs(members) => Value::BinarySet(members.iter().cloned().collect()),
        })
    }

    fn is_numeric_string(&self, s: &str) -> bool {
        match self.options.numeric_strings {
            NumericStrings::Preserve => false,
            // Digit strings beyond the precision ceiling stay strings.
            NumericStrings::Digits => {
                !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && Number::parse(s).is_ok()
            }
            NumericStrings::Float => Number::parse(s).is_ok(),
        }
    }

    fn empty_set(&self, kind: &str) -> Result<Option<AttributeValue>, CodecError> {
        match self.options.empty_sets {
            EmptySetPolicy::Omit => Ok(None),
            EmptySetPolicy::Reject => Err(CodecError::UnsupportedValueShape(format!(
                "empty {kind} set has no wire representation"
            ))),
        }
    }
}

/// Encode with default options.
pub fn encode(value: &Value) -> Result<Option<AttributeValue>, CodecError> {
    Codec::default().encode(value)
}

/// Decode with default options.
pub fn decode(wire: Option<&AttributeValue>) -> Result<Option<Value>, CodecError> {
    Codec::default().decode(wire)
}

/// Encode a top-level item with default options.
pub fn encode_item(
    item: &BTreeMap<String, Value>,
) -> Result<HashMap<String, AttributeValue>, CodecError> {
    Codec::default().encode_item(item)
}

/// Decode a wire item with default options.
pub fn decode_item(item: &HashMap<String, AttributeValue>) -> Result<Item, CodecError> {
    Codec::default().decode_item(item)
}

/// Decode raw wire-or-native JSON with default options.
pub fn decode_json(json: &serde_json::Value) -> Result<Value, CodecError> {
    Codec::default().decode_json(json)
}
