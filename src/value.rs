//! Polymorphic field values carried by lifted nodes.

use std::collections::BTreeMap;

use serde::Serialize;

/// A scalar or structured attribute value attached to a node field.
///
/// # Examples
///
/// ```rust
/// use astpack::value::FieldValue;
/// let v = FieldValue::Int(3);
/// assert_eq!(v.type_name(), "Int");
/// let s = FieldValue::Str("script".to_string());
/// assert_eq!(s.as_str(), Some("script"));
/// let nil = FieldValue::default();
/// assert!(nil.is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Returns the type name of the value as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "Null",
            FieldValue::Bool(_) => "Bool",
            FieldValue::Int(_) => "Int",
            FieldValue::Float(_) => "Float",
            FieldValue::Str(_) => "Str",
            FieldValue::Array(_) => "Array",
            FieldValue::Map(_) => "Map",
        }
    }

    /// Returns true if the value is Null.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns the contained string if this is a Str value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the contained integer if this is an Int value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Lifts a raw JSON value into a field value.
    ///
    /// Integral JSON numbers in `i64` range become [`FieldValue::Int`];
    /// every other number becomes [`FieldValue::Float`].
    pub fn from_json(raw: &serde_json::Value) -> FieldValue {
        use serde_json::Value;
        match raw {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => FieldValue::Str(s.clone()),
            Value::Array(items) => {
                FieldValue::Array(items.iter().map(FieldValue::from_json).collect())
            }
            Value::Object(map) => FieldValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}
