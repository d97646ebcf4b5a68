use std::fmt::Display;

use crate::document::Document;
use crate::error::CodecError;

/// A dynamically typed document value.
///
/// This is the closed set of shapes a JSON payload can take. Integers and floats are kept apart so that a stored
/// document decodes back to exactly what was inserted.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(Document),
}

impl Value {
    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Document> {
        match self {
            Value::Object(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Equality used when evaluating predicates.
    ///
    /// Unlike `==`, an `Int` and a `Float` holding the same number are equal, recursively through arrays and objects.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => float_equals_int(*f, *i),
            (Value::Array(a), Value::Array(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y)),
            (Value::Object(a), Value::Object(b)) => a.matches(b),
            _ => self == other,
        }
    }

    /// Convert into a `serde_json::Value`. Non-finite floats have no JSON representation and are rejected.
    pub fn to_json(&self) -> Result<serde_json::Value, CodecError> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| CodecError::Encode(format!("non-finite float {} is not representable", f)))?,
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect::<Result<_, _>>()?),
            Value::Object(doc) => serde_json::Value::Object(doc.to_json_map()?),
        })
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                // u64 beyond i64::MAX and every non-integral number
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Value::Object(Document::from_json_map(map)),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_json() {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::String(s.to_owned()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::String(s) }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self { Value::String(s.clone()) }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self { Value::Int(i) }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self { Value::Int(i as i64) }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self { Value::Int(i as i64) }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self { Value::Float(f) }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self { Value::Object(doc) }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self { Value::Array(items.into_iter().map(Into::into).collect()) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Exact comparison: `i as f64` rounds above 2^53, so the float is converted instead, and only when it is integral
/// and inside the `i64` range.
fn float_equals_int(f: f64, i: i64) -> bool { f.fract() == 0.0 && (-9.223372036854775808e18..9.223372036854775808e18).contains(&f) && f as i64 == i }
