//! Filter documents by a single field. Stored payloads are opaque to the index, so every predicate is evaluated
//! against decoded documents.
//!
//! A field that is absent from a document never matches, whatever the predicate.

use crate::document::Document;
use crate::glob::GlobPattern;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field == value`
    Equals { key: String, value: Value },
    /// The field is a string matching a glob pattern
    Glob { key: String, pattern: GlobPattern },
    /// The field equals one of `values`, or is an array sharing at least one element with `values`
    AnyOf { key: String, values: Vec<Value> },
    /// The field is an array containing every element of `values`
    AllOf { key: String, values: Vec<Value> },
}

impl Predicate {
    pub fn equals(key: impl Into<String>, value: impl Into<Value>) -> Self { Predicate::Equals { key: key.into(), value: value.into() } }

    pub fn glob(key: impl Into<String>, pattern: &str) -> Self { Predicate::Glob { key: key.into(), pattern: GlobPattern::new(pattern) } }

    pub fn any_of(key: impl Into<String>, values: Vec<Value>) -> Self { Predicate::AnyOf { key: key.into(), values } }

    pub fn all_of(key: impl Into<String>, values: Vec<Value>) -> Self { Predicate::AllOf { key: key.into(), values } }

    pub fn key(&self) -> &str {
        match self {
            Predicate::Equals { key, .. } | Predicate::Glob { key, .. } | Predicate::AnyOf { key, .. } | Predicate::AllOf { key, .. } => key,
        }
    }

    pub fn evaluate(&self, document: &Document) -> bool {
        let Some(field) = document.get(self.key()) else {
            return false;
        };

        match self {
            Predicate::Equals { value, .. } => field.matches(value),
            Predicate::Glob { pattern, .. } => field.as_str().is_some_and(|s| pattern.matches(s)),
            Predicate::AnyOf { values, .. } => match field {
                Value::Array(items) => items.iter().any(|item| contains(values, item)),
                scalar => contains(values, scalar),
            },
            Predicate::AllOf { values, .. } => match field {
                Value::Array(items) => values.iter().all(|wanted| contains(items, wanted)),
                scalar => values.len() == 1 && values[0].matches(scalar),
            },
        }
    }
}

fn contains(haystack: &[Value], needle: &Value) -> bool { haystack.iter().any(|v| v.matches(needle)) }
