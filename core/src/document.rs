use std::collections::btree_map::{self, BTreeMap};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::CodecError;
use crate::value::Value;

/// A schema-less record: a mapping from field names to [`Value`]s.
///
/// Keys are kept in sorted order so that encoding is canonical.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    pub fn new() -> Self { Self(BTreeMap::new()) }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> { self.0.get(key) }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> { self.0.insert(key.into(), value.into()) }

    pub fn remove(&mut self, key: &str) -> Option<Value> { self.0.remove(key) }

    pub fn contains_key(&self, key: &str) -> bool { self.0.contains_key(key) }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> { self.0.iter() }

    pub fn keys(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }

    /// Shallow merge: every field of `other` overwrites or adds to `self`; fields absent from `other` are kept.
    pub fn merge(&mut self, other: Document) { self.0.extend(other.0) }

    /// Predicate equality, see [`Value::matches`].
    pub fn matches(&self, other: &Document) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(other.0.iter()).all(|((ka, va), (kb, vb))| ka == kb && va.matches(vb))
    }

    /// Build a document from any serializable type whose serialized form is a map.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, CodecError> {
        let json = serde_json::to_value(value).map_err(|e| CodecError::Encode(e.to_string()))?;
        Self::try_from(json)
    }

    /// Deserialize this document into a typed structure.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, CodecError> {
        let json = serde_json::Value::Object(self.to_json_map()?);
        serde_json::from_value(json).map_err(|e| CodecError::Decode(e.to_string()))
    }

    pub fn to_json(&self) -> Result<serde_json::Value, CodecError> { Ok(serde_json::Value::Object(self.to_json_map()?)) }

    pub(crate) fn to_json_map(&self) -> Result<serde_json::Map<String, serde_json::Value>, CodecError> {
        let mut map = serde_json::Map::new();
        for (key, value) in &self.0 {
            map.insert(key.clone(), value.to_json()?);
        }
        Ok(map)
    }

    pub(crate) fn from_json_map(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
    }
}

impl TryFrom<serde_json::Value> for Document {
    type Error = CodecError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::Object(map) => Ok(Self::from_json_map(map)),
            other => Err(CodecError::NotAnObject(Value::from(other).type_name())),
        }
    }
}

impl TryFrom<Value> for Document {
    type Error = CodecError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(doc) => Ok(doc),
            other => Err(CodecError::NotAnObject(other.type_name())),
        }
    }
}

impl TryFrom<&Document> for serde_json::Value {
    type Error = CodecError;

    fn try_from(document: &Document) -> Result<Self, Self::Error> { document.to_json() }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self { Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect()) }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}
