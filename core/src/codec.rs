//! Text encoding of documents.
//!
//! Documents are stored as compact JSON with keys in sorted order, so equal documents always encode to the same text.

use crate::document::Document;
use crate::error::CodecError;

pub fn encode(document: &Document) -> Result<String, CodecError> {
    let json = document.to_json()?;
    serde_json::to_string(&json).map_err(|e| CodecError::Encode(e.to_string()))
}

pub fn decode(text: &str) -> Result<Document, CodecError> {
    let json: serde_json::Value = serde_json::from_str(text).map_err(|e| CodecError::Decode(e.to_string()))?;
    match json {
        serde_json::Value::Object(map) => Ok(Document::from_json_map(map)),
        other => Err(CodecError::Decode(format!("expected a JSON object at the top level, found `{}`", other))),
    }
}
