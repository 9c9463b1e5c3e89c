//! Remote Document Module
//!
//! The parsed form of the stored JSON object.

use bytes::Bytes;
use serde_json::Value;

use super::{ObjectMetadata, StoredObject};
use crate::error::StorageError;

// == Remote Document ==
/// A stored object known to be valid JSON.
///
/// The raw bytes are kept so the full document can be served exactly as
/// stored; the parsed value backs path lookups and queries.
#[derive(Debug, Clone)]
pub struct RemoteDocument {
    body: Bytes,
    value: Value,
    metadata: ObjectMetadata,
}

impl RemoteDocument {
    // == Constructor ==
    /// Validates a stored object as JSON.
    pub fn parse(object: StoredObject) -> Result<Self, StorageError> {
        let value = serde_json::from_slice(&object.body)
            .map_err(|e| StorageError::Malformed(format!("document is not valid JSON: {e}")))?;

        Ok(Self {
            body: object.body,
            value,
            metadata: object.metadata,
        })
    }

    /// Exact bytes as stored.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn metadata(&self) -> &ObjectMetadata {
        &self.metadata
    }

    /// Body size in bytes.
    pub fn size(&self) -> u64 {
        self.body.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(body: &'static str) -> StoredObject {
        StoredObject {
            body: Bytes::from_static(body.as_bytes()),
            metadata: ObjectMetadata::default(),
        }
    }

    #[test]
    fn test_parse_keeps_original_bytes() {
        let raw = "{ \"b\": 1,\n  \"a\": [true, null] }";
        let doc = RemoteDocument::parse(stored(raw)).unwrap();

        assert_eq!(doc.body().as_ref(), raw.as_bytes());
        assert_eq!(doc.value()["a"][0], true);
        assert_eq!(doc.size(), raw.len() as u64);
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let result = RemoteDocument::parse(stored("{\"halls\": "));
        assert!(matches!(result, Err(StorageError::Malformed(_))));
    }

    #[test]
    fn test_parse_accepts_any_json_shape() {
        assert!(RemoteDocument::parse(stored("[1, 2, 3]")).is_ok());
        assert!(RemoteDocument::parse(stored("\"just a string\"")).is_ok());
    }
}
