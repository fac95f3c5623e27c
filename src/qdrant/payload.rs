//! Helpers for building index payloads and reading them back.

use serde_json::{Map, Value};
use uuid::Uuid;

/// Payload key holding the zero-based page number.
pub const PAGE_KEY: &str = "page";
/// Payload key holding the chunk text.
pub const CHUNK_TEXT_KEY: &str = "chunk_text";
/// Payload key holding the source document identifier.
pub const SOURCE_KEY: &str = "source";
/// Payload key holding the chunk position within its document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";
/// Payload key holding the namespace a record belongs to.
pub const NAMESPACE_KEY: &str = "namespace";
/// Payload key preserving the caller-facing record id.
pub const RECORD_ID_KEY: &str = "record_id";

/// Metadata stored with every ingested chunk.
pub fn chunk_metadata(source: &str, page: u32, chunk_index: usize, text: &str) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert(PAGE_KEY.into(), Value::from(page));
    metadata.insert(CHUNK_TEXT_KEY.into(), Value::String(text.to_string()));
    metadata.insert(SOURCE_KEY.into(), Value::String(source.to_string()));
    metadata.insert(CHUNK_INDEX_KEY.into(), Value::from(chunk_index));
    metadata
}

/// Final point payload: record metadata stamped with namespace and record id.
pub(crate) fn build_payload(record_id: &str, namespace: &str, metadata: &Map<String, Value>) -> Value {
    let mut payload = metadata.clone();
    payload.insert(NAMESPACE_KEY.into(), Value::String(namespace.to_string()));
    payload.insert(RECORD_ID_KEY.into(), Value::String(record_id.to_string()));
    Value::Object(payload)
}

/// Qdrant only accepts UUIDs or integers as point ids; derive a stable UUID from the record id.
pub(crate) fn point_id(record_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, record_id.as_bytes()).to_string()
}

/// Page number stored in a payload; missing or malformed values read as page 0.
pub fn page_number(payload: &Map<String, Value>) -> u32 {
    payload
        .get(PAGE_KEY)
        .and_then(|value| match value {
            Value::Number(number) => number
                .as_u64()
                .or_else(|| number.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64)),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
        .and_then(|page| u32::try_from(page).ok())
        .unwrap_or(0)
}

/// Chunk text stored in a payload; missing values read as the empty string.
pub fn chunk_text(payload: &Map<String, Value>) -> String {
    match payload.get(CHUNK_TEXT_KEY) {
        Some(Value::String(text)) => text.clone(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn point_id_is_stable_uuid() {
        let first = point_id("lecture_0");
        assert_eq!(first, point_id("lecture_0"));
        assert_ne!(first, point_id("lecture_1"));
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn payload_carries_metadata_namespace_and_id() {
        let metadata = chunk_metadata("lecture", 4, 7, "ownership");
        let payload = build_payload("lecture_7", "pdf-namespace", &metadata);
        assert_eq!(payload["page"], 4);
        assert_eq!(payload["chunk_text"], "ownership");
        assert_eq!(payload["source"], "lecture");
        assert_eq!(payload["chunk_index"], 7);
        assert_eq!(payload["namespace"], "pdf-namespace");
        assert_eq!(payload["record_id"], "lecture_7");
    }

    #[test]
    fn page_number_tolerates_common_encodings() {
        let as_map = |value: Value| value.as_object().cloned().expect("object");
        assert_eq!(page_number(&as_map(json!({ "page": 3 }))), 3);
        assert_eq!(page_number(&as_map(json!({ "page": 3.0 }))), 3);
        assert_eq!(page_number(&as_map(json!({ "page": "5" }))), 5);
        assert_eq!(page_number(&as_map(json!({}))), 0);
        assert_eq!(chunk_text(&as_map(json!({ "chunk_text": "hi" }))), "hi");
        assert_eq!(chunk_text(&as_map(json!({}))), "");
    }
}
