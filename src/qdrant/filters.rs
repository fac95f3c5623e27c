//! Filter helpers for Qdrant search queries.

use serde_json::{Value, json};

use super::payload::NAMESPACE_KEY;

/// Restrict a query to records stamped with `namespace`. Blank namespaces apply no filter.
pub fn build_namespace_filter(namespace: &str) -> Option<Value> {
    let namespace = namespace.trim();
    if namespace.is_empty() {
        return None;
    }
    Some(json!({
        "must": [
            {
                "key": NAMESPACE_KEY,
                "match": { "value": namespace }
            }
        ]
    }))
}
