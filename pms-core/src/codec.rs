//! Textual list encoding for `tech_stack` and `required_team`.
//!
//! Stores keep these lists as JSON text in a single column. Decoding never
//! fails: absent, empty, `null` or malformed text all read as an empty list.

use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode_list<T: Serialize>(items: &[T]) -> String {
    serde_json::to_string(items).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to encode list, storing empty list");
        "[]".to_string()
    })
}

pub fn decode_list<T: DeserializeOwned>(raw: Option<&str>) -> Vec<T> {
    let raw = match raw.map(str::trim) {
        None | Some("") | Some("null") => return Vec::new(),
        Some(raw) => raw,
    };
    match serde_json::from_str::<Option<Vec<T>>>(raw) {
        Ok(items) => items.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, value = raw, "Ignoring malformed list text");
            Vec::new()
        }
    }
}

/// Split comma separated form input into trimmed, non-empty tags.
pub fn split_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_tags(tags: &[String]) -> String {
    tags.join(", ")
}
