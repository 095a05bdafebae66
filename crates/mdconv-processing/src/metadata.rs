//! Front matter sanitization
//!
//! Metadata ends up in rendered HTML, document headers and download names,
//! so keys and values are normalized and bounded before anything uses them.

use mdconv_core::{DocumentMetadata, MetadataLimits};
use regex::Regex;
use serde_json::map::Entry;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static KEY_INVALID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-]").expect("static regex"));
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("static regex"));
static JS_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:").expect("static regex"));

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Normalize a metadata key. Returns `None` when nothing usable is left.
pub fn sanitize_key(key: &str, limits: &MetadataLimits) -> Option<String> {
    let replaced = KEY_INVALID.replace_all(key.trim(), "_");
    let key = truncate_chars(&replaced, limits.max_key_len);
    (!key.is_empty()).then_some(key)
}

/// Strip markup and script schemes from a string value, then bound its length.
pub fn sanitize_text(value: &str, max_len: usize) -> String {
    let without_tags = HTML_TAG.replace_all(value, "");
    let without_js = JS_SCHEME.replace_all(&without_tags, "");
    truncate_chars(without_js.trim(), max_len)
}

fn sanitize_map(map: Map<String, Value>, limits: &MetadataLimits) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in map {
        let Some(key) = sanitize_key(&key, limits) else {
            tracing::debug!("Dropping metadata entry with empty key");
            continue;
        };
        match out.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(sanitize_value(value, limits, limits.max_value_len));
            }
            // First occurrence wins
            Entry::Occupied(slot) => {
                tracing::debug!(key = %slot.key(), "Dropping metadata entry with colliding key");
            }
        }
    }
    out
}

fn sanitize_value(value: Value, limits: &MetadataLimits, max_len: usize) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_text(&s, max_len)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .take(limits.max_list_items)
                .map(|item| sanitize_value(item, limits, limits.max_list_item_len))
                .collect(),
        ),
        Value::Object(map) => Value::Object(sanitize_map(map, limits)),
        scalar => scalar,
    }
}

/// Apply key and value limits to extracted front matter.
pub fn sanitize_metadata(metadata: DocumentMetadata, limits: &MetadataLimits) -> DocumentMetadata {
    sanitize_map(metadata.into_map(), limits).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sanitize(value: Value) -> Value {
        let map = value.as_object().cloned().unwrap();
        Value::Object(sanitize_metadata(map.into(), &MetadataLimits::default()).into_map())
    }

    #[test]
    fn test_key_normalization() {
        let mut input = json!({
            "title": "T",
            "bad key!": 1,
            "": 3,
        });
        input
            .as_object_mut()
            .unwrap()
            .insert("x".repeat(80), json!(2));
        let out = sanitize(input);
        let obj = out.as_object().unwrap();
        assert!(obj.contains_key("title"));
        assert!(obj.contains_key("bad_key_"));
        assert!(obj.contains_key(&"x".repeat(50)));
        assert_eq!(obj.len(), 3);
    }

    #[test]
    fn test_string_values_stripped() {
        let out = sanitize(json!({
            "title": "<b>Bold</b> <script>alert(1)</script>Title",
            "link": "JavaScript:alert(1)",
        }));
        assert_eq!(out["title"], json!("Bold alert(1)Title"));
        assert_eq!(out["link"], json!("alert(1)"));
    }

    #[test]
    fn test_value_length_limits() {
        let out = sanitize(json!({ "summary": "y".repeat(900) }));
        assert_eq!(out["summary"].as_str().unwrap().chars().count(), 500);
    }

    #[test]
    fn test_list_limits() {
        let items: Vec<String> = (0..15).map(|i| format!("{}{}", i, "z".repeat(150))).collect();
        let out = sanitize(json!({ "tags": items }));
        let tags = out["tags"].as_array().unwrap();
        assert_eq!(tags.len(), 10);
        assert!(tags.iter().all(|t| t.as_str().unwrap().chars().count() == 100));
    }

    #[test]
    fn test_nested_maps_and_scalars() {
        let out = sanitize(json!({
            "owner": { "full name": "<i>Ada</i>", "id": 7 },
            "draft": true,
            "missing": null,
        }));
        assert_eq!(out["owner"], json!({ "full_name": "Ada", "id": 7 }));
        assert_eq!(out["draft"], json!(true));
        assert_eq!(out["missing"], Value::Null);
    }

    #[test]
    fn test_preserves_order() {
        let out = sanitize(json!({ "b": 1, "a": 2, "c": 3 }));
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_colliding_keys_keep_first() {
        let out = sanitize(json!({
            "due date": "first",
            "due_date": "second",
            "due$date": "third",
        }));
        assert_eq!(out, json!({ "due_date": "first" }));
    }
}
