use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered key/value metadata taken from a document's front matter.
///
/// Keys keep the order in which they appeared in the source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentMetadata(Map<String, Value>);

impl DocumentMetadata {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Non-empty `title` value, when it is a plain string or number.
    pub fn title(&self) -> Option<String> {
        self.get_text("title")
    }

    /// A scalar value rendered as text; lists and maps yield `None`.
    pub fn get_text(&self, key: &str) -> Option<String> {
        let text = match self.0.get(key)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for DocumentMetadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for DocumentMetadata {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_title_lookup() {
        let mut meta = DocumentMetadata::new();
        assert_eq!(meta.title(), None);

        meta.insert("title", json!("  Report "));
        assert_eq!(meta.title().as_deref(), Some("Report"));

        meta.insert("title", json!(["a", "b"]));
        assert_eq!(meta.title(), None);
    }

    #[test]
    fn test_preserves_insertion_order() {
        let meta: DocumentMetadata = vec![
            ("zeta".to_string(), json!(1)),
            ("alpha".to_string(), json!(2)),
        ]
        .into_iter()
        .collect();
        let keys: Vec<&String> = meta.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }
}
