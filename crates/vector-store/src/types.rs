use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar metadata value (`String | Number | Bool`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl MetadataValue {
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric value as a non-negative integer position, if it is one.
    #[must_use]
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Self::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

/// Item metadata, keyed by field name
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A stored (vector, metadata) record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub metadata: Metadata,
    pub vector: Vec<f32>,
    /// Euclidean norm of `vector`
    pub norm: f32,
    /// Side file holding the full metadata when some keys are not indexed
    #[serde(
        rename = "metadataFile",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata_file: Option<String>,
}

/// Input for `insert_item` / `upsert_item`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewItem {
    /// Generated (UUID v4) when absent
    pub id: Option<String>,
    pub vector: Vec<f32>,
    pub metadata: Metadata,
}

impl NewItem {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            ..Default::default()
        }
    }

    /// Builder: set id
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder: add a metadata field
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Builder: replace all metadata
    #[must_use]
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Which metadata keys stay inline in the index file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<Vec<String>>,
}

impl MetadataConfig {
    #[must_use]
    pub fn indexed_keys(&self) -> &[String] {
        self.indexed.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn is_indexed(&self, key: &str) -> bool {
        self.indexed_keys().iter().any(|k| k == key)
    }
}

/// Persisted snapshot of a store (`index.json`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub version: u32,
    #[serde(default)]
    pub metadata_config: MetadataConfig,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Summary of the committed index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub version: u32,
    pub metadata_config: MetadataConfig,
    pub items: usize,
}

/// An item ranked against a query vector
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub item: Item,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn metadata_values_parse_untagged() {
        let meta: Metadata =
            serde_json::from_str(r#"{"a": "x", "b": 3, "c": true, "d": 2.5}"#).unwrap();
        assert_eq!(meta["a"], MetadataValue::String("x".into()));
        assert_eq!(meta["b"], MetadataValue::Number(3.0));
        assert_eq!(meta["c"], MetadataValue::Bool(true));
        assert_eq!(meta["b"].as_usize(), Some(3));
        assert_eq!(meta["d"].as_usize(), None);
    }

    #[test]
    fn item_uses_on_disk_field_names() {
        let item = Item {
            id: "a".into(),
            metadata: Metadata::new(),
            vector: vec![3.0, 4.0],
            norm: 5.0,
            metadata_file: Some("b.json".into()),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["metadataFile"], "b.json");

        let plain = Item {
            metadata_file: None,
            ..item
        };
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("metadataFile").is_none());
    }

    #[test]
    fn store_state_tolerates_missing_sections() {
        let state: StoreState = serde_json::from_str(r#"{"version": 1}"#).unwrap();
        assert_eq!(state.version, 1);
        assert!(state.items.is_empty());
        assert!(state.metadata_config.indexed_keys().is_empty());
    }
}
