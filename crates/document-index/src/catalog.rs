use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CATALOG_FILE_NAME: &str = "catalog.json";
pub const CATALOG_VERSION: u32 = 1;

/// Persisted uri <-> document id mapping (`catalog.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub version: u32,
    /// Number of documents in the catalog
    pub count: usize,
    #[serde(default)]
    pub uri_to_id: BTreeMap<String, String>,
    #[serde(default)]
    pub id_to_uri: BTreeMap<String, String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            version: CATALOG_VERSION,
            count: 0,
            uri_to_id: BTreeMap::new(),
            id_to_uri: BTreeMap::new(),
        }
    }
}

impl Catalog {
    pub fn document_id(&self, uri: &str) -> Option<&str> {
        self.uri_to_id.get(uri).map(String::as_str)
    }

    pub fn document_uri(&self, id: &str) -> Option<&str> {
        self.id_to_uri.get(id).map(String::as_str)
    }

    pub fn insert(&mut self, uri: &str, id: &str) {
        if let Some(previous) = self.uri_to_id.insert(uri.to_string(), id.to_string()) {
            self.id_to_uri.remove(&previous);
        }
        self.id_to_uri.insert(id.to_string(), uri.to_string());
        self.count = self.uri_to_id.len();
    }

    /// Drop the entry for `uri`, returning its document id.
    pub fn remove(&mut self, uri: &str) -> Option<String> {
        let id = self.uri_to_id.remove(uri)?;
        self.id_to_uri.remove(&id);
        self.count = self.uri_to_id.len();
        Some(id)
    }
}
