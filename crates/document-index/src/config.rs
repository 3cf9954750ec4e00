use crate::error::{DocumentIndexError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use vectra_text_chunker::ChunkerConfig;
use vectra_vector_store::DEFAULT_INDEX_NAME;

/// Defaults applied when a query does not say otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
    pub max_documents: usize,
    pub max_chunks: usize,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            max_documents: 10,
            max_chunks: 50,
        }
    }
}

/// Document index configuration, typically read from `vectra.toml`.
///
/// ```toml
/// index_name = "index.json"
///
/// [chunking]
/// chunk_size = 512
/// chunk_overlap = 0
/// keep_separators = true
///
/// [query]
/// max_documents = 5
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentIndexConfig {
    pub index_name: String,
    pub chunking: ChunkerConfig,
    pub query: QueryDefaults,
}

impl Default for DocumentIndexConfig {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
            chunking: ChunkerConfig {
                keep_separators: true,
                chunk_size: 512,
                chunk_overlap: 0,
                ..Default::default()
            },
            query: QueryDefaults::default(),
        }
    }
}

impl DocumentIndexConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|err| DocumentIndexError::InvalidConfig(format!("TOML parse error: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        log::debug!("Loaded document index config from {:?}", path);
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.index_name.trim().is_empty() {
            return Err(DocumentIndexError::InvalidConfig(
                "index_name must not be empty".to_string(),
            ));
        }
        if self.query.max_documents == 0 || self.query.max_chunks == 0 {
            return Err(DocumentIndexError::InvalidConfig(
                "query limits must be >= 1".to_string(),
            ));
        }
        self.chunking
            .validate()
            .map_err(DocumentIndexError::InvalidConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = DocumentIndexConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.index_name, "index.json");
        assert_eq!(config.query.max_chunks, 50);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = DocumentIndexConfig::from_toml_str(
            r#"
[chunking]
chunk_size = 128

[query]
max_documents = 3
"#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 128);
        assert_eq!(config.query.max_documents, 3);
        assert_eq!(config.query.max_chunks, 50);
        assert_eq!(config.index_name, "index.json");
    }

    #[test]
    fn invalid_chunking_is_rejected() {
        let err = DocumentIndexConfig::from_toml_str(
            r#"
[chunking]
chunk_size = 10
chunk_overlap = 20
"#,
        )
        .unwrap_err();
        assert!(matches!(err, DocumentIndexError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let err = DocumentIndexConfig::from_toml_str("index_name = [").unwrap_err();
        assert!(matches!(err, DocumentIndexError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn load_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("vectra.toml");
        tokio::fs::write(&path, "index_name = \"chunks.json\"\n")
            .await
            .unwrap();
        let config = DocumentIndexConfig::load(&path).await.unwrap();
        assert_eq!(config.index_name, "chunks.json");
    }
}
