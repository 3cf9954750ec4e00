use crate::doc_type::DocType;
use serde::{Deserialize, Serialize};

/// Configuration for recursive text chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Explicit separators, highest priority first. Empty = use the `doc_type` table.
    pub separators: Vec<String>,

    /// Re-append the separator to each part it was split from
    pub keep_separators: bool,

    /// Maximum chunk size in tokens (hard limit for merged chunks)
    pub chunk_size: usize,

    /// Number of neighbouring tokens recorded as start/end overlap
    pub chunk_overlap: usize,

    /// Document type used to pick default separators
    pub doc_type: Option<DocType>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            separators: Vec::new(),
            keep_separators: false,
            chunk_size: 400,
            chunk_overlap: 40,
            doc_type: None,
        }
    }
}

impl ChunkerConfig {
    /// Smaller chunks for embedding models with short context windows
    pub fn for_embeddings() -> Self {
        Self {
            chunk_size: 256,
            chunk_overlap: 32,
            ..Default::default()
        }
    }

    /// Separator-preserving chunks for prose meant to be rendered back verbatim
    pub fn for_prose() -> Self {
        Self {
            keep_separators: true,
            doc_type: Some(DocType::Prose),
            ..Default::default()
        }
    }

    /// Builder: set document type
    #[must_use]
    pub const fn with_doc_type(mut self, doc_type: DocType) -> Self {
        self.doc_type = Some(doc_type);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size < 1 {
            return Err("chunk_size must be >= 1".to_string());
        }

        if self.chunk_overlap > self.chunk_size {
            return Err(format!(
                "chunk_overlap ({}) cannot exceed chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }

        Ok(())
    }

    /// Separators that will actually be used: explicit ones, else the doc type's table.
    pub fn effective_separators(&self) -> Vec<String> {
        if !self.separators.is_empty() {
            return self.separators.clone();
        }
        self.doc_type
            .unwrap_or_default()
            .default_separators()
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    }
}
