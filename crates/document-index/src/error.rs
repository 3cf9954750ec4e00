use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocumentIndexError>;

#[derive(Error, Debug)]
pub enum DocumentIndexError {
    #[error("Embeddings model is not configured")]
    EmbeddingsNotConfigured,

    #[error("Error generating embeddings for {context}: {reason}")]
    EmbeddingGenerationFailed { context: String, reason: String },

    #[error("Failed to upsert document {uri}: {source}")]
    DocumentUpsertFailed {
        uri: String,
        #[source]
        source: Box<DocumentIndexError>,
    },

    #[error("Failed to delete document {uri}: {source}")]
    DocumentDeleteFailed {
        uri: String,
        #[source]
        source: Box<DocumentIndexError>,
    },

    #[error("Failed to read text for document {uri}: {source}")]
    TextReadFailed {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete text file for document {uri}: {source}")]
    TextDeleteFailed {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read metadata for document {uri}: {source}")]
    MetadataReadFailed {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse metadata for document {uri}: {source}")]
    MetadataParseFailed {
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to persist catalog to {path}: {source}")]
    CatalogPersistenceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] vectra_vector_store::VectorStoreError),

    #[error("Chunker error: {0}")]
    ChunkerError(#[from] vectra_text_chunker::ChunkerError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl DocumentIndexError {
    pub(crate) fn upsert_failed(uri: &str, source: Self) -> Self {
        Self::DocumentUpsertFailed {
            uri: uri.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn delete_failed(uri: &str, source: Self) -> Self {
        Self::DocumentDeleteFailed {
            uri: uri.to_string(),
            source: Box::new(source),
        }
    }
}
