use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Index not found at {0}")]
    IndexNotFound(PathBuf),

    #[error("Index already exists at {0}")]
    IndexAlreadyExists(PathBuf),

    #[error("Failed to create index at {path}: {source}")]
    IndexCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("An update is already in progress")]
    UpdateAlreadyInProgress,

    #[error("No update in progress")]
    NoUpdateInProgress,

    #[error("Item with id {0} already exists")]
    ItemAlreadyExists(String),

    #[error("Item vector is required")]
    VectorRequired,

    #[error("Failed to persist index to {path}: {source}")]
    PersistenceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read metadata for item {id} from {path}: {source}")]
    MetadataReadFailed {
        id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse metadata for item {id} from {path}: {source}")]
    MetadataParseFailed {
        id: String,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid metadata filter: {0}")]
    InvalidFilter(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
