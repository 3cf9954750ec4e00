use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur while configuring or running the text chunker
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkerError {
    /// Invalid configuration (chunk size / overlap bounds)
    #[error("Invalid chunker configuration: {0}")]
    InvalidConfig(String),

    /// Unknown document type name
    #[error("Unknown document type: {0}")]
    UnknownDocType(String),
}

impl ChunkerError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
