//! # Vectra Text Chunker
//!
//! Recursive, token-aware text splitting for document retrieval.
//!
//! ## Pipeline
//!
//! ```text
//! Document text
//!     │
//!     ├──> Separator table (explicit, or by DocType)
//!     │
//!     ├──> Recursive split
//!     │    ├─> Split by highest-priority separator
//!     │    ├─> Drop parts without alphanumerics
//!     │    ├─> Recurse into parts over the token budget
//!     │    └─> Bisect when no separators remain
//!     │
//!     ├──> Merge pass (greedy, token-bounded)
//!     │
//!     └──> Overlap pass
//!          └─> TextChunk[] with start/end overlap tokens
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vectra_text_chunker::{CharTokenizer, ChunkerConfig, TextChunker};
//!
//! let config = ChunkerConfig {
//!     chunk_size: 16,
//!     chunk_overlap: 4,
//!     ..Default::default()
//! };
//! let chunker = TextChunker::new(config, Arc::new(CharTokenizer)).unwrap();
//!
//! for chunk in chunker.split("First paragraph.\n\nSecond paragraph, a little longer.") {
//!     println!("{}..={}: {}", chunk.start_pos, chunk.end_pos, chunk.text);
//! }
//! ```

mod chunker;
mod config;
mod doc_type;
mod error;
mod tokenizer;
mod types;

pub use chunker::{ChunkingStats, TextChunker};
pub use config::ChunkerConfig;
pub use doc_type::DocType;
pub use error::{ChunkerError, Result};
pub use tokenizer::{CharTokenizer, Tokenizer};
pub use types::TextChunk;
