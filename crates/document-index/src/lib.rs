//! # Vectra Document Index
//!
//! Chunked, embedded documents on top of [`vectra_vector_store`].
//!
//! ## Pipeline
//!
//! ```text
//! upsert_document(uri, text)
//!     │
//!     ├──> TextChunker (token-bounded chunks, DocType from the uri)
//!     ├──> EmbeddingsModel (batched under max_tokens)
//!     └──> one update: chunks -> VectorStore, text/metadata side files, catalog entry
//!
//! query_documents(query)
//!     │
//!     ├──> embed query -> VectorStore::query_items (top max_chunks)
//!     ├──> optional KeywordRanker pass (is_bm25)
//!     ├──> group by documentId, score = mean chunk score
//!     └──> DocumentResult::render_sections / render_all_sections
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vectra_document_index::{
//!     CreateIndexOptions, DocumentIndex, DocumentQueryOptions, HashEmbeddings,
//! };
//!
//! #[tokio::main]
//! async fn main() -> vectra_document_index::Result<()> {
//!     let mut index = DocumentIndex::builder("docs-index")
//!         .embeddings(Arc::new(HashEmbeddings::default()))
//!         .build()?;
//!     index.create_index(CreateIndexOptions::default()).await?;
//!
//!     index
//!         .upsert_document("notes/rust.md", "# Rust\n\nOwnership and borrowing.", None, None)
//!         .await?;
//!
//!     for doc in index.query_documents("borrowing", DocumentQueryOptions::default()).await? {
//!         for section in doc.render_sections(200, 1, true).await? {
//!             println!("{} ({:.3}): {}", doc.uri(), section.score, section.text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod catalog;
mod config;
mod document;
mod embeddings;
mod error;
mod index;
mod ranker;
mod sections;

pub use catalog::{Catalog, CATALOG_FILE_NAME};
pub use config::{DocumentIndexConfig, QueryDefaults};
pub use document::{DocumentChunk, DocumentHandle, DocumentResult};
pub use embeddings::{EmbeddingsModel, EmbeddingsResponse, EmbeddingsStatus, HashEmbeddings};
pub use error::{DocumentIndexError, Result};
pub use index::{CatalogStats, DocumentIndex, DocumentIndexBuilder, DocumentQueryOptions};
pub use ranker::{Bm25Ranker, KeywordMatch, KeywordRanker};
pub use sections::{ScoredSpan, Section, SectionBuilder, SECTION_CONNECTOR};

// Re-export the pieces callers need to drive an index without extra dependencies
pub use vectra_text_chunker::{CharTokenizer, ChunkerConfig, DocType, Tokenizer};
pub use vectra_vector_store::{CreateIndexOptions, Metadata, MetadataFilter, MetadataValue};
