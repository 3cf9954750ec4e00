//! # Vectra Vector Store
//!
//! File-backed vector storage with transactional updates and metadata filtering.
//!
//! ## Features
//!
//! - **Brute-force cosine ranking** over cached per-item norms
//! - **Single-writer transactions** with snapshot reads
//! - **Atomic persistence** (write to temp file, rename into place)
//! - **Metadata filters** using a small Mongo-style operator language
//! - **Indexed keys** kept inline, everything else in per-item side files
//!
//! ## Layout on disk
//!
//! ```text
//! <folder>/
//!     ├──> index.json        version, metadata_config, items[]
//!     └──> <uuid>.json       full metadata of items with non-indexed keys
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use vectra_vector_store::{CreateIndexOptions, MetadataFilter, NewItem, VectorStore};
//!
//! #[tokio::main]
//! async fn main() -> vectra_vector_store::Result<()> {
//!     let mut store = VectorStore::open("my-index");
//!     store.create_index(CreateIndexOptions::default()).await?;
//!
//!     store.begin_update().await?;
//!     store.insert_item(NewItem::new(vec![0.1, 0.9]).meta("kind", "fruit")).await?;
//!     store.insert_item(NewItem::new(vec![0.8, 0.2]).meta("kind", "tool")).await?;
//!     store.end_update().await?;
//!
//!     let filter = MetadataFilter::eq("kind", "fruit");
//!     for result in store.query_items(&[0.0, 1.0], 5, Some(&filter)).await? {
//!         println!("{}: {:.3}", result.item.id, result.score);
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod filter;
mod persist;
mod similarity;
mod store;
mod types;

pub use error::{Result, VectorStoreError};
pub use filter::{matches, MetadataFilter};
pub use persist::{read_json, remove_file_if_exists, write_json_atomic};
pub use similarity::{
    cosine_similarity, dot_product, normalize, normalized_cosine_similarity, rank_descending,
};
pub use store::{CreateIndexOptions, StoreOptions, VectorStore, DEFAULT_INDEX_NAME};
pub use types::{
    IndexStats, Item, Metadata, MetadataConfig, MetadataValue, NewItem, QueryResult, StoreState,
};
