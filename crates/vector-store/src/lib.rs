//! # Tariff Vector Store
//!
//! Semantic nearest-neighbor search over trade-reference records.
//!
//! ## Features
//!
//! - **Filtered similarity search**: equality filters on record attributes,
//!   applied before ranking so a filtered top-K is never a post-filtered one
//! - **Atomic rebuilds**: readers observe the old or the new index, never a
//!   partial one
//! - **Pluggable embeddings** behind the [`Embedder`] trait
//! - **Persistent snapshots** with JSON serialization
//!
//! ## Architecture
//!
//! ```text
//! ReferenceRecord[]
//!     │
//!     ├──> Embedder (text → fixed-length vector)
//!     │
//!     ├──> VectorIndex (cosine, filter-aware)
//!     │
//!     └──> Persistent Snapshot (JSON)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tariff_vector_store::{HashEmbedder, ReferenceRecord, SchemaDescriptor, VectorStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tariff_vector_store::VectorStoreError> {
//!     let mut store = VectorStore::new(Arc::new(HashEmbedder::default()));
//!
//!     let records = vec![
//!         ReferenceRecord::new("wireless earbuds").with_attribute("productcode", "851830"),
//!     ];
//!     let schema = SchemaDescriptor::text_columns(["productcode"]);
//!     store.rebuild(records, schema).await?;
//!
//!     let matches = store.search("bluetooth earphones", 5, None).await?;
//!     for m in matches {
//!         println!("{}: {:.3}", m.text, m.score);
//!     }
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod index;
mod store;
mod types;

pub use embeddings::{cosine_similarity, embedder_from_env, Embedder, HashEmbedder};
pub use error::{Result, VectorStoreError};
pub use index::VectorIndex;
pub use store::VectorStore;
pub use types::{AttributeFilter, CodeMatch, ColumnSpec, ReferenceRecord, SchemaDescriptor};
