//! # trifuse
//!
//! Hybrid retrieval layer that stores text chunks in three vector spaces at
//! once — dense semantic, sparse lexical, and token-level multi-vector — and
//! fuses per-space rankings into a single answer list.
//!
//! The embedding models and the backing vector store are external
//! collaborators behind trait seams ([`EmbeddingProvider`] and
//! [`VectorStore`]). This crate owns everything in between: collection
//! lifecycle, multi-space ingestion with size-bounded batching, the four
//! retrieval modes, and reciprocal-rank fusion.
//!
//! ## Modules
//!
//! - [`retriever`] - [`HybridRetriever`]: ingestion, search, deletion
//! - [`connection`] - retrying, health-probed connection management
//! - [`schema`] - declared vector spaces and idempotent collection creation
//! - [`store`] - store capability trait plus an in-memory implementation
//! - [`embedding`] - embedding provider seam
//! - [`fusion`] - reciprocal-rank fusion over per-space rankings
//! - [`config`] - runtime configuration
//! - [`error`] - error taxonomy
//!
//! ## Example
//!
//! ```
//! use trifuse::{
//!     HybridRetriever, InMemoryConnector, InMemoryVectorStore, SearchMode, StoreConfig,
//! };
//! use trifuse::test_utils::HashingEmbedder;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), trifuse::RetrievalError> {
//! let config = StoreConfig {
//!     dense_dim: 8,
//!     ..StoreConfig::default()
//! };
//! let store = InMemoryVectorStore::new();
//! let embedder = HashingEmbedder::new(config.dense_dim);
//! let mut retriever =
//!     HybridRetriever::new(InMemoryConnector::new(store), HashingEmbedder::new(8), config);
//!
//! let chunks = vec!["the quick brown fox".to_string()];
//! let dense = vec![embedder.dense("the quick brown fox")];
//! let metadata = vec![trifuse::Payload::new()];
//! let ids = retriever.upsert(&chunks, &dense, &metadata).await?;
//! assert_eq!(ids.len(), 1);
//!
//! let hits = retriever
//!     .search(Some(dense[0].as_slice()), Some("quick fox"), 5, SearchMode::Hybrid, None)
//!     .await?;
//! assert_eq!(hits[0].id, ids[0]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod embedding;
pub mod error;
pub mod fusion;
pub mod retriever;
pub mod schema;
pub mod store;
pub mod test_utils;
pub mod types;

pub use config::StoreConfig;
pub use connection::{ConnectionManager, StoreConnector};
pub use embedding::EmbeddingProvider;
pub use error::{EmbeddingError, RetrievalError};
pub use retriever::{HybridRetriever, SearchMode};
pub use schema::CollectionSchema;
pub use store::{
    InMemoryConnector, InMemoryVectorStore, QueryVector, ScoredPoint, StoreError, VectorStore,
};
pub use types::{Filter, Payload, Record, RecordId, SearchHit, SparseVector};
