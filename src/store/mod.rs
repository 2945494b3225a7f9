//! Vector store abstraction.
//!
//! The retrieval layer talks to its backing store through [`VectorStore`],
//! so a remote engine and the in-memory double are interchangeable at the
//! seam. [`InMemoryVectorStore`] implements the full contract and is the
//! store used throughout the test suite.

mod memory;

pub use memory::{InMemoryConnector, InMemoryVectorStore};

use crate::schema::CollectionSchema;
use crate::types::{Filter, Payload, Record, RecordId, SparseVector};
use thiserror::Error;

/// Errors reported by store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached or did not answer a probe.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store refused the request (bad dimensions, duplicate collection).
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The named collection does not exist.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),
    /// Internal store failure.
    #[error("store i/o error: {0}")]
    Io(String),
}

/// Query input; the variant selects which vector space is searched.
#[derive(Debug, Clone)]
pub enum QueryVector {
    /// Search the dense space by cosine similarity.
    Dense(Vec<f32>),
    /// Search the sparse space by dot product over shared terms.
    Sparse(SparseVector),
    /// Search the multi-vector space by max-sim aggregation.
    Multi(Vec<Vec<f32>>),
}

/// A store-ranked result before normalization into a [`crate::SearchHit`].
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Record identifier.
    pub id: RecordId,
    /// Native-scale relevance score for the searched space.
    pub score: f32,
    /// Full stored payload, content key included.
    pub payload: Payload,
}

/// Contract between the retrieval layer and its backing store.
#[async_trait::async_trait(?Send)]
pub trait VectorStore {
    /// Lists collection names. Doubles as the liveness probe: a store that
    /// cannot answer this is treated as down.
    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    /// Creates a collection with the given schema. Rejects duplicates.
    async fn create_collection(
        &self,
        name: &str,
        schema: &CollectionSchema,
    ) -> Result<(), StoreError>;

    /// Writes a batch of records atomically: all land or none do.
    async fn upsert(&self, collection: &str, records: &[Record]) -> Result<(), StoreError>;

    /// Ranks records against the query in its vector space, best first,
    /// applying `filter` before ranking when present.
    async fn query(
        &self,
        collection: &str,
        query: &QueryVector,
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>, StoreError>;

    /// Deletes every record matching the filter.
    async fn delete(&self, collection: &str, filter: &Filter) -> Result<(), StoreError>;
}
