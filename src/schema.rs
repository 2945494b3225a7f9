//! Vector-space schema declaration and idempotent collection creation.
//!
//! A collection's schema is decided once at creation time and never
//! altered. If a collection with the configured name already exists, its
//! schema is trusted without re-validation or migration.

use crate::config::StoreConfig;
use crate::error::RetrievalError;
use crate::store::{StoreError, VectorStore};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Name of the dense vector space.
pub const DENSE_SPACE: &str = "dense";

/// Name of the sparse vector space.
pub const SPARSE_SPACE: &str = "sparse";

/// Name of the multi-vector space.
pub const MULTI_SPACE: &str = "colbert";

/// Similarity metric for a fixed-dimension space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    /// Cosine similarity.
    Cosine,
    /// Dot product.
    Dot,
}

/// Intra-record aggregation rule over token vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultiVectorComparator {
    /// Per query token, take the maximum pairwise similarity across the
    /// record's token vectors, then sum over query tokens.
    MaxSim,
}

/// Dense space parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseSpace {
    /// Vector dimensionality.
    pub dim: usize,
    /// Similarity metric.
    pub distance: Distance,
}

/// Sparse space parameters.
///
/// Sparse vectors carry their own term indices, so no dimensionality is
/// declared here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseSpace {}

/// Multi-vector space parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiVectorSpace {
    /// Per-token vector dimensionality.
    pub dim: usize,
    /// Pairwise similarity metric.
    pub distance: Distance,
    /// Aggregation rule across token vectors.
    pub comparator: MultiVectorComparator,
}

/// Declared vector spaces for a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Dense space (always present).
    pub dense: DenseSpace,
    /// Sparse space (always present).
    pub sparse: SparseSpace,
    /// Multi-vector space, present only when enabled by configuration.
    pub multi: Option<MultiVectorSpace>,
}

impl CollectionSchema {
    /// Derives the schema from configuration: a cosine dense space, a
    /// sparse space, and a max-sim multi-vector space when enabled.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            dense: DenseSpace {
                dim: config.dense_dim,
                distance: Distance::Cosine,
            },
            sparse: SparseSpace::default(),
            multi: config.enable_multivector.then(|| MultiVectorSpace {
                dim: config.multivector_dim,
                distance: Distance::Cosine,
                comparator: MultiVectorComparator::MaxSim,
            }),
        }
    }

    /// Whether the multi-vector space is part of this schema.
    pub fn multi_enabled(&self) -> bool {
        self.multi.is_some()
    }
}

/// Ensures collection `name` exists with `schema`, creating it if absent.
///
/// Idempotent: an existing collection is left untouched (no schema diffing,
/// no migration). A creation rejected by the store is a configuration-time
/// fatal condition and is not retried.
pub async fn ensure_collection<S: VectorStore>(
    store: &S,
    name: &str,
    schema: &CollectionSchema,
) -> Result<(), RetrievalError> {
    let exists = store
        .list_collections()
        .await
        .map_err(|e| schema_error(name, e))?
        .iter()
        .any(|collection| collection == name);
    if exists {
        return Ok(());
    }
    store
        .create_collection(name, schema)
        .await
        .map_err(|e| schema_error(name, e))?;
    info!(collection = name, "created collection");
    Ok(())
}

fn schema_error(name: &str, source: StoreError) -> RetrievalError {
    RetrievalError::Schema {
        collection: name.to_string(),
        reason: source.to_string(),
    }
}
