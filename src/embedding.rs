//! Embedding provider seam.
//!
//! The models that turn text into vectors live outside this crate; this
//! trait captures their input/output contract so implementations (local
//! models, remote inference APIs) can be swapped without touching the
//! retrieval code. A deterministic test double lives in
//! [`crate::test_utils::HashingEmbedder`].

use crate::error::EmbeddingError;
use crate::types::SparseVector;

/// Produces the three vector representations of a text.
#[async_trait::async_trait(?Send)]
pub trait EmbeddingProvider {
    /// Dense semantic embedding for one text.
    async fn embed_dense(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Sparse lexical embedding for one text.
    ///
    /// Comparatively cheap and stateless per item; callers invoke it per
    /// chunk rather than batching.
    async fn embed_sparse(&self, text: &str) -> Result<SparseVector, EmbeddingError>;

    /// Token-level embeddings for a batch of texts: one sequence of
    /// fixed-length vectors per input, in input order.
    ///
    /// Computed in a single batched call to amortize model-invocation
    /// overhead, which dominates per-text cost for token-level models.
    async fn embed_multi(&self, texts: &[String]) -> Result<Vec<Vec<Vec<f32>>>, EmbeddingError>;
}
