//! Error taxonomy for retrieval operations.
//!
//! Each variant marks a distinct failure class so callers can pattern-match
//! recoverable outcomes (retry the whole call) against fatal ones
//! (configuration or caller bugs) without string inspection.

use thiserror::Error;

/// Errors surfaced by the retrieval layer.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    /// Connection or health probe exhausted its retries. Fatal for the
    /// current call; the next call retries from scratch.
    #[error("store unreachable after {attempts} attempts: {reason}")]
    Connectivity {
        /// Number of connection attempts made.
        attempts: u32,
        /// Last underlying store error.
        reason: String,
    },

    /// Collection creation was rejected by the store. This is a
    /// configuration-level condition and is never retried.
    #[error("collection '{collection}' setup failed: {reason}")]
    Schema {
        /// Collection whose creation failed.
        collection: String,
        /// Store-reported rejection reason.
        reason: String,
    },

    /// Caller contract violation: mismatched parallel input lengths or a
    /// missing query input for the requested mode. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A batch write failed after a healthy connection was obtained.
    ///
    /// Batches are written sequentially, so `committed` records form a
    /// prefix of the input. Retrying is the caller's decision, at
    /// whole-call granularity.
    #[error("ingestion failed at batch {batch} ({committed} records committed): {reason}")]
    Ingestion {
        /// Zero-based index of the batch that failed.
        batch: usize,
        /// Records written by the batches before the failing one.
        committed: usize,
        /// Underlying failure.
        reason: String,
    },

    /// A search call failed after a healthy connection was obtained.
    #[error("query failed: {0}")]
    Query(String),

    /// A filtered delete failed.
    #[error("delete for source '{source_file}' failed: {reason}")]
    Delete {
        /// The `source_file` value whose records were being deleted.
        source_file: String,
        /// Underlying failure.
        reason: String,
    },
}

/// Errors from embedding providers.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    /// Model not available or initialization failed.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    /// Forward pass through the model failed.
    #[error("inference failed: {0}")]
    InferenceFailed(String),
}
