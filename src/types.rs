//! Core data types shared across the crate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Reserved payload key holding the original chunk text.
pub const CONTENT_KEY: &str = "content";

/// Metadata key identifying a record's provenance; the unit of bulk deletion.
pub const SOURCE_FILE_KEY: &str = "source_file";

/// Payload attached to a record: the chunk content plus caller metadata.
pub type Payload = Map<String, Value>;

/// Globally unique record identifier.
///
/// Generated at ingestion time (UUID v4), never reused or derived from
/// content. Identity is immutable once created; updates are expressed as
/// delete + reinsert, never in-place mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generates a fresh random identifier.
    ///
    /// Default is intentionally not implemented: two `default()` calls
    /// returning different values would be misleading.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Sparse lexical embedding: vocabulary term index mapped to weight.
///
/// Inherently variable-length. Two sparse vectors are compared by dot
/// product over their shared term indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    /// Non-zero term weights keyed by vocabulary index.
    pub weights: HashMap<u32, f32>,
}

impl SparseVector {
    /// Creates an empty sparse vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sparse vector from (term index, weight) pairs.
    ///
    /// Duplicate indices keep the last weight seen.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, f32)>) -> Self {
        Self {
            weights: pairs.into_iter().collect(),
        }
    }

    /// Dot product over shared term indices.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        // Iterate the smaller side.
        let (small, large) = if self.weights.len() <= other.weights.len() {
            (&self.weights, &other.weights)
        } else {
            (&other.weights, &self.weights)
        };
        small
            .iter()
            .filter_map(|(index, w)| large.get(index).map(|v| w * v))
            .sum()
    }

    /// Returns `true` if no terms carry weight.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Number of non-zero terms.
    pub fn len(&self) -> usize {
        self.weights.len()
    }
}

/// The unit of storage: one chunk rendered into every enabled vector space.
///
/// Every record carries a dense and a sparse vector; the multi-vector entry
/// is present only when the collection's multi-vector space is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, generated at ingestion.
    pub id: RecordId,
    /// Fixed-length semantic embedding.
    pub dense: Vec<f32>,
    /// Lexical term-weight embedding.
    pub sparse: SparseVector,
    /// Token-level embeddings, one fixed-length vector per token.
    pub multi: Option<Vec<Vec<f32>>>,
    /// Original content (under the reserved `content` key) plus metadata.
    pub payload: Payload,
}

/// Field-equality condition on a payload key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    /// Payload key to match.
    pub key: String,
    /// Value the key must equal.
    pub value: Value,
}

/// Structured filter: a conjunction of field-equality predicates.
///
/// Store implementations translate this into their native filter language
/// and apply it before ranking; the retrieval layer never post-filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Conditions that must all hold.
    pub must: Vec<FieldCondition>,
}

impl Filter {
    /// Creates an empty filter (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality condition, builder style.
    pub fn must_match(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.must.push(FieldCondition {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Filter selecting every record from one source file.
    pub fn source_file(name: &str) -> Self {
        Self::new().must_match(SOURCE_FILE_KEY, name)
    }

    /// Whether a payload satisfies every condition.
    pub fn matches(&self, payload: &Payload) -> bool {
        self.must
            .iter()
            .all(|condition| payload.get(&condition.key) == Some(&condition.value))
    }
}

/// A normalized search result.
///
/// `score` keeps the store's native scale in single-space modes and the
/// rank-fused scale in hybrid mode; scores are not comparable across modes.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Record identifier.
    pub id: RecordId,
    /// Relevance score (mode-dependent scale).
    pub score: f32,
    /// Original chunk text.
    pub content: String,
    /// Payload with the reserved content key excluded.
    pub metadata: Payload,
}
