//! In-memory vector store.
//!
//! Implements the full [`VectorStore`] contract with brute-force scoring.
//! Clones share state through an `Arc`, so a test can hold one handle while
//! the retriever owns another. Failure-injection knobs let tests exercise
//! probe failures and mid-ingestion batch failures deterministically.

use super::{QueryVector, ScoredPoint, StoreError, VectorStore};
use crate::connection::StoreConnector;
use crate::schema::CollectionSchema;
use crate::types::{Filter, Record};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Debug)]
struct Collection {
    schema: CollectionSchema,
    records: Vec<Record>,
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, Collection>,
    /// Sizes of successfully committed batches, in commit order.
    upsert_batches: Vec<usize>,
    /// Total upsert calls, successful or not.
    upsert_calls: usize,
    /// Fail upsert calls whose zero-based index is >= this value.
    fail_upserts_from: Option<usize>,
    /// Remaining probe calls to fail.
    probe_failures: u32,
}

/// Shared-state in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVectorStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryVectorStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|e| StoreError::Io(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|e| StoreError::Io(format!("lock poisoned: {}", e)))
    }

    /// Sizes of the batches committed so far, in order.
    pub fn upsert_batch_sizes(&self) -> Vec<usize> {
        self.read().map(|g| g.upsert_batches.clone()).unwrap_or_default()
    }

    /// Number of records currently stored in `collection`.
    pub fn record_count(&self, collection: &str) -> usize {
        self.read()
            .ok()
            .and_then(|g| g.collections.get(collection).map(|c| c.records.len()))
            .unwrap_or(0)
    }

    /// Makes upsert calls fail from the given zero-based call index onward.
    pub fn fail_upserts_from(&self, call: usize) {
        if let Ok(mut guard) = self.write() {
            guard.fail_upserts_from = Some(call);
        }
    }

    /// Makes the next `count` liveness probes fail.
    pub fn fail_probes(&self, count: u32) {
        if let Ok(mut guard) = self.write() {
            guard.probe_failures = count;
        }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn max_sim(query: &[Vec<f32>], doc: &[Vec<f32>]) -> f32 {
    query
        .iter()
        .map(|q| {
            doc.iter()
                .map(|d| cosine(q, d))
                .fold(f32::NEG_INFINITY, f32::max)
        })
        .filter(|s| s.is_finite())
        .sum()
}

fn score_record(record: &Record, query: &QueryVector) -> Option<f32> {
    match query {
        QueryVector::Dense(q) => Some(cosine(q, &record.dense)),
        QueryVector::Sparse(q) => Some(q.dot(&record.sparse)),
        QueryVector::Multi(q) => record.multi.as_deref().map(|doc| max_sim(q, doc)),
    }
}

#[async_trait::async_trait(?Send)]
impl VectorStore for InMemoryVectorStore {
    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let mut guard = self.write()?;
        if guard.probe_failures > 0 {
            guard.probe_failures -= 1;
            return Err(StoreError::Unavailable(
                "simulated probe failure".to_string(),
            ));
        }
        let mut names: Vec<String> = guard.collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_collection(
        &self,
        name: &str,
        schema: &CollectionSchema,
    ) -> Result<(), StoreError> {
        let mut guard = self.write()?;
        if guard.collections.contains_key(name) {
            return Err(StoreError::Rejected(format!(
                "collection '{}' already exists",
                name
            )));
        }
        guard.collections.insert(
            name.to_string(),
            Collection {
                schema: schema.clone(),
                records: Vec::new(),
            },
        );
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[Record]) -> Result<(), StoreError> {
        let mut guard = self.write()?;
        let call = guard.upsert_calls;
        guard.upsert_calls += 1;
        if matches!(guard.fail_upserts_from, Some(from) if call >= from) {
            return Err(StoreError::Io("simulated upsert failure".to_string()));
        }
        let target = guard
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;
        for record in records {
            if record.dense.len() != target.schema.dense.dim {
                return Err(StoreError::Rejected(format!(
                    "dense vector has {} dimensions, collection expects {}",
                    record.dense.len(),
                    target.schema.dense.dim
                )));
            }
        }
        // Dimensions verified for the whole batch; commit all at once.
        target.records.extend(records.iter().cloned());
        guard.upsert_batches.push(records.len());
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: &QueryVector,
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        let guard = self.read()?;
        let target = guard
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;
        if let QueryVector::Dense(q) = query {
            if q.len() != target.schema.dense.dim {
                return Err(StoreError::Rejected(format!(
                    "query vector has {} dimensions, collection expects {}",
                    q.len(),
                    target.schema.dense.dim
                )));
            }
        }
        if matches!(query, QueryVector::Multi(_)) && target.schema.multi.is_none() {
            return Err(StoreError::Rejected(
                "collection has no multi-vector space".to_string(),
            ));
        }

        let mut scored: Vec<ScoredPoint> = target
            .records
            .iter()
            .filter(|record| filter.map_or(true, |f| f.matches(&record.payload)))
            .filter_map(|record| {
                score_record(record, query).map(|score| ScoredPoint {
                    id: record.id,
                    score,
                    payload: record.payload.clone(),
                })
            })
            .collect();
        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<(), StoreError> {
        let mut guard = self.write()?;
        let target = guard
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;
        target.records.retain(|record| !filter.matches(&record.payload));
        Ok(())
    }
}

/// Connector yielding handles to one shared in-memory store.
#[derive(Debug, Clone)]
pub struct InMemoryConnector {
    store: InMemoryVectorStore,
}

impl InMemoryConnector {
    /// Wraps a store so every connection shares its state.
    pub fn new(store: InMemoryVectorStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait(?Send)]
impl StoreConnector for InMemoryConnector {
    type Store = InMemoryVectorStore;

    async fn connect(&self, _timeout: Duration) -> Result<Self::Store, StoreError> {
        Ok(self.store.clone())
    }
}
