//! Deterministic doubles for tests and examples.
//!
//! [`HashingEmbedder`] produces stable vectors from token hashes, so
//! identical texts always embed identically and related texts share tokens.
//! [`FlakyConnector`] injects a configurable number of connection failures.

use crate::connection::StoreConnector;
use crate::embedding::EmbeddingProvider;
use crate::error::EmbeddingError;
use crate::store::{InMemoryVectorStore, StoreError};
use crate::types::SparseVector;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sparse vocabulary size for the hashing embedder.
const SPARSE_VOCAB: u32 = 30_000;

/// Deterministic embedder backed by token hashing.
///
/// Not a semantic model: it exists so tests can rely on exact-token overlap
/// producing similarity without loading any weights.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    /// Creates an embedder producing vectors of the given dimensionality.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Dense embedding of a text, computed synchronously.
    ///
    /// Handy for preparing inputs outside async contexts; the
    /// [`EmbeddingProvider`] impl delegates here.
    pub fn dense(&self, text: &str) -> Vec<f32> {
        self.text_vector(text)
    }

    fn token_vector(&self, token: &str) -> Vec<f32> {
        // xorshift stream seeded from the token hash; the |1 keeps the
        // seed non-zero.
        let mut state = hash_token(token) | 1;
        let mut vector = Vec::with_capacity(self.dim);
        for _ in 0..self.dim {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            vector.push((state as f32 / u64::MAX as f32) * 2.0 - 1.0);
        }
        normalize(&mut vector);
        vector
    }

    fn text_vector(&self, text: &str) -> Vec<f32> {
        let tokens = tokens(text);
        let mut mean = vec![0.0f32; self.dim];
        if tokens.is_empty() {
            return mean;
        }
        for token in &tokens {
            for (slot, value) in mean.iter_mut().zip(self.token_vector(token)) {
                *slot += value;
            }
        }
        let count = tokens.len() as f32;
        for slot in &mut mean {
            *slot /= count;
        }
        normalize(&mut mean);
        mean
    }
}

#[async_trait::async_trait(?Send)]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed_dense(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.text_vector(text))
    }

    async fn embed_sparse(&self, text: &str) -> Result<SparseVector, EmbeddingError> {
        let mut counts: HashMap<u32, f32> = HashMap::new();
        for token in tokens(text) {
            let index = (hash_token(&token) % SPARSE_VOCAB as u64) as u32;
            *counts.entry(index).or_insert(0.0) += 1.0;
        }
        Ok(SparseVector { weights: counts })
    }

    async fn embed_multi(&self, texts: &[String]) -> Result<Vec<Vec<Vec<f32>>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                tokens(text)
                    .iter()
                    .map(|token| self.token_vector(token))
                    .collect()
            })
            .collect())
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn hash_token(token: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    hasher.finish()
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for slot in vector.iter_mut() {
            *slot /= norm;
        }
    }
}

/// Connector that fails a configured number of times before handing out
/// handles to a shared in-memory store.
#[derive(Debug, Clone)]
pub struct FlakyConnector {
    store: InMemoryVectorStore,
    failures: Arc<AtomicU32>,
    attempts: Arc<AtomicU32>,
}

impl FlakyConnector {
    /// Wraps a store; the first `failures` connection attempts fail.
    pub fn new(store: InMemoryVectorStore, failures: u32) -> Self {
        Self {
            store,
            failures: Arc::new(AtomicU32::new(failures)),
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Shared counter of connection attempts made so far.
    pub fn attempt_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait::async_trait(?Send)]
impl StoreConnector for FlakyConnector {
    type Store = InMemoryVectorStore;

    async fn connect(&self, _timeout: Duration) -> Result<Self::Store, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable(
                "simulated connection failure".to_string(),
            ));
        }
        Ok(self.store.clone())
    }
}
