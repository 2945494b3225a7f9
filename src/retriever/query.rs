//! Search: single-space modes and rank-fused hybrid retrieval.

use super::HybridRetriever;
use crate::connection::StoreConnector;
use crate::embedding::EmbeddingProvider;
use crate::error::RetrievalError;
use crate::fusion::{reciprocal_rank_fusion, RRF_K};
use crate::store::{QueryVector, ScoredPoint, VectorStore};
use crate::types::{Filter, Payload, RecordId, SearchHit, CONTENT_KEY};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Over-fetch multiplier per space in hybrid mode. Fetching more than
/// `top_k` from each space gives fusion enough overlap to reorder before
/// the final truncation.
const HYBRID_OVERFETCH: usize = 3;

/// Which vector space (or combination) a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Dense space only; requires a query vector.
    Dense,
    /// Sparse space only; requires query text.
    Sparse,
    /// Multi-vector space only; requires query text. Returns no hits when
    /// the deployment has the multi-vector space disabled.
    Colbert,
    /// Dense and sparse spaces fused by reciprocal rank; requires both a
    /// query vector and query text.
    #[default]
    Hybrid,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SearchMode::Dense => "dense",
            SearchMode::Sparse => "sparse",
            SearchMode::Colbert => "colbert",
            SearchMode::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

impl<C: StoreConnector, E: EmbeddingProvider> HybridRetriever<C, E> {
    /// Searches the collection in the given mode.
    ///
    /// Input requirements depend on the mode: dense needs `query_vector`,
    /// sparse and colbert need `query_text`, hybrid needs both. A missing
    /// input is an [`RetrievalError::InvalidArgument`], as is `top_k == 0`.
    /// Hits come back best first, at most `top_k` of them; single-space
    /// scores keep the store's native scale while hybrid scores are
    /// rank-fused, so scores are not comparable across modes.
    #[instrument(skip_all, fields(mode = %mode, top_k))]
    pub async fn search(
        &mut self,
        query_vector: Option<&[f32]>,
        query_text: Option<&str>,
        top_k: usize,
        mode: SearchMode,
        filter: Option<Filter>,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        if top_k == 0 {
            return Err(RetrievalError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }
        match mode {
            SearchMode::Dense => {
                let vector = require_vector(query_vector, mode)?;
                self.validate_query_dim(vector)?;
                self.search_space(QueryVector::Dense(vector.to_vec()), top_k, filter)
                    .await
            }
            SearchMode::Sparse => {
                let text = require_text(query_text, mode)?;
                let sparse = self
                    .provider
                    .embed_sparse(text)
                    .await
                    .map_err(query_error)?;
                self.search_space(QueryVector::Sparse(sparse), top_k, filter)
                    .await
            }
            SearchMode::Colbert => {
                let text = require_text(query_text, mode)?;
                if !self.schema.multi_enabled() {
                    debug!("multi-vector space disabled, colbert search returns no hits");
                    return Ok(Vec::new());
                }
                let mut vectors = self
                    .provider
                    .embed_multi(&[text.to_string()])
                    .await
                    .map_err(query_error)?;
                let query = vectors
                    .pop()
                    .ok_or_else(|| query_error("token-level embedder returned no output"))?;
                self.search_space(QueryVector::Multi(query), top_k, filter)
                    .await
            }
            SearchMode::Hybrid => {
                let vector = require_vector(query_vector, mode)?;
                let text = require_text(query_text, mode)?;
                self.validate_query_dim(vector)?;
                self.search_hybrid(vector, text, top_k, filter).await
            }
        }
    }

    async fn search_space(
        &mut self,
        query: QueryVector,
        top_k: usize,
        filter: Option<Filter>,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        self.ensure_ready().await?;
        let collection = self.config.collection.clone();
        let conn = self.manager.handle().await?;
        let points = conn
            .query(&collection, &query, top_k, filter.as_ref())
            .await
            .map_err(query_error)?;
        Ok(points.into_iter().map(normalize_hit).collect())
    }

    /// Queries the dense and sparse spaces independently, over-fetching
    /// each, then fuses by reciprocal rank and truncates to `top_k`.
    async fn search_hybrid(
        &mut self,
        query_vector: &[f32],
        query_text: &str,
        top_k: usize,
        filter: Option<Filter>,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        let sparse = self
            .provider
            .embed_sparse(query_text)
            .await
            .map_err(query_error)?;
        self.ensure_ready().await?;

        let fetch = top_k.saturating_mul(HYBRID_OVERFETCH);
        let collection = self.config.collection.clone();
        let conn = self.manager.handle().await?;

        let mut payloads: HashMap<RecordId, Payload> = HashMap::new();
        let mut rankings: Vec<Vec<(RecordId, f32)>> = Vec::with_capacity(2);
        let queries = [
            QueryVector::Dense(query_vector.to_vec()),
            QueryVector::Sparse(sparse),
        ];
        for query in &queries {
            let points = conn
                .query(&collection, query, fetch, filter.as_ref())
                .await
                .map_err(query_error)?;
            let mut ranking = Vec::with_capacity(points.len());
            for point in points {
                payloads.entry(point.id).or_insert(point.payload);
                ranking.push((point.id, point.score));
            }
            rankings.push(ranking);
        }

        let fused = reciprocal_rank_fusion(&rankings, RRF_K);
        Ok(fused
            .into_iter()
            .take(top_k)
            .filter_map(|(id, score)| {
                payloads.remove(&id).map(|payload| {
                    normalize_hit(ScoredPoint { id, score, payload })
                })
            })
            .collect())
    }

    fn validate_query_dim(&self, vector: &[f32]) -> Result<(), RetrievalError> {
        if vector.len() != self.schema.dense.dim {
            return Err(RetrievalError::InvalidArgument(format!(
                "query vector has {} dimensions, collection expects {}",
                vector.len(),
                self.schema.dense.dim
            )));
        }
        Ok(())
    }
}

fn require_vector<'a>(
    vector: Option<&'a [f32]>,
    mode: SearchMode,
) -> Result<&'a [f32], RetrievalError> {
    vector.ok_or_else(|| {
        RetrievalError::InvalidArgument(format!("{} mode requires a query vector", mode))
    })
}

fn require_text<'a>(text: Option<&'a str>, mode: SearchMode) -> Result<&'a str, RetrievalError> {
    text.ok_or_else(|| {
        RetrievalError::InvalidArgument(format!("{} mode requires query text", mode))
    })
}

fn query_error(reason: impl std::fmt::Display) -> RetrievalError {
    RetrievalError::Query(reason.to_string())
}

/// Splits the reserved content key out of the stored payload.
fn normalize_hit(point: ScoredPoint) -> SearchHit {
    let mut metadata = point.payload;
    let content = match metadata.remove(CONTENT_KEY) {
        Some(Value::String(text)) => text,
        _ => String::new(),
    };
    SearchHit {
        id: point.id,
        score: point.score,
        content,
        metadata,
    }
}
