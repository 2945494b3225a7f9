//! Ingestion: embed chunks into every enabled space and write in batches.

use super::HybridRetriever;
use crate::connection::StoreConnector;
use crate::embedding::EmbeddingProvider;
use crate::error::RetrievalError;
use crate::store::VectorStore;
use crate::types::{Filter, Payload, Record, RecordId, CONTENT_KEY};
use serde_json::Value;
use tracing::{info, instrument};

impl<C: StoreConnector, E: EmbeddingProvider> HybridRetriever<C, E> {
    /// Ingests chunks with caller-supplied dense embeddings and metadata.
    ///
    /// The three slices are parallel and must have equal lengths; a mismatch
    /// fails before anything is embedded or written. Sparse vectors are
    /// computed per chunk and token-level vectors in one batched call when
    /// the multi-vector space is enabled. Records are written in sequential
    /// batches; a batch failure aborts the call, leaving earlier batches
    /// committed, and reports where it stopped through
    /// [`RetrievalError::Ingestion`].
    ///
    /// Returns the generated record identifiers in input order.
    #[must_use = "the returned record ids are the only handle to the ingested chunks"]
    #[instrument(skip_all, fields(chunks = chunks.len()))]
    pub async fn upsert(
        &mut self,
        chunks: &[String],
        dense_embeddings: &[Vec<f32>],
        metadatas: &[Payload],
    ) -> Result<Vec<RecordId>, RetrievalError> {
        if chunks.len() != dense_embeddings.len() || chunks.len() != metadatas.len() {
            return Err(RetrievalError::InvalidArgument(format!(
                "parallel inputs differ in length: {} chunks, {} embeddings, {} metadatas",
                chunks.len(),
                dense_embeddings.len(),
                metadatas.len()
            )));
        }
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let multi_vectors = if self.schema.multi_enabled() {
            let vectors = self
                .provider
                .embed_multi(chunks)
                .await
                .map_err(|e| ingestion_setup_error(e.to_string()))?;
            if vectors.len() != chunks.len() {
                return Err(ingestion_setup_error(format!(
                    "token-level embedder returned {} outputs for {} inputs",
                    vectors.len(),
                    chunks.len()
                )));
            }
            Some(vectors)
        } else {
            None
        };

        let mut records = Vec::with_capacity(chunks.len());
        let mut ids = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let sparse = self
                .provider
                .embed_sparse(chunk)
                .await
                .map_err(|e| ingestion_setup_error(e.to_string()))?;
            let id = RecordId::new();
            let mut payload = metadatas[index].clone();
            payload.insert(CONTENT_KEY.to_string(), Value::String(chunk.clone()));
            records.push(Record {
                id,
                dense: dense_embeddings[index].clone(),
                sparse,
                multi: multi_vectors.as_ref().map(|v| v[index].clone()),
                payload,
            });
            ids.push(id);
        }

        self.ensure_ready().await?;
        let batch_size = self.config.effective_batch_size().max(1);
        let collection = self.config.collection.clone();
        let conn = self.manager.handle().await?;

        let mut committed = 0usize;
        for (batch_index, batch) in records.chunks(batch_size).enumerate() {
            conn.upsert(&collection, batch)
                .await
                .map_err(|e| RetrievalError::Ingestion {
                    batch: batch_index,
                    committed,
                    reason: e.to_string(),
                })?;
            committed += batch.len();
        }
        info!(records = committed, "upserted chunks");
        Ok(ids)
    }

    /// Deletes every record whose `source_file` metadata equals `source_file`.
    ///
    /// Deleting a file with no records is a successful no-op.
    #[instrument(skip_all, fields(source_file))]
    pub async fn delete_by_source(&mut self, source_file: &str) -> Result<(), RetrievalError> {
        self.ensure_ready().await?;
        let collection = self.config.collection.clone();
        let conn = self.manager.handle().await?;
        conn.delete(&collection, &Filter::source_file(source_file))
            .await
            .map_err(|e| RetrievalError::Delete {
                source_file: source_file.to_string(),
                reason: e.to_string(),
            })?;
        info!(source_file, "deleted records by source");
        Ok(())
    }
}

/// Failure before any batch was attempted.
fn ingestion_setup_error(reason: String) -> RetrievalError {
    RetrievalError::Ingestion {
        batch: 0,
        committed: 0,
        reason,
    }
}
