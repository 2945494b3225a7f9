//! The retrieval facade: ingestion, search and deletion over one collection.

mod ingest;
mod query;

pub use query::SearchMode;

use crate::config::StoreConfig;
use crate::connection::{ConnectionManager, StoreConnector};
use crate::embedding::EmbeddingProvider;
use crate::error::RetrievalError;
use crate::schema::{self, CollectionSchema};
use tracing::info;

/// Hybrid retrieval over a dense, sparse and optional multi-vector space.
///
/// Owns the connection lifecycle: the first operation connects to the store
/// and verifies the collection; subsequent operations reuse the cached
/// handle until a failed health probe or an explicit [`reset`](Self::reset).
pub struct HybridRetriever<C: StoreConnector, E: EmbeddingProvider> {
    pub(crate) manager: ConnectionManager<C>,
    pub(crate) provider: E,
    pub(crate) config: StoreConfig,
    pub(crate) schema: CollectionSchema,
}

impl<C: StoreConnector, E: EmbeddingProvider> HybridRetriever<C, E> {
    /// Creates a retriever. No connection is made until the first operation.
    pub fn new(connector: C, provider: E, config: StoreConfig) -> Self {
        let schema = CollectionSchema::from_config(&config);
        let manager = ConnectionManager::new(connector, &config);
        Self {
            manager,
            provider,
            config,
            schema,
        }
    }

    /// Drops the cached connection and collection state; the next operation
    /// starts from a fresh connection sequence.
    pub fn reset(&mut self) {
        self.manager.reset();
        info!("retriever reset");
    }

    /// The active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Ensures the connection is healthy and the collection exists.
    ///
    /// Collection verification is cached per connection epoch; a
    /// [`reset`](Self::reset) forces re-verification.
    pub(crate) async fn ensure_ready(&mut self) -> Result<(), RetrievalError> {
        // Probe first: a reconnect inside handle() invalidates the
        // collection flag, so it must be read only afterwards.
        self.manager.handle().await?;
        if self.manager.collection_ready() {
            return Ok(());
        }
        {
            let conn = self.manager.handle().await?;
            schema::ensure_collection(conn, &self.config.collection, &self.schema).await?;
        }
        self.manager.mark_collection_ready();
        Ok(())
    }
}
