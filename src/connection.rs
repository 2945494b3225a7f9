//! Lazy connection management with bounded retry.
//!
//! Connection establishment is deferred until the first operation needs a
//! handle. Every access re-probes the cached handle, so a store restart
//! between calls is healed by the next call instead of poisoning it.

use crate::config::StoreConfig;
use crate::error::RetrievalError;
use crate::store::{StoreError, VectorStore};
use std::time::Duration;
use tracing::{info, warn};

/// Factory for store handles.
///
/// Implementations hold whatever endpoint state they need (URL, credentials)
/// and produce a connected handle on demand. The in-memory test double is
/// [`crate::store::InMemoryConnector`].
#[async_trait::async_trait(?Send)]
pub trait StoreConnector {
    /// The store handle this connector produces.
    type Store: VectorStore;

    /// Establishes a new connection with the given per-call timeout.
    async fn connect(&self, timeout: Duration) -> Result<Self::Store, StoreError>;
}

/// Caches one store handle and re-establishes it on demand.
///
/// Not internally synchronized: mutating access is serialized by the
/// caller through `&mut self`, matching the single-owner usage in
/// [`crate::retriever::HybridRetriever`].
pub struct ConnectionManager<C: StoreConnector> {
    connector: C,
    max_retries: u32,
    retry_delay: Duration,
    timeout: Duration,
    conn: Option<C::Store>,
    collection_ready: bool,
}

impl<C: StoreConnector> ConnectionManager<C> {
    /// Creates a manager with no established connection.
    pub fn new(connector: C, config: &StoreConfig) -> Self {
        Self {
            connector,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            timeout: config.timeout,
            conn: None,
            collection_ready: false,
        }
    }

    /// Returns a healthy store handle, connecting or reconnecting as needed.
    ///
    /// A cached handle is health-probed first; if the probe fails the handle
    /// is dropped, the collection state is invalidated, and a fresh
    /// connection sequence runs. Errors map to
    /// [`RetrievalError::Connectivity`].
    pub async fn handle(&mut self) -> Result<&C::Store, RetrievalError> {
        let cached_healthy = match &self.conn {
            Some(conn) => conn.list_collections().await.is_ok(),
            None => false,
        };
        if !cached_healthy && self.conn.take().is_some() {
            warn!("cached store connection failed health probe, reconnecting");
            // The new connection may point at a different store instance;
            // the collection must be re-verified against it.
            self.collection_ready = false;
        }
        if self.conn.is_none() {
            let conn = self.connect().await?;
            self.conn = Some(conn);
        }
        match &self.conn {
            Some(conn) => Ok(conn),
            None => Err(RetrievalError::Connectivity {
                attempts: 0,
                reason: "connection slot empty".to_string(),
            }),
        }
    }

    /// Runs the bounded connect-and-probe sequence.
    ///
    /// A connection only counts as established once a liveness probe
    /// (listing collections) succeeds; a socket that opens but cannot serve
    /// requests is treated as a failed attempt. The delay between attempts
    /// is fixed, no backoff.
    async fn connect(&self) -> Result<C::Store, RetrievalError> {
        let attempts = self.max_retries.max(1);
        let mut last_error: Option<StoreError> = None;
        for attempt in 1..=attempts {
            match self.try_connect().await {
                Ok(conn) => {
                    info!(attempt, "connected to vector store");
                    return Ok(conn);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "store connection attempt failed");
                    last_error = Some(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        Err(RetrievalError::Connectivity {
            attempts,
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts made".to_string()),
        })
    }

    async fn try_connect(&self) -> Result<C::Store, StoreError> {
        let conn = self.connector.connect(self.timeout).await?;
        conn.list_collections().await?;
        Ok(conn)
    }

    /// Drops the cached connection and collection state.
    ///
    /// The next operation reconnects and re-verifies the collection from
    /// scratch.
    pub fn reset(&mut self) {
        if self.conn.take().is_some() {
            info!("store connection reset");
        }
        self.collection_ready = false;
    }

    /// Whether the collection has been verified for this connection epoch.
    pub fn collection_ready(&self) -> bool {
        self.collection_ready
    }

    /// Marks the collection verified until the next [`reset`](Self::reset).
    pub fn mark_collection_ready(&mut self) {
        self.collection_ready = true;
    }
}
