//! Runtime configuration for the retrieval layer.
//!
//! A [`StoreConfig`] is plain data: construct it directly, deserialize it
//! from a config file, or pick up `TRIFUSE_*` environment overrides with
//! [`StoreConfig::from_env`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default maximum connection attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default fixed delay between connection attempts (no backoff).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default per-call store timeout, passed to the connector.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default ingestion batch size when the multi-vector space is disabled.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default ingestion batch size when the multi-vector space is enabled.
///
/// Token-level vectors multiply per-record payload size, so batches shrink
/// to stay under store payload limits.
pub const DEFAULT_MULTIVECTOR_BATCH_SIZE: usize = 5;

/// Default dense embedding dimensionality (BGE-M3 hidden size).
pub const DEFAULT_DENSE_DIM: usize = 1024;

/// Configuration consumed by the retrieval layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store endpoint URL.
    pub url: String,
    /// Optional access credential.
    pub api_key: Option<String>,
    /// Collection name.
    pub collection: String,
    /// Dense-vector dimensionality.
    pub dense_dim: usize,
    /// Multi-vector (per-token) dimensionality.
    pub multivector_dim: usize,
    /// Whether the multi-vector space is enabled for this deployment.
    pub enable_multivector: bool,
    /// Per-call store timeout, handed to the connector at creation time.
    pub timeout: Duration,
    /// Maximum connection attempts.
    pub max_retries: u32,
    /// Fixed delay between connection attempts.
    pub retry_delay: Duration,
    /// Ingestion batch size without multi-vectors.
    pub batch_size: usize,
    /// Ingestion batch size with multi-vectors.
    pub multivector_batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: "chunks".to_string(),
            dense_dim: DEFAULT_DENSE_DIM,
            multivector_dim: DEFAULT_DENSE_DIM,
            enable_multivector: false,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            batch_size: DEFAULT_BATCH_SIZE,
            multivector_batch_size: DEFAULT_MULTIVECTOR_BATCH_SIZE,
        }
    }
}

impl StoreConfig {
    /// Builds a config from `TRIFUSE_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    ///
    /// Recognized variables: `TRIFUSE_URL`, `TRIFUSE_API_KEY`,
    /// `TRIFUSE_COLLECTION`, `TRIFUSE_DENSE_DIM`, `TRIFUSE_MULTIVECTOR`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("TRIFUSE_URL") {
            config.url = url;
        }
        if let Ok(key) = std::env::var("TRIFUSE_API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Ok(name) = std::env::var("TRIFUSE_COLLECTION") {
            config.collection = name;
        }
        if let Ok(dim) = std::env::var("TRIFUSE_DENSE_DIM") {
            if let Ok(dim) = dim.parse() {
                config.dense_dim = dim;
            }
        }
        if let Ok(flag) = std::env::var("TRIFUSE_MULTIVECTOR") {
            config.enable_multivector = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        config
    }

    /// Effective ingestion batch size for the current multi-vector setting.
    pub fn effective_batch_size(&self) -> usize {
        if self.enable_multivector {
            self.multivector_batch_size
        } else {
            self.batch_size
        }
    }
}
